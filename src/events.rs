//! Progress events emitted while a batch runs.
//!
//! Events go out over an unbounded channel so emitting never waits on the
//! consumer. A sink without a receiver (or whose receiver was dropped)
//! silently discards them.

use crate::providers::ProviderKind;
use serde::Serialize;
use tokio::sync::mpsc;

/// Where in a resolution an attempt event was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// A provider call is about to be made
    Attempt,
    /// A provider call produced an accepted translation
    Success,
    /// A provider call failed
    Failure,
    /// Every provider in the chain was exhausted for this pair
    Exhausted,
}

/// Fine-grained event for one step of one resolution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttemptEvent {
    pub phase: Phase,
    pub locale: String,
    pub entry_id: String,
    /// Absent for `Exhausted`
    pub provider: Option<ProviderKind>,
    /// 1-based attempt against `provider`; 0 for `Exhausted`
    pub attempt: u32,
    /// Error text for failures
    pub detail: Option<String>,
}

/// Coarse event raised once per finished (entry, locale) pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairProgress {
    pub locale: String,
    pub entry_id: String,
    pub succeeded: bool,
    pub completed: usize,
    pub total: usize,
    pub succeeded_total: usize,
    pub failed_total: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProgressEvent {
    Resolution(AttemptEvent),
    PairCompleted(PairProgress),
}

/// Fire-and-forget sender for progress events.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<mpsc::UnboundedSender<ProgressEvent>>,
}

impl EventSink {
    /// Create a connected sink and the receiving end.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// A sink that drops everything.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn emit(&self, event: ProgressEvent) {
        if let Some(tx) = &self.tx {
            // Receiver gone means nobody is rendering; not an error
            let _ = tx.send(event);
        }
    }

    pub fn attempt(&self, event: AttemptEvent) {
        self.emit(ProgressEvent::Resolution(event));
    }

    pub fn pair_completed(&self, progress: PairProgress) {
        self.emit(ProgressEvent::PairCompleted(progress));
    }
}
