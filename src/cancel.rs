//! Run-level cancellation.
//!
//! `Cancellation` is held by whoever may stop the run (Ctrl-C handler,
//! run timeout watchdog). Workers hold cheap `CancelToken` clones and race
//! their suspension points against `CancelToken::cancelled()`.

use tokio::sync::watch;

/// Owner side of a cancellation signal.
#[derive(Debug)]
pub struct Cancellation {
    tx: watch::Sender<bool>,
}

impl Cancellation {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    /// Signal every token. Idempotent.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    pub fn token(&self) -> CancelToken {
        CancelToken {
            rx: Some(self.tx.subscribe()),
        }
    }
}

impl Default for Cancellation {
    fn default() -> Self {
        Self::new()
    }
}

/// Observer side of a cancellation signal.
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: Option<watch::Receiver<bool>>,
}

impl CancelToken {
    /// A token that is never cancelled.
    pub fn never() -> Self {
        Self { rx: None }
    }

    pub fn is_cancelled(&self) -> bool {
        self.rx.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Resolve once cancellation is signalled.
    ///
    /// Pends forever for `never()` tokens and for tokens whose owner was
    /// dropped without cancelling.
    pub async fn cancelled(&self) {
        let Some(rx) = &self.rx else {
            return std::future::pending().await;
        };

        let mut rx = rx.clone();
        if rx.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
