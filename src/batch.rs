//! Batch coordinator: every selected locale times every template entry.
//!
//! The Cartesian product is laid out once as an immutable, locale-major work
//! list and driven through a bounded pool of concurrent resolutions. Results
//! land back in template order per locale regardless of completion order.
//! One failing pair never stops the batch; an external cancel or the run
//! timeout stops it early, and whatever did not finish keeps its source text.

use crate::cancel::{CancelToken, Cancellation};
use crate::engine::{Resolution, ResolutionEngine};
use crate::events::{EventSink, PairProgress};
use crate::i18n::{BatchMetrics, Locale, MetricsReport};
use crate::model::{MessageEntry, TranslationResult};
use crate::providers::ProviderKind;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Worker pool size and run-level deadline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSettings {
    pub concurrency: usize,
    pub run_timeout: Option<Duration>,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            concurrency: 4,
            run_timeout: None,
        }
    }
}

/// Per-locale counts reported at the end of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LocaleSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub needs_review: usize,
    /// Accepted translations per provider
    pub provider_hits: BTreeMap<ProviderKind, usize>,
}

impl LocaleSummary {
    pub fn from_results(results: &[TranslationResult]) -> Self {
        let mut summary = Self {
            total: results.len(),
            ..Self::default()
        };
        for result in results {
            if result.succeeded {
                summary.succeeded += 1;
            } else {
                summary.failed += 1;
            }
            if result.needs_review {
                summary.needs_review += 1;
            }
            if let Some(provider) = result.provider {
                *summary.provider_hits.entry(provider).or_insert(0) += 1;
            }
        }
        summary
    }
}

/// All results for one locale, in template order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocaleCatalog {
    pub locale: Locale,
    pub results: Vec<TranslationResult>,
    pub summary: LocaleSummary,
}

/// Outcome of a whole run.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub catalogs: Vec<LocaleCatalog>,
    /// The run was stopped by an external cancel or the run timeout
    pub cancelled: bool,
    pub metrics: MetricsReport,
}

pub struct BatchCoordinator {
    engine: Arc<ResolutionEngine>,
    settings: BatchSettings,
    events: EventSink,
}

impl BatchCoordinator {
    pub fn new(engine: Arc<ResolutionEngine>, settings: BatchSettings) -> Self {
        Self {
            engine,
            settings,
            events: EventSink::disabled(),
        }
    }

    /// Report per-pair completion to `events`.
    pub fn with_events(mut self, events: EventSink) -> Self {
        self.events = events;
        self
    }

    pub async fn run(
        &self,
        entries: &[MessageEntry],
        locales: &[Locale],
        cancel: CancelToken,
    ) -> BatchReport {
        let pairs: Vec<(usize, usize)> = (0..locales.len())
            .flat_map(|li| (0..entries.len()).map(move |ei| (li, ei)))
            .collect();
        let metrics = BatchMetrics::new(pairs.len());
        let concurrency = self.settings.concurrency.max(1);

        info!(
            "Translating {} entries into {} locales ({} pairs, {} workers, chain: {:?})",
            entries.len(),
            locales.len(),
            pairs.len(),
            concurrency,
            self.engine.chain().kinds()
        );

        // The run stops on whichever comes first: the caller's token or the deadline
        let stop = Cancellation::new();
        let token = stop.token();
        if cancel.is_cancelled() {
            stop.cancel();
        }
        let run_timeout = self.settings.run_timeout;
        let watchdog = async {
            match run_timeout {
                Some(limit) => tokio::select! {
                    _ = cancel.cancelled() => warn!("Run cancelled; finishing with source text for unresolved entries"),
                    _ = tokio::time::sleep(limit) => warn!("Run timeout of {:?} reached; finishing with source text for unresolved entries", limit),
                },
                None => cancel.cancelled().await,
            }
            stop.cancel();
        };

        let work = stream::iter(pairs)
            .map(|(li, ei)| {
                let token = token.clone();
                let metrics = &metrics;
                let entry = &entries[ei];
                let locale = &locales[li];
                async move {
                    let resolution = self.engine.resolve(entry, locale, &token).await;
                    self.record(&resolution, metrics, locale, entry);
                    (li, ei, resolution.result)
                }
            })
            .buffer_unordered(concurrency)
            .collect::<Vec<_>>();

        tokio::pin!(work);
        tokio::pin!(watchdog);
        let mut watchdog_done = false;
        let mut results = loop {
            tokio::select! {
                results = &mut work => break results,
                _ = &mut watchdog, if !watchdog_done => watchdog_done = true,
            }
        };

        results.sort_by_key(|(li, ei, _)| (*li, *ei));
        let mut per_locale: Vec<Vec<TranslationResult>> = (0..locales.len())
            .map(|_| Vec::with_capacity(entries.len()))
            .collect();
        for (li, _, result) in results {
            per_locale[li].push(result);
        }

        let catalogs: Vec<LocaleCatalog> = locales
            .iter()
            .zip(per_locale)
            .map(|(locale, results)| {
                let summary = LocaleSummary::from_results(&results);
                info!(
                    "{} ({}): {}/{} translated, {} failed, {} need review",
                    locale.display_name(),
                    locale.catalog_tag(),
                    summary.succeeded,
                    summary.total,
                    summary.failed,
                    summary.needs_review
                );
                LocaleCatalog {
                    locale: locale.clone(),
                    results,
                    summary,
                }
            })
            .collect();

        let report = metrics.report();
        info!("Batch finished: {}", report);

        BatchReport {
            catalogs,
            cancelled: stop.is_cancelled(),
            metrics: report,
        }
    }

    fn record(
        &self,
        resolution: &Resolution,
        metrics: &BatchMetrics,
        locale: &Locale,
        entry: &MessageEntry,
    ) {
        let result = &resolution.result;
        metrics.record_provider_calls(resolution.attempts.len());
        let completed = metrics.record_pair(result.succeeded, result.needs_review);
        self.events.pair_completed(PairProgress {
            locale: locale.code().to_string(),
            entry_id: entry.id.clone(),
            succeeded: result.succeeded,
            completed,
            total: metrics.total(),
            succeeded_total: metrics.succeeded(),
            failed_total: metrics.failed(),
        });
    }
}
