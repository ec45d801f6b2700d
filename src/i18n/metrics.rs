//! Batch progress counters.
//!
//! One `BatchMetrics` value is created per run and shared by reference
//! between workers. Only these counters are shared state; every other piece
//! of a resolution is local to its task.

use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Running totals for one batch.
#[derive(Debug)]
pub struct BatchMetrics {
    /// Total number of (entry, locale) pairs in the run
    total: usize,

    /// Pairs whose resolution has finished, either way
    completed: AtomicUsize,

    /// Pairs resolved with an accepted translation
    succeeded: AtomicUsize,

    /// Pairs that fell back to the source text
    failed: AtomicUsize,

    /// Accepted translations flagged for human review
    needs_review: AtomicUsize,

    /// Provider calls made across the run
    provider_calls: AtomicUsize,
}

impl BatchMetrics {
    /// Create zeroed counters for a run of `total` pairs.
    pub fn new(total: usize) -> Self {
        Self {
            total,
            completed: AtomicUsize::new(0),
            succeeded: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            needs_review: AtomicUsize::new(0),
            provider_calls: AtomicUsize::new(0),
        }
    }

    /// Record a finished pair. Returns the completed count including this one.
    pub fn record_pair(&self, succeeded: bool, needs_review: bool) -> usize {
        if succeeded {
            self.succeeded.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
        if needs_review {
            self.needs_review.fetch_add(1, Ordering::Relaxed);
        }
        self.completed.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Record provider calls made while resolving one pair.
    pub fn record_provider_calls(&self, calls: usize) {
        self.provider_calls.fetch_add(calls, Ordering::Relaxed);
    }

    /// Total number of pairs.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Get the current completed count.
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::Relaxed)
    }

    /// Get the current success count.
    pub fn succeeded(&self) -> usize {
        self.succeeded.load(Ordering::Relaxed)
    }

    /// Get the current failure count.
    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::Relaxed)
    }

    /// Get the current needs-review count.
    pub fn needs_review(&self) -> usize {
        self.needs_review.load(Ordering::Relaxed)
    }

    /// Get the current provider call count.
    pub fn provider_calls(&self) -> usize {
        self.provider_calls.load(Ordering::Relaxed)
    }

    /// Generate a metrics report.
    pub fn report(&self) -> MetricsReport {
        let completed = self.completed();
        let succeeded = self.succeeded();
        let success_rate = if completed > 0 {
            (succeeded as f64 / completed as f64) * 100.0
        } else {
            0.0
        };

        MetricsReport {
            total: self.total,
            completed,
            succeeded,
            failed: self.failed(),
            needs_review: self.needs_review(),
            provider_calls: self.provider_calls(),
            success_rate,
        }
    }
}

/// Snapshot of batch counters.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsReport {
    pub total: usize,
    pub completed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub needs_review: usize,
    pub provider_calls: usize,
    /// Percentage of completed pairs that succeeded
    pub success_rate: f64,
}

impl std::fmt::Display for MetricsReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{} pairs: {} translated ({:.1}%), {} failed, {} need review, {} provider calls",
            self.completed,
            self.total,
            self.succeeded,
            self.success_rate,
            self.failed,
            self.needs_review,
            self.provider_calls
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_new_metrics_are_zeroed() {
        let metrics = BatchMetrics::new(10);
        assert_eq!(metrics.total(), 10);
        assert_eq!(metrics.completed(), 0);
        assert_eq!(metrics.succeeded(), 0);
        assert_eq!(metrics.failed(), 0);
        assert_eq!(metrics.needs_review(), 0);
        assert_eq!(metrics.provider_calls(), 0);
    }

    #[test]
    fn test_record_pair_counts() {
        let metrics = BatchMetrics::new(4);
        assert_eq!(metrics.record_pair(true, false), 1);
        assert_eq!(metrics.record_pair(true, true), 2);
        assert_eq!(metrics.record_pair(false, false), 3);

        assert_eq!(metrics.succeeded(), 2);
        assert_eq!(metrics.failed(), 1);
        assert_eq!(metrics.needs_review(), 1);
    }

    #[test]
    fn test_report_success_rate() {
        let metrics = BatchMetrics::new(4);
        metrics.record_pair(true, false);
        metrics.record_pair(true, false);
        metrics.record_pair(true, false);
        metrics.record_pair(false, false);
        metrics.record_provider_calls(7);

        let report = metrics.report();
        assert_eq!(report.completed, 4);
        assert_eq!(report.provider_calls, 7);
        assert!((report.success_rate - 75.0).abs() < 0.001);
    }

    #[test]
    fn test_report_empty_run() {
        let report = BatchMetrics::new(0).report();
        assert_eq!(report.success_rate, 0.0);
    }

    #[test]
    fn test_report_display() {
        let metrics = BatchMetrics::new(2);
        metrics.record_pair(true, false);
        let text = metrics.report().to_string();
        assert!(text.contains("1/2 pairs"));
        assert!(text.contains("100.0%"));
    }

    #[test]
    fn test_concurrent_updates() {
        let metrics = Arc::new(BatchMetrics::new(800));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let metrics = Arc::clone(&metrics);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        metrics.record_pair(i % 2 == 0, false);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(metrics.completed(), 800);
        assert_eq!(metrics.succeeded(), 400);
        assert_eq!(metrics.failed(), 400);
    }
}
