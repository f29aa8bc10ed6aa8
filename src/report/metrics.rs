//! Run metrics
//!
//! Thread-safe counters for path- and entry-level outcomes. Written
//! throughout a run, read once at the end.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics accumulator for one run
#[derive(Debug, Default)]
pub struct RunMetrics {
    paths_applied: AtomicU64,
    paths_failed: AtomicU64,
    paths_skipped: AtomicU64,
    entries_attempted: AtomicU64,
    entries_failed: AtomicU64,
    cache_hits: AtomicU64,
    bulk_rules: AtomicU64,
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub paths_applied: u64,
    pub paths_failed: u64,
    pub paths_skipped: u64,
    pub entries_attempted: u64,
    pub entries_ok: u64,
    pub entries_failed: u64,
    pub cache_hits: u64,
    pub bulk_rules: u64,
    /// `(attempted - failed) / attempted * 100`, 100 when nothing was attempted
    pub success_rate: f64,
}

impl RunMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_path_applied(&self) {
        self.paths_applied.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_path_failed(&self) {
        self.paths_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_paths_skipped(&self, count: u64) {
        self.paths_skipped.fetch_add(count, Ordering::Relaxed);
    }

    /// Record one attempted batch of `entries` entries
    pub fn record_batch(&self, entries: u64, success: bool) {
        self.entries_attempted.fetch_add(entries, Ordering::Relaxed);
        if !success {
            self.entries_failed.fetch_add(entries, Ordering::Relaxed);
        }
    }

    pub fn set_cache_hits(&self, hits: u64) {
        self.cache_hits.store(hits, Ordering::Relaxed);
    }

    pub fn record_bulk_rule(&self) {
        self.bulk_rules.fetch_add(1, Ordering::Relaxed);
    }

    pub fn paths_failed(&self) -> u64 {
        self.paths_failed.load(Ordering::Relaxed)
    }

    pub fn entries_failed(&self) -> u64 {
        self.entries_failed.load(Ordering::Relaxed)
    }

    /// Whether anything failed during the run
    pub fn has_failures(&self) -> bool {
        self.paths_failed() > 0 || self.entries_failed() > 0
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let attempted = self.entries_attempted.load(Ordering::Relaxed);
        let failed = self.entries_failed.load(Ordering::Relaxed);
        MetricsSnapshot {
            paths_applied: self.paths_applied.load(Ordering::Relaxed),
            paths_failed: self.paths_failed.load(Ordering::Relaxed),
            paths_skipped: self.paths_skipped.load(Ordering::Relaxed),
            entries_attempted: attempted,
            entries_ok: attempted.saturating_sub(failed),
            entries_failed: failed,
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            bulk_rules: self.bulk_rules.load(Ordering::Relaxed),
            success_rate: success_rate(attempted, failed),
        }
    }
}

impl MetricsSnapshot {
    /// Counters accumulated since `earlier`
    pub fn since(&self, earlier: &MetricsSnapshot) -> MetricsSnapshot {
        let attempted = self.entries_attempted - earlier.entries_attempted;
        let failed = self.entries_failed - earlier.entries_failed;
        MetricsSnapshot {
            paths_applied: self.paths_applied - earlier.paths_applied,
            paths_failed: self.paths_failed - earlier.paths_failed,
            paths_skipped: self.paths_skipped - earlier.paths_skipped,
            entries_attempted: attempted,
            entries_ok: attempted.saturating_sub(failed),
            entries_failed: failed,
            cache_hits: self.cache_hits - earlier.cache_hits,
            bulk_rules: self.bulk_rules - earlier.bulk_rules,
            success_rate: success_rate(attempted, failed),
        }
    }
}

pub fn success_rate(attempted: u64, failed: u64) -> f64 {
    if attempted == 0 {
        100.0
    } else {
        (attempted.saturating_sub(failed)) as f64 / attempted as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_rate() {
        assert_eq!(success_rate(0, 0), 100.0);
        assert_eq!(success_rate(4, 1), 75.0);
        assert_eq!(success_rate(3, 3), 0.0);
    }

    #[test]
    fn test_record_batches() {
        let metrics = RunMetrics::new();
        metrics.record_batch(5, true);
        metrics.record_batch(3, false);

        let snap = metrics.snapshot();
        assert_eq!(snap.entries_attempted, 8);
        assert_eq!(snap.entries_failed, 3);
        assert_eq!(snap.entries_ok, 5);
        assert_eq!(snap.success_rate, 62.5);
        assert!(metrics.has_failures());
    }

    #[test]
    fn test_snapshot_since() {
        let metrics = RunMetrics::new();
        metrics.record_path_applied();
        metrics.record_batch(2, true);
        let before = metrics.snapshot();

        metrics.record_path_failed();
        metrics.record_paths_skipped(4);
        metrics.record_batch(2, false);
        let delta = metrics.snapshot().since(&before);

        assert_eq!(delta.paths_applied, 0);
        assert_eq!(delta.paths_failed, 1);
        assert_eq!(delta.paths_skipped, 4);
        assert_eq!(delta.entries_attempted, 2);
        assert_eq!(delta.success_rate, 0.0);
    }

    #[test]
    fn test_concurrent_updates() {
        use std::sync::Arc;
        use std::thread;

        let metrics = Arc::new(RunMetrics::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let m = Arc::clone(&metrics);
                thread::spawn(move || {
                    for _ in 0..100 {
                        m.record_path_applied();
                        m.record_batch(1, true);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let snap = metrics.snapshot();
        assert_eq!(snap.paths_applied, 800);
        assert_eq!(snap.entries_attempted, 800);
    }
}
