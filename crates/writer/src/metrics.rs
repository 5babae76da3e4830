//! Writer metrics for observability

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters of one `BulkWriterComponent`
#[derive(Debug, Default)]
pub struct WriterMetrics {
    /// Records handed to `write`
    received: AtomicU64,
    /// Records acknowledged
    acked: AtomicU64,
    /// Records failed
    failed: AtomicU64,
    /// Non-empty batches submitted to a backend
    batches_flushed: AtomicU64,
    /// Records written under default configuration
    default_config_used: AtomicU64,
}

impl WriterMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }

    pub fn inc_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn acked(&self) -> u64 {
        self.acked.load(Ordering::Relaxed)
    }

    pub fn add_acked(&self, n: u64) {
        self.acked.fetch_add(n, Ordering::Relaxed);
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn add_failed(&self, n: u64) {
        self.failed.fetch_add(n, Ordering::Relaxed);
    }

    pub fn batches_flushed(&self) -> u64 {
        self.batches_flushed.load(Ordering::Relaxed)
    }

    pub fn inc_batches_flushed(&self) {
        self.batches_flushed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn default_config_used(&self) -> u64 {
        self.default_config_used.load(Ordering::Relaxed)
    }

    pub fn inc_default_config_used(&self) {
        self.default_config_used.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            received: self.received(),
            acked: self.acked(),
            failed: self.failed(),
            batches_flushed: self.batches_flushed(),
            default_config_used: self.default_config_used(),
        }
    }
}

/// Snapshot of writer metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub received: u64,
    pub acked: u64,
    pub failed: u64,
    pub batches_flushed: u64,
    pub default_config_used: u64,
}

impl MetricsSnapshot {
    /// Records that entered a batch and have no terminal outcome yet
    pub fn in_flight(&self) -> u64 {
        self.received.saturating_sub(self.acked + self.failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_in_flight() {
        let metrics = WriterMetrics::new();
        for _ in 0..5 {
            metrics.inc_received();
        }
        metrics.add_acked(2);
        metrics.add_failed(1);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.received, 5);
        assert_eq!(snapshot.in_flight(), 2);
    }
}
