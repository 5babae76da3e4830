//! Bulk writer metrics
//!
//! Counters and histograms for batch flushes and message outcomes.

use metrics::{counter, gauge, histogram};
use std::collections::HashMap;

/// A message entered the writer
pub fn record_message_received(writer: &str, sensor: &str) {
    counter!(
        "bulk_indexer_messages_received_total",
        "writer" => writer.to_string(),
        "sensor" => sensor.to_string()
    )
    .increment(1);
}

/// Terminal outcome of a message (ack / fail)
pub fn record_message_outcome(writer: &str, sensor: &str, acked: u64, failed: u64) {
    if acked > 0 {
        counter!(
            "bulk_indexer_messages_acked_total",
            "writer" => writer.to_string(),
            "sensor" => sensor.to_string()
        )
        .increment(acked);
    }
    if failed > 0 {
        counter!(
            "bulk_indexer_messages_failed_total",
            "writer" => writer.to_string(),
            "sensor" => sensor.to_string()
        )
        .increment(failed);
    }
}

/// One batch flushed
///
/// `trigger` is `count`, `timeout`, `shutdown` or `manual`.
pub fn record_batch_flushed(writer: &str, sensor: &str, trigger: &str, batch_size: usize) {
    counter!(
        "bulk_indexer_batches_flushed_total",
        "writer" => writer.to_string(),
        "sensor" => sensor.to_string(),
        "trigger" => trigger.to_string()
    )
    .increment(1);

    histogram!(
        "bulk_indexer_batch_size",
        "writer" => writer.to_string(),
        "sensor" => sensor.to_string()
    )
    .record(batch_size as f64);
}

/// Backend call latency of a flush
pub fn record_flush_latency_ms(writer: &str, latency_ms: f64) {
    histogram!(
        "bulk_indexer_flush_latency_ms",
        "writer" => writer.to_string()
    )
    .record(latency_ms);
}

/// A message fell back to default writer settings
pub fn record_default_config_used(writer: &str, sensor: &str) {
    counter!(
        "bulk_indexer_default_config_total",
        "writer" => writer.to_string(),
        "sensor" => sensor.to_string()
    )
    .increment(1);
}

/// Records pending for a key
pub fn record_pending_depth(writer: &str, sensor: &str, depth: usize) {
    gauge!(
        "bulk_indexer_pending_messages",
        "writer" => writer.to_string(),
        "sensor" => sensor.to_string()
    )
    .set(depth as f64);
}

/// In-memory flush metrics
///
/// Kept alongside the exporter so a summary can be logged at exit.
#[derive(Debug, Clone, Default)]
pub struct FlushMetricsAggregator {
    /// Batches flushed
    pub total_batches: u64,

    /// Messages acked
    pub total_acked: u64,

    /// Messages failed
    pub total_failed: u64,

    /// Batch size stats
    pub batch_size_stats: RunningStats,

    /// Flush latency stats (ms)
    pub latency_stats: RunningStats,

    /// Batches per trigger
    pub trigger_counts: HashMap<String, u64>,

    /// Failures per sensor
    pub sensor_failures: HashMap<String, u64>,
}

impl FlushMetricsAggregator {
    /// Empty aggregator
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one flush into the totals
    pub fn update(
        &mut self,
        sensor: &str,
        trigger: &str,
        acked: usize,
        failed: usize,
        latency_ms: f64,
    ) {
        self.total_batches += 1;
        self.total_acked += acked as u64;
        self.total_failed += failed as u64;
        self.batch_size_stats.push((acked + failed) as f64);
        self.latency_stats.push(latency_ms);
        *self.trigger_counts.entry(trigger.to_string()).or_insert(0) += 1;

        if failed > 0 {
            *self.sensor_failures.entry(sensor.to_string()).or_insert(0) += failed as u64;
        }
    }

    /// Snapshot of the totals
    pub fn summary(&self) -> MetricsSummary {
        let total = self.total_acked + self.total_failed;
        MetricsSummary {
            total_batches: self.total_batches,
            total_acked: self.total_acked,
            total_failed: self.total_failed,
            failure_rate: if total > 0 {
                self.total_failed as f64 / total as f64 * 100.0
            } else {
                0.0
            },
            batch_size: StatsSummary::from(&self.batch_size_stats),
            flush_latency_ms: StatsSummary::from(&self.latency_stats),
            trigger_counts: self.trigger_counts.clone(),
            sensor_failures: self.sensor_failures.clone(),
        }
    }

    /// Clear all totals
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Flush metrics snapshot
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub total_batches: u64,
    pub total_acked: u64,
    pub total_failed: u64,
    pub failure_rate: f64,
    pub batch_size: StatsSummary,
    pub flush_latency_ms: StatsSummary,
    pub trigger_counts: HashMap<String, u64>,
    pub sensor_failures: HashMap<String, u64>,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Bulk Writer Summary ===")?;
        writeln!(f, "Batches flushed: {}", self.total_batches)?;
        writeln!(f, "Messages acked: {}", self.total_acked)?;
        writeln!(
            f,
            "Messages failed: {} ({:.2}%)",
            self.total_failed, self.failure_rate
        )?;
        writeln!(f, "Batch size: {}", self.batch_size)?;
        writeln!(f, "Flush latency (ms): {}", self.flush_latency_ms)?;

        if !self.trigger_counts.is_empty() {
            let mut triggers: Vec<_> = self.trigger_counts.iter().collect();
            triggers.sort();
            writeln!(f, "Flush triggers:")?;
            for (trigger, count) in triggers {
                writeln!(f, "  {}: {}", trigger, count)?;
            }
        }

        if !self.sensor_failures.is_empty() {
            let mut failures: Vec<_> = self.sensor_failures.iter().collect();
            failures.sort();
            writeln!(f, "Failures by sensor:")?;
            for (sensor, count) in failures {
                writeln!(f, "  {}: {}", sensor, count)?;
            }
        }

        Ok(())
    }
}

/// Summary of a `RunningStats`
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Streaming mean and variance (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// Add a sample
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
