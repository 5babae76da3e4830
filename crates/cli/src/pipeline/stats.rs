//! Pipeline statistics.

use std::time::Duration;

use observability::MetricsSummary;

/// Statistics from a pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Records handed to the writer component
    pub records_read: u64,

    /// Lines skipped as malformed or unroutable
    pub records_skipped: u64,

    /// Records acknowledged
    pub acked: u64,

    /// Records failed
    pub failed: u64,

    /// Total duration of the pipeline run
    pub duration: Duration,

    /// Tick interval of the timeout flush driver
    pub tick_interval: Duration,

    /// Aggregate of every flush
    pub flushes: MetricsSummary,
}

impl PipelineStats {
    /// Records acknowledged per second
    pub fn throughput(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.acked as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Records read but neither acked nor failed; zero after a clean drain
    pub fn unaccounted(&self) -> u64 {
        self.records_read.saturating_sub(self.acked + self.failed)
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n=== Pipeline Statistics ===\n");
        println!("Duration: {:.2}s", self.duration.as_secs_f64());
        println!("Records read: {}", self.records_read);
        println!("Records skipped: {}", self.records_skipped);
        println!("Acked: {}", self.acked);
        println!("Failed: {}", self.failed);
        println!("Throughput: {:.2} records/s", self.throughput());
        println!("Tick interval: {}s", self.tick_interval.as_secs());
        println!();
        print!("{}", self.flushes);
        println!();
    }
}
