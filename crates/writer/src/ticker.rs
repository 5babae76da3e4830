//! TickerHandle - periodic timeout flushes on a background task

use std::sync::Arc;
use std::time::Duration;

use contracts::{BulkMessageWriter, RecordSink, WriterConfiguration, MAX_MESSAGE_TIMEOUT_SECS};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, instrument};

use crate::component::{BulkWriterComponent, FlushReport};

/// Handle to a running tick task
pub struct TickerHandle {
    interval: Duration,
    shutdown_tx: oneshot::Sender<()>,
    worker_handle: JoinHandle<()>,
}

impl TickerHandle {
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Stop ticking. A flush already in progress completes first.
    #[instrument(name = "ticker_shutdown", skip(self))]
    pub async fn shutdown(self) {
        // Receiver may already be gone if the task ended
        let _ = self.shutdown_tx.send(());
        if let Err(e) = self.worker_handle.await {
            error!(error = ?e, "Ticker task panicked");
        }
        debug!("Ticker shutdown complete");
    }
}

/// Spawn a task calling `flush_timeouts` every `interval`.
///
/// The first check happens one full interval after spawning. The interval is
/// clamped between one millisecond and `MAX_MESSAGE_TIMEOUT_SECS`.
pub fn spawn_ticker<M, S, W, C>(
    component: Arc<BulkWriterComponent<M, S>>,
    writer: Arc<W>,
    config: Arc<C>,
    interval: Duration,
) -> TickerHandle
where
    M: Send + Sync + 'static,
    S: RecordSink + 'static,
    W: BulkMessageWriter<M> + 'static,
    C: WriterConfiguration + 'static,
{
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let period = interval.clamp(
        Duration::from_millis(1),
        Duration::from_secs(MAX_MESSAGE_TIMEOUT_SECS),
    );

    let worker_handle = tokio::spawn(async move {
        ticker_loop(component, writer, config, period, shutdown_rx).await;
    });

    TickerHandle {
        interval: period,
        shutdown_tx,
        worker_handle,
    }
}

#[instrument(
    name = "ticker_loop",
    skip(component, writer, config, shutdown_rx),
    fields(writer = writer.name(), interval_ms = period.as_millis() as u64)
)]
async fn ticker_loop<M, S, W, C>(
    component: Arc<BulkWriterComponent<M, S>>,
    writer: Arc<W>,
    config: Arc<C>,
    period: Duration,
    mut shutdown_rx: oneshot::Receiver<()>,
) where
    M: Send + Sync + 'static,
    S: RecordSink + 'static,
    W: BulkMessageWriter<M> + 'static,
    C: WriterConfiguration + 'static,
{
    debug!("Ticker started");

    let mut ticks = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = &mut shutdown_rx => break,
            _ = ticks.tick() => {
                let reports: Vec<FlushReport> = component
                    .flush_timeouts(writer.as_ref(), config.as_ref())
                    .await;
                if !reports.is_empty() {
                    debug!(flushed = reports.len(), "Timeout flush");
                }
            }
        }
    }

    debug!("Ticker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{writer_config, MockBulkWriter, RecordingSink};
    use contracts::MessageId;

    #[tokio::test(start_paused = true)]
    async fn test_ticker_flushes_idle_batch() {
        let sink = Arc::new(RecordingSink::new());
        let component = Arc::new(BulkWriterComponent::new(
            Arc::clone(&sink),
            Duration::from_secs(15),
        ));
        let writer = Arc::new(MockBulkWriter::new("elasticsearch"));
        let config = Arc::new(writer_config("elasticsearch", &[("bro", 100, 2)]));

        component
            .write("bro", 7u64, "m".to_string(), writer.as_ref(), config.as_ref())
            .await;

        let ticker = spawn_ticker(
            Arc::clone(&component),
            Arc::clone(&writer),
            Arc::clone(&config),
            Duration::from_secs(1),
        );

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(sink.acked().is_empty());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(sink.acked(), vec![MessageId::from(7u64)]);

        ticker.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_ticking() {
        let sink = Arc::new(RecordingSink::new());
        let component = Arc::new(BulkWriterComponent::<String, _>::new(
            Arc::clone(&sink),
            Duration::from_secs(15),
        ));
        let writer = Arc::new(MockBulkWriter::new("elasticsearch"));
        let config = Arc::new(writer_config("elasticsearch", &[("bro", 100, 1)]));

        let ticker = spawn_ticker(
            Arc::clone(&component),
            Arc::clone(&writer),
            Arc::clone(&config),
            Duration::from_secs(1),
        );
        assert_eq!(ticker.interval(), Duration::from_secs(1));
        ticker.shutdown().await;

        component
            .write("bro", 1u64, "m".to_string(), writer.as_ref(), config.as_ref())
            .await;
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(sink.acked().is_empty());
        assert_eq!(component.pending_total().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_oversized_interval_is_clamped() {
        let component = Arc::new(BulkWriterComponent::<String, _>::new(
            Arc::new(RecordingSink::new()),
            Duration::from_secs(15),
        ));
        let writer = Arc::new(MockBulkWriter::new("elasticsearch"));
        let config = Arc::new(writer_config("elasticsearch", &[]));

        let ticker = spawn_ticker(component, writer, config, Duration::MAX);
        assert_eq!(
            ticker.interval(),
            Duration::from_secs(MAX_MESSAGE_TIMEOUT_SECS)
        );
        tokio::time::sleep(Duration::from_secs(1)).await;
        ticker.shutdown().await;
    }
}
