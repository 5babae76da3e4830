//! BulkWriterComponent - per-destination batching and outcome reconciliation
//!
//! Records are appended to the batch of their destination key; the flush
//! policies decide when that batch is handed to a `BulkMessageWriter` in one
//! call. The writer's per-record results are mapped back onto the `RecordSink`
//! so every record that entered a batch gets exactly one `ack` or `fail`.
//!
//! Each key owns an async lock held from append until the flush of that key
//! completes. Different keys never wait on each other.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use contracts::{
    BulkMessage, BulkMessageWriter, BulkWriterResults, ContractError, MessageId, RecordSink,
    WriteFailure, WriterConfiguration,
};
use futures::future::join_all;
use observability::{FlushMetricsAggregator, MetricsSummary};
use tokio::time::Instant;
use tracing::{debug, error, instrument, warn};

use crate::flush_policy::{CountFlushPolicy, FlushPolicy, TimeFlushPolicy};
use crate::metrics::WriterMetrics;

type Batch<M> = Arc<tokio::sync::Mutex<Vec<BulkMessage<M>>>>;

/// What caused a flush
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlushTrigger {
    /// Batch reached its configured size
    Count,
    /// Batch timeout elapsed
    Timeout,
    /// Drained on shutdown
    Shutdown,
    /// Explicit `flush` call
    Manual,
}

impl FlushTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::Timeout => "timeout",
            Self::Shutdown => "shutdown",
            Self::Manual => "manual",
        }
    }
}

impl std::fmt::Display for FlushTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accounting of one flush
#[derive(Debug, Clone, PartialEq)]
pub struct FlushReport {
    pub key: String,
    pub trigger: FlushTrigger,
    pub batch_size: usize,
    pub acked: usize,
    pub failed: usize,
    pub latency: Duration,
}

impl FlushReport {
    fn empty(key: &str, trigger: FlushTrigger) -> Self {
        Self {
            key: key.to_string(),
            trigger,
            batch_size: 0,
            acked: 0,
            failed: 0,
            latency: Duration::ZERO,
        }
    }

    /// Nothing was submitted
    pub fn is_empty(&self) -> bool {
        self.batch_size == 0
    }
}

/// Multiplexes records of many destination keys onto one bulk writer.
pub struct BulkWriterComponent<M, S> {
    sink: S,
    policies: Vec<Box<dyn FlushPolicy<M>>>,
    batches: parking_lot::Mutex<HashMap<String, Batch<M>>>,
    warned_defaults: parking_lot::Mutex<HashSet<String>>,
    metrics: Arc<WriterMetrics>,
    flushes: parking_lot::Mutex<FlushMetricsAggregator>,
}

impl<M, S> BulkWriterComponent<M, S>
where
    M: Send + Sync,
    S: RecordSink,
{
    /// Component flushing on batch size first, then on batch timeout.
    pub fn new(sink: S, max_batch_timeout: Duration) -> Self {
        Self::with_policies(
            sink,
            vec![
                Box::new(CountFlushPolicy::new()),
                Box::new(TimeFlushPolicy::new(max_batch_timeout)),
            ],
        )
    }

    /// Component evaluating `policies` in the given order.
    pub fn with_policies(sink: S, policies: Vec<Box<dyn FlushPolicy<M>>>) -> Self {
        Self {
            sink,
            policies,
            batches: parking_lot::Mutex::new(HashMap::new()),
            warned_defaults: parking_lot::Mutex::new(HashSet::new()),
            metrics: Arc::new(WriterMetrics::new()),
            flushes: parking_lot::Mutex::new(FlushMetricsAggregator::new()),
        }
    }

    /// Append a policy, evaluated after the existing ones.
    pub fn add_policy(&mut self, policy: Box<dyn FlushPolicy<M>>) {
        self.policies.push(policy);
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn metrics(&self) -> &Arc<WriterMetrics> {
        &self.metrics
    }

    /// Aggregate of every non-empty flush so far
    pub fn flush_summary(&self) -> MetricsSummary {
        self.flushes.lock().summary()
    }

    /// Accept one record for `key`.
    ///
    /// Nothing is acknowledged here unless the key is disabled, in which case
    /// the record is acknowledged immediately and never batched. Returns the
    /// report of the flush this record triggered, if any.
    pub async fn write<W>(
        &self,
        key: &str,
        id: impl Into<MessageId>,
        message: M,
        writer: &W,
        config: &dyn WriterConfiguration,
    ) -> Option<FlushReport>
    where
        W: BulkMessageWriter<M>,
    {
        let id = id.into();
        self.metrics.inc_received();
        observability::record_message_received(writer.name(), key);

        if !config.is_enabled(key) {
            debug!(writer = writer.name(), sensor = key, id = %id, "Destination disabled, acking");
            self.sink.ack(&id);
            self.metrics.add_acked(1);
            observability::record_message_outcome(writer.name(), key, 1, 0);
            return None;
        }

        if config.is_default(key) {
            self.warn_default(writer.name(), key);
        }

        let destination = writer.destination(key, &message, config);
        let batch = self.batch_for(key);
        let mut pending = batch.lock().await;
        pending.push(BulkMessage::new(id, message, destination));
        observability::record_pending_depth(writer.name(), key, pending.len());

        let trigger = self
            .policies
            .iter()
            .find(|policy| policy.should_flush(key, config, &pending))
            .map(|policy| policy.trigger())?;

        Some(
            self.flush_locked(key, &mut pending, writer, config, trigger)
                .await,
        )
    }

    /// Flush the batch of `key` regardless of the policies.
    pub async fn flush<W>(
        &self,
        key: &str,
        writer: &W,
        config: &dyn WriterConfiguration,
    ) -> FlushReport
    where
        W: BulkMessageWriter<M>,
    {
        let batch = self.batch_for(key);
        let mut pending = batch.lock().await;
        self.flush_locked(key, &mut pending, writer, config, FlushTrigger::Manual)
            .await
    }

    /// Evaluate the timeout-driven policies for every key with pending records
    /// and flush the keys that are due. Keys flush concurrently.
    #[instrument(name = "writer_flush_timeouts", skip_all, fields(writer = writer.name()))]
    pub async fn flush_timeouts<W>(
        &self,
        writer: &W,
        config: &dyn WriterConfiguration,
    ) -> Vec<FlushReport>
    where
        W: BulkMessageWriter<M>,
    {
        let flushes = self.snapshot_batches().into_iter().map(|(key, batch)| async move {
            let mut pending = batch.lock().await;
            if pending.is_empty() {
                return None;
            }
            let due = self
                .policies
                .iter()
                .filter(|policy| policy.is_timeout_driven())
                .find(|policy| policy.should_flush(&key, config, &pending))
                .map(|policy| policy.trigger())?;
            Some(
                self.flush_locked(&key, &mut pending, writer, config, due)
                    .await,
            )
        });

        join_all(flushes).await.into_iter().flatten().collect()
    }

    /// Flush every key with pending records (shutdown drain).
    #[instrument(name = "writer_flush_all", skip_all, fields(writer = writer.name()))]
    pub async fn flush_all<W>(
        &self,
        writer: &W,
        config: &dyn WriterConfiguration,
    ) -> Vec<FlushReport>
    where
        W: BulkMessageWriter<M>,
    {
        let flushes = self.snapshot_batches().into_iter().map(|(key, batch)| async move {
            let mut pending = batch.lock().await;
            if pending.is_empty() {
                return None;
            }
            Some(
                self.flush_locked(&key, &mut pending, writer, config, FlushTrigger::Shutdown)
                    .await,
            )
        });

        join_all(flushes).await.into_iter().flatten().collect()
    }

    /// Number of records waiting per key.
    ///
    /// Waits for in-flight flushes, so a key being flushed reports its
    /// post-flush depth.
    pub async fn pending(&self) -> BTreeMap<String, usize> {
        let mut depths = BTreeMap::new();
        for (key, batch) in self.snapshot_batches() {
            let len = batch.lock().await.len();
            depths.insert(key, len);
        }
        depths
    }

    /// Total number of records waiting across keys.
    pub async fn pending_total(&self) -> usize {
        self.pending().await.values().sum()
    }

    fn batch_for(&self, key: &str) -> Batch<M> {
        let mut batches = self.batches.lock();
        Arc::clone(
            batches
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(Vec::new()))),
        )
    }

    fn snapshot_batches(&self) -> Vec<(String, Batch<M>)> {
        self.batches
            .lock()
            .iter()
            .map(|(key, batch)| (key.clone(), Arc::clone(batch)))
            .collect()
    }

    fn warn_default(&self, writer: &str, key: &str) {
        self.metrics.inc_default_config_used();
        observability::record_default_config_used(writer, key);

        let first = self.warned_defaults.lock().insert(key.to_string());
        if first {
            warn!(
                writer = writer,
                sensor = key,
                "No configuration found for sensor, using defaults"
            );
        }
    }

    /// Submit and clear `pending`. The caller holds the key's lock.
    #[instrument(
        name = "writer_flush",
        skip(self, pending, writer, config),
        fields(writer = writer.name(), sensor = key, trigger = %trigger, batch_size = pending.len())
    )]
    async fn flush_locked<W>(
        &self,
        key: &str,
        pending: &mut Vec<BulkMessage<M>>,
        writer: &W,
        config: &dyn WriterConfiguration,
        trigger: FlushTrigger,
    ) -> FlushReport
    where
        W: BulkMessageWriter<M>,
    {
        let messages = std::mem::take(pending);
        if messages.is_empty() {
            self.reset_policies(key);
            return FlushReport::empty(key, trigger);
        }

        let started = Instant::now();
        let results = match writer.write(key, config, &messages).await {
            Ok(results) => results,
            Err(e) => {
                error!(
                    writer = writer.name(),
                    sensor = key,
                    batch_size = messages.len(),
                    error = %e,
                    "Bulk write failed, failing whole batch"
                );
                BulkWriterResults::all_failed(messages.iter().map(|m| m.id.clone()), e.into_cause())
            }
        };
        let latency = started.elapsed();

        let (acked, failed) = self.reconcile(key, writer.name(), &messages, results);

        self.metrics.inc_batches_flushed();
        self.metrics.add_acked(acked as u64);
        self.metrics.add_failed(failed as u64);
        observability::record_batch_flushed(writer.name(), key, trigger.as_str(), messages.len());
        observability::record_message_outcome(writer.name(), key, acked as u64, failed as u64);
        observability::record_flush_latency_ms(writer.name(), latency.as_secs_f64() * 1000.0);
        observability::record_pending_depth(writer.name(), key, 0);
        self.flushes.lock().update(
            key,
            trigger.as_str(),
            acked,
            failed,
            latency.as_secs_f64() * 1000.0,
        );

        if failed > 0 {
            error!(
                writer = writer.name(),
                sensor = key,
                "Failed to write all messages; {} successes, {} failures",
                acked,
                failed
            );
        } else {
            debug!(
                writer = writer.name(),
                sensor = key,
                acked = acked,
                latency_ms = latency.as_millis() as u64,
                "Batch flushed"
            );
        }

        self.reset_policies(key);

        FlushReport {
            key: key.to_string(),
            trigger,
            batch_size: messages.len(),
            acked,
            failed,
            latency,
        }
    }

    /// Ack or fail every message of the batch from the writer's results.
    ///
    /// Outcomes are matched to batch positions. A repeated id consumes the
    /// next position carrying that id, in batch order, so records sharing a
    /// correlation handle each get their own outcome. Outcomes beyond the
    /// positions of an id are ignored. Positions the writer reported nothing
    /// for fail with `MissingResponse`.
    fn reconcile(
        &self,
        key: &str,
        writer: &str,
        messages: &[BulkMessage<M>],
        results: BulkWriterResults<MessageId>,
    ) -> (usize, usize) {
        let mut outstanding: HashMap<&MessageId, VecDeque<usize>> = HashMap::new();
        for (position, m) in messages.iter().enumerate() {
            outstanding.entry(&m.id).or_default().push_back(position);
        }
        let mut take = |id: &MessageId| {
            outstanding
                .get_mut(id)
                .and_then(|positions| positions.pop_front())
        };
        let (successes, failures) = results.into_parts();
        let (mut acked, mut failed) = (0, 0);

        for id in &successes {
            if take(id).is_some() {
                self.sink.ack(id);
                acked += 1;
            } else {
                warn!(writer = writer, sensor = key, id = %id, "Ignoring success for unknown message");
            }
        }

        for failure in &failures {
            if take(&failure.item).is_some() {
                self.fail(key, writer, failure);
                failed += 1;
            } else {
                warn!(writer = writer, sensor = key, id = %failure.item, "Ignoring failure for unknown message");
            }
        }

        let mut missing: Vec<(&MessageId, usize)> = outstanding
            .into_iter()
            .flat_map(|(id, positions)| positions.into_iter().map(move |p| (id, p)))
            .collect();
        missing.sort_by_key(|(_, position)| *position);
        for (id, position) in missing {
            let cause = ContractError::MissingResponse {
                writer: writer.to_string(),
                position,
            }
            .into_cause();
            self.fail(key, writer, &WriteFailure::from_cause(id.clone(), cause));
            failed += 1;
        }

        (acked, failed)
    }

    fn fail(&self, key: &str, writer: &str, failure: &WriteFailure<MessageId>) {
        error!(
            writer = writer,
            sensor = key,
            id = %failure.item,
            cause = %failure.cause,
            "{}",
            failure.message
        );
        self.sink.fail(&failure.item, &failure.cause, &failure.message);
    }

    fn reset_policies(&self, key: &str) {
        for policy in &self.policies {
            policy.reset(key);
        }
    }
}
