//! Test doubles for the writer and its collaborators
//!
//! Used by unit tests here and by the end-to-end tests crate.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use contracts::{
    BulkMessage, BulkMessageWriter, BulkWriterResults, ContractError, ErrorCause, GlobalConfig,
    IndexingConfig, IndexingWriterConfiguration, MessageId, RecordSink, SensorWriterConfig,
    WriterConfiguration,
};
use parking_lot::Mutex;

/// `RecordSink` remembering every ack and fail.
#[derive(Debug, Default)]
pub struct RecordingSink {
    acked: Mutex<Vec<MessageId>>,
    failed: Mutex<Vec<(MessageId, String)>>,
    causes: Mutex<Vec<ErrorCause>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acked(&self) -> Vec<MessageId> {
        self.acked.lock().clone()
    }

    /// Failed ids with their failure message.
    pub fn failed(&self) -> Vec<(MessageId, String)> {
        self.failed.lock().clone()
    }

    pub fn causes(&self) -> Vec<ErrorCause> {
        self.causes.lock().clone()
    }

    /// Total acks plus fails
    pub fn terminal_count(&self) -> usize {
        self.acked.lock().len() + self.failed.lock().len()
    }
}

impl RecordSink for RecordingSink {
    fn ack(&self, id: &MessageId) {
        self.acked.lock().push(id.clone());
    }

    fn fail(&self, id: &MessageId, cause: &ErrorCause, message: &str) {
        self.failed.lock().push((id.clone(), message.to_string()));
        self.causes.lock().push(Arc::clone(cause));
    }
}

/// Scripted `BulkMessageWriter` capturing every submitted batch.
pub struct MockBulkWriter<M> {
    name: String,
    batches: Mutex<Vec<(String, Vec<BulkMessage<M>>)>>,
    failing_positions: HashSet<usize>,
    failing_destinations: HashSet<String>,
    transport_failure: AtomicBool,
    omit_last: bool,
}

impl<M> MockBulkWriter<M> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            batches: Mutex::new(Vec::new()),
            failing_positions: HashSet::new(),
            failing_destinations: HashSet::new(),
            transport_failure: AtomicBool::new(false),
            omit_last: false,
        }
    }

    /// Fail the records at these positions of every batch.
    pub fn failing_positions(mut self, positions: &[usize]) -> Self {
        self.failing_positions.extend(positions.iter().copied());
        self
    }

    /// Fail every record routed to `destination`.
    pub fn failing_destination(mut self, destination: impl Into<String>) -> Self {
        self.failing_destinations.insert(destination.into());
        self
    }

    /// Report no outcome for the last record of every batch.
    pub fn omitting_last_outcome(mut self) -> Self {
        self.omit_last = true;
        self
    }

    /// Make the next calls fail as a whole.
    pub fn set_transport_failure(&self, fail: bool) {
        self.transport_failure.store(fail, Ordering::Relaxed);
    }
}

impl<M: Clone> MockBulkWriter<M> {
    /// Every submitted `(key, batch)` in call order.
    pub fn batches(&self) -> Vec<(String, Vec<BulkMessage<M>>)> {
        self.batches.lock().clone()
    }
}

impl<M> BulkMessageWriter<M> for MockBulkWriter<M>
where
    M: Clone + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn write(
        &self,
        key: &str,
        _config: &dyn WriterConfiguration,
        messages: &[BulkMessage<M>],
    ) -> Result<BulkWriterResults<MessageId>, ContractError> {
        self.batches
            .lock()
            .push((key.to_string(), messages.to_vec()));

        if self.transport_failure.load(Ordering::Relaxed) {
            return Err(ContractError::transport_from(
                &self.name,
                std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused"),
            ));
        }

        let reported = if self.omit_last {
            messages.len().saturating_sub(1)
        } else {
            messages.len()
        };

        let mut results = BulkWriterResults::new();
        for (position, message) in messages.iter().take(reported).enumerate() {
            if self.failing_positions.contains(&position)
                || self.failing_destinations.contains(&message.destination)
            {
                let reason = format!("mock rejected position {position}");
                results.add_failure(
                    message.id.clone(),
                    ContractError::writer_failure(&self.name, &reason).into_cause(),
                    reason,
                );
            } else {
                results.add_success(message.id.clone());
            }
        }
        Ok(results)
    }
}

/// Writer configuration with `(sensor, batch_size, batch_timeout)` entries.
pub fn writer_config(writer: &str, sensors: &[(&str, usize, u64)]) -> IndexingWriterConfiguration {
    let sensors = sensors
        .iter()
        .map(|(sensor, batch_size, batch_timeout)| {
            (
                sensor.to_string(),
                BTreeMap::from([(
                    writer.to_string(),
                    SensorWriterConfig {
                        index: None,
                        batch_size: *batch_size,
                        batch_timeout: *batch_timeout,
                        enabled: true,
                    },
                )]),
            )
        })
        .collect();

    IndexingWriterConfiguration::new(
        writer,
        Arc::new(IndexingConfig {
            global: GlobalConfig::default(),
            sensors,
        }),
    )
}
