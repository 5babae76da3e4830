//! WriterToBulkWriter - runs a single-record writer behind the bulk contract
//!
//! Pair it with `SingleMessageConfiguration` so every record flushes alone.

use contracts::{
    BulkMessage, BulkMessageWriter, BulkWriterResults, ContractError, JsonRecord, MessageId,
    MessageWriter, WriterConfiguration,
};
use tracing::instrument;

/// Bulk writer submitting each record of a batch through a `MessageWriter`.
pub struct WriterToBulkWriter<W> {
    inner: W,
}

impl<W: MessageWriter + Sync> WriterToBulkWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &W {
        &self.inner
    }
}

impl<W: MessageWriter + Sync> BulkMessageWriter<JsonRecord> for WriterToBulkWriter<W> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    #[instrument(
        name = "single_writer_write",
        skip_all,
        fields(writer = self.inner.name(), sensor = key, batch_size = messages.len())
    )]
    async fn write(
        &self,
        key: &str,
        _config: &dyn WriterConfiguration,
        messages: &[BulkMessage<JsonRecord>],
    ) -> Result<BulkWriterResults<MessageId>, ContractError> {
        let mut results = BulkWriterResults::new();
        for message in messages {
            match self
                .inner
                .write(&message.destination, &message.id, &message.message)
                .await
            {
                Ok(()) => results.add_success(message.id.clone()),
                Err(e) => {
                    let reason = e.to_string();
                    results.add_failure(message.id.clone(), e.into_cause(), reason);
                }
            }
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::BulkWriterComponent;
    use crate::mock::{writer_config, RecordingSink};
    use contracts::SingleMessageConfiguration;
    use parking_lot::Mutex;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    struct PrintWriter {
        written: Mutex<Vec<String>>,
    }

    impl MessageWriter for PrintWriter {
        fn name(&self) -> &str {
            "print"
        }

        async fn write(
            &self,
            destination: &str,
            id: &MessageId,
            message: &JsonRecord,
        ) -> Result<(), ContractError> {
            if message.contains_key("bad") {
                return Err(ContractError::writer_failure("print", "bad record"));
            }
            self.written.lock().push(format!("{destination}:{id}"));
            Ok(())
        }
    }

    fn record(value: serde_json::Value) -> JsonRecord {
        value.as_object().cloned().unwrap_or_default()
    }

    #[tokio::test]
    async fn test_single_message_flushes_each_record() {
        let writer = WriterToBulkWriter::new(PrintWriter {
            written: Mutex::new(Vec::new()),
        });
        let config = SingleMessageConfiguration::new(writer_config("print", &[("bro", 50, 0)]));
        let component =
            BulkWriterComponent::new(Arc::new(RecordingSink::new()), Duration::from_secs(15));

        let first = component
            .write("bro", 1u64, record(json!({"a": 1})), &writer, &config)
            .await;
        let second = component
            .write("bro", 2u64, record(json!({"bad": true})), &writer, &config)
            .await;

        assert_eq!(first.map(|r| r.acked), Some(1));
        assert_eq!(second.map(|r| r.failed), Some(1));
        assert_eq!(*writer.inner().written.lock(), vec!["bro:1".to_string()]);

        let failed = component.sink().failed();
        assert!(failed[0].1.contains("bad record"));
    }
}
