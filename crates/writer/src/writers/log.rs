//! LogWriter - logs batch summaries via tracing

use contracts::{
    BulkMessage, BulkMessageWriter, BulkWriterResults, ContractError, MessageId,
    WriterConfiguration,
};
use tracing::{debug, info, instrument};

/// Writer that logs every batch and reports every record as written
pub struct LogWriter {
    name: String,
}

impl LogWriter {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl<M: Send + Sync> BulkMessageWriter<M> for LogWriter {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_writer_write",
        skip_all,
        fields(writer = %self.name, sensor = key, batch_size = messages.len())
    )]
    async fn write(
        &self,
        key: &str,
        _config: &dyn WriterConfiguration,
        messages: &[BulkMessage<M>],
    ) -> Result<BulkWriterResults<MessageId>, ContractError> {
        let first = messages.first().map(|m| m.id.as_str()).unwrap_or_default();
        let last = messages.last().map(|m| m.id.as_str()).unwrap_or_default();
        let destination = messages.first().map(|m| m.destination.as_str());

        info!(
            writer = %self.name,
            sensor = key,
            destination = ?destination,
            records = messages.len(),
            first_id = first,
            last_id = last,
            "Batch received"
        );

        Ok(BulkWriterResults::all_succeeded(
            messages.iter().map(|m| m.id.clone()),
        ))
    }

    async fn close(&self) -> Result<(), ContractError> {
        debug!(writer = %self.name, "LogWriter closed");
        Ok(())
    }
}
