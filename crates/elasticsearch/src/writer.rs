//! ElasticsearchWriter - the bulk writer used by the writer component
//!
//! Each batch becomes one `_bulk` call. Records are indexed into
//! `{index}_index_{postfix}`, the postfix being the current UTC time rendered
//! with `global.date_format`.

use std::sync::Arc;

use chrono::Utc;
use contracts::{
    BulkMessage, BulkMessageWriter, BulkWriterResults, ContractError, Document, JsonRecord,
    MessageId, WriterConfiguration, DEFAULT_DATE_FORMAT,
};
use tracing::{debug, instrument, warn};

use crate::bulk_writer::BulkDocumentWriter;
use crate::client::BulkClient;
use crate::document::MessageIdBasedDocument;
use crate::index::{index_name, index_postfix};
use crate::WRITER_NAME;

/// `BulkMessageWriter` over an Elasticsearch bulk client
pub struct ElasticsearchWriter<C> {
    client: Arc<C>,
}

impl<C: BulkClient + Sync> ElasticsearchWriter<C> {
    pub fn new(client: Arc<C>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Arc<C> {
        &self.client
    }

    fn postfix(format: &str) -> String {
        let now = Utc::now();
        match index_postfix(format, now) {
            Ok(postfix) => postfix,
            Err(e) => {
                warn!(
                    date_format = format,
                    error = %e,
                    "Invalid date format, using default"
                );
                now.format(DEFAULT_DATE_FORMAT).to_string()
            }
        }
    }
}

impl<C: BulkClient + Sync> BulkMessageWriter<JsonRecord> for ElasticsearchWriter<C> {
    fn name(&self) -> &str {
        WRITER_NAME
    }

    fn destination(
        &self,
        key: &str,
        _message: &JsonRecord,
        config: &dyn WriterConfiguration,
    ) -> String {
        let postfix = Self::postfix(&config.global().date_format);
        index_name(&config.index(key), &postfix)
    }

    #[instrument(
        name = "es_writer_write",
        skip_all,
        fields(sensor = key, batch_size = messages.len())
    )]
    async fn write(
        &self,
        key: &str,
        config: &dyn WriterConfiguration,
        messages: &[BulkMessage<JsonRecord>],
    ) -> Result<BulkWriterResults<MessageId>, ContractError> {
        let id_field = config.global().document_id_field.clone();
        let mut writer: BulkDocumentWriter<MessageIdBasedDocument, C> =
            BulkDocumentWriter::new(Arc::clone(&self.client));
        let mut results = BulkWriterResults::new();

        for message in messages {
            let document = Document::from_record(message.message.clone(), id_field.as_deref());
            let document = MessageIdBasedDocument::new(document, message.id.clone());
            if let Err(e) = writer.add_document(document, message.destination.as_str()) {
                let reason = e.to_string();
                debug!(sensor = key, id = %message.id, error = %reason, "Document rejected");
                results.add_failure(message.id.clone(), e.into_cause(), reason);
            }
        }

        if writer.size() > 0 {
            let (successes, failures) = writer.write().await.into_parts();
            for document in successes {
                results.add_success(document.message_id);
            }
            for failure in failures {
                let failure = failure.map(|document| document.message_id);
                results.add_failure(failure.item, failure.cause, failure.message);
            }
        }

        debug!(
            sensor = key,
            success = results.successes().len(),
            failed = results.failures().len(),
            "Batch written"
        );
        Ok(results)
    }
}
