//! UpdateDao - batch document updates with all-or-error semantics

use std::sync::Arc;

use chrono::Utc;
use contracts::{ContractError, Document, DEFAULT_DATE_FORMAT};
use tracing::{debug, error, instrument};

use crate::bulk_writer::BulkDocumentWriter;
use crate::client::BulkClient;
use crate::index::{index_name, index_postfix, validate_date_format};

/// Writes documents in bulk; any failure fails the whole call.
pub struct UpdateDao<C> {
    client: Arc<C>,
    date_format: String,
}

impl<C: BulkClient + Sync> UpdateDao<C> {
    pub fn new(client: Arc<C>) -> Self {
        Self {
            client,
            date_format: DEFAULT_DATE_FORMAT.to_string(),
        }
    }

    /// Use `format` for the index postfix of documents without an explicit
    /// index.
    pub fn with_date_format(mut self, format: impl Into<String>) -> Result<Self, ContractError> {
        let format = format.into();
        validate_date_format(&format)?;
        self.date_format = format;
        Ok(self)
    }

    /// Write one document; see [`UpdateDao::batch_update`].
    pub async fn update(
        &self,
        document: Document,
        index: Option<String>,
    ) -> Result<Document, ContractError> {
        let mut written = self.batch_update(vec![(document, index)]).await?;
        written
            .pop()
            .ok_or_else(|| ContractError::Other("update returned no document".to_string()))
    }

    /// Write every document, each to its explicit index or to
    /// `{sensor_type}_index_{postfix}`.
    ///
    /// Returns the documents with their final ids.
    ///
    /// # Errors
    /// `InvalidInput` before any call when a document has no timestamp.
    /// `BatchUpdate` with the first failure's cause when any document failed;
    /// every failure is logged first.
    #[instrument(name = "es_batch_update", skip_all, fields(documents = updates.len()))]
    pub async fn batch_update(
        &self,
        updates: Vec<(Document, Option<String>)>,
    ) -> Result<Vec<Document>, ContractError> {
        let postfix = index_postfix(&self.date_format, Utc::now())?;
        let mut writer: BulkDocumentWriter<Document, C> =
            BulkDocumentWriter::new(Arc::clone(&self.client));

        for (document, index) in updates {
            let index = index.unwrap_or_else(|| index_name(&document.sensor_type, &postfix));
            writer.add_document(document, index)?;
        }

        let results = writer.write().await;
        if results.has_failures() {
            error!(
                successes = results.successes().len(),
                failures = results.failures().len(),
                "Failed to update all documents"
            );
            for failure in results.failures() {
                error!(
                    guid = %failure.item.guid,
                    cause = %failure.cause,
                    "{}",
                    failure.message
                );
            }
        } else {
            debug!(documents = results.len(), "Documents updated");
        }

        results.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockBulkClient;
    use contracts::JsonRecord;
    use serde_json::json;

    fn document(guid: &str, timestamp: Option<i64>) -> Document {
        let source: JsonRecord = json!({"guid": guid, "source.type": "bro"})
            .as_object()
            .cloned()
            .unwrap();
        Document::new(source, guid, "bro", timestamp)
    }

    #[tokio::test]
    async fn test_batch_update_routes_indices() {
        let client = Arc::new(MockBulkClient::new());
        let dao = UpdateDao::new(Arc::clone(&client))
            .with_date_format("%Y")
            .unwrap();

        let written = dao
            .batch_update(vec![
                (document("g1", Some(1)), Some("explicit".to_string())),
                (document("g2", Some(2)), None),
            ])
            .await
            .unwrap();

        assert_eq!(written.len(), 2);
        assert!(written.iter().all(|d| d.document_id.is_some()));

        let body = &client.requests()[0];
        assert!(body.contains(r#""_index":"explicit""#));
        let year = Utc::now().format("%Y").to_string();
        assert!(body.contains(&format!(r#""_index":"bro_index_{year}""#)));
    }

    #[tokio::test]
    async fn test_any_failure_fails_the_call() {
        let client = Arc::new(MockBulkClient::new().failing_positions(&[1]));
        let dao = UpdateDao::new(Arc::clone(&client));

        let err = dao
            .batch_update(vec![
                (document("g1", Some(1)), None),
                (document("g2", Some(1)), None),
                (document("g3", Some(1)), None),
            ])
            .await
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "Failed to update all documents; 2 successes, 1 failures"
        );
        assert!(matches!(err, ContractError::BatchUpdate { .. }));
    }

    #[tokio::test]
    async fn test_missing_timestamp_rejected_before_any_call() {
        let client = Arc::new(MockBulkClient::new());
        let dao = UpdateDao::new(Arc::clone(&client));

        let err = dao.update(document("g1", None), None).await.unwrap_err();
        assert!(matches!(err, ContractError::InvalidInput { .. }));
        assert!(client.requests().is_empty());
    }

    #[tokio::test]
    async fn test_single_update_returns_document_with_id() {
        let client = Arc::new(MockBulkClient::new());
        let dao = UpdateDao::new(Arc::clone(&client));

        let written = dao
            .update(document("g1", Some(1)).with_document_id("doc-1"), None)
            .await
            .unwrap();
        assert_eq!(written.document_id.as_deref(), Some("doc-1"));
    }

    #[test]
    fn test_invalid_date_format_rejected() {
        let dao = UpdateDao::new(Arc::new(MockBulkClient::new()));
        assert!(dao.with_date_format("%Q").is_err());
    }
}
