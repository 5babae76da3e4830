//! BulkDocumentWriter - buffers documents and submits them in one bulk call
//!
//! Response item *i* is the outcome of buffered document *i*; ids in the
//! response are never used for correlation. The buffer is empty after every
//! `write`, whatever its outcome.

use std::sync::Arc;

use contracts::{BulkWriterResults, ContractError, ErrorCause};
use tracing::{debug, error, instrument};

use crate::client::BulkClient;
use crate::document::IndexDocument;
use crate::request::BulkRequest;
use crate::WRITER_NAME;

/// Results of one `BulkDocumentWriter::write`
pub type BulkDocumentWriterResults<D> = BulkWriterResults<D>;

type SuccessListener<D> = Box<dyn Fn(&[D]) + Send + Sync>;
type FailureListener<D> = Box<dyn Fn(&D, &ErrorCause, &str) + Send + Sync>;

struct Indexable<D> {
    document: D,
    index: String,
}

/// Writes documents to indices in bulk.
///
/// Listeners run synchronously inside `write`, before it returns.
pub struct BulkDocumentWriter<D, C> {
    client: Arc<C>,
    documents: Vec<Indexable<D>>,
    on_success: Option<SuccessListener<D>>,
    on_failure: Option<FailureListener<D>>,
}

impl<D, C> BulkDocumentWriter<D, C>
where
    D: IndexDocument,
    C: BulkClient + Sync,
{
    pub fn new(client: Arc<C>) -> Self {
        Self {
            client,
            documents: Vec::new(),
            on_success: None,
            on_failure: None,
        }
    }

    /// Called once per `write` with every successful document.
    pub fn on_success(&mut self, listener: impl Fn(&[D]) + Send + Sync + 'static) {
        self.on_success = Some(Box::new(listener));
    }

    /// Called once per failed document with the cause and a message.
    pub fn on_failure(
        &mut self,
        listener: impl Fn(&D, &ErrorCause, &str) + Send + Sync + 'static,
    ) {
        self.on_failure = Some(Box::new(listener));
    }

    /// Buffer `document` for `index`.
    ///
    /// # Errors
    /// `InvalidInput` when the document has no timestamp. The document is not
    /// buffered and the rest of the batch is unaffected.
    pub fn add_document(
        &mut self,
        document: D,
        index: impl Into<String>,
    ) -> Result<(), ContractError> {
        let index = index.into();
        if document.timestamp().is_none() {
            return Err(ContractError::invalid_input(format!(
                "Document must contain the timestamp; guid={}, sensorType={}",
                document.guid(),
                document.sensor_type()
            )));
        }

        debug!(
            guid = document.guid(),
            index = %index,
            doc_id = ?document.document_id(),
            "Adding document to batch"
        );
        self.documents.push(Indexable { document, index });
        Ok(())
    }

    /// Number of buffered documents
    pub fn size(&self) -> usize {
        self.documents.len()
    }

    /// Submit every buffered document in one bulk call.
    #[instrument(
        name = "es_bulk_document_write",
        skip(self),
        fields(batch_size = self.documents.len())
    )]
    pub async fn write(&mut self) -> BulkDocumentWriterResults<D> {
        let documents = std::mem::take(&mut self.documents);
        if documents.is_empty() {
            return BulkWriterResults::new();
        }

        let mut request = BulkRequest::new();
        let mut submitted = Vec::with_capacity(documents.len());
        let mut results = BulkWriterResults::new();

        for Indexable { document, index } in documents {
            match request.add_index(&index, document.document_id(), document.source()) {
                Ok(()) => submitted.push(document),
                Err(e) => {
                    let message = e.to_string();
                    let cause = e.into_cause();
                    self.notify_failure(&document, &cause, &message);
                    results.add_failure(document, cause, message);
                }
            }
        }

        if submitted.is_empty() {
            return results;
        }

        let batch_size = submitted.len();
        match self.client.bulk(request).await {
            Ok(response) => {
                let mut items = response.items.into_iter();
                let mut successes = Vec::new();

                for (position, mut document) in submitted.into_iter().enumerate() {
                    let outcome = items.next();
                    match outcome.as_ref().and_then(|item| item.result()) {
                        Some(item) if !item.is_failed() => {
                            if let Some(id) = &item.id {
                                document.set_document_id(id.clone());
                            }
                            successes.push(document);
                        }
                        Some(item) => {
                            let message = item.failure_message();
                            let cause =
                                ContractError::writer_failure(WRITER_NAME, &message).into_cause();
                            debug!(
                                guid = document.guid(),
                                error = %message,
                                "Document failed"
                            );
                            self.notify_failure(&document, &cause, &message);
                            results.add_failure(document, cause, message);
                        }
                        None => {
                            let cause = ContractError::MissingResponse {
                                writer: WRITER_NAME.to_string(),
                                position,
                            };
                            let message = cause.to_string();
                            let cause = cause.into_cause();
                            debug!(
                                guid = document.guid(),
                                error = %message,
                                "Document failed"
                            );
                            self.notify_failure(&document, &cause, &message);
                            results.add_failure(document, cause, message);
                        }
                    }
                }

                if let Some(listener) = &self.on_success {
                    listener(&successes);
                }
                debug!(
                    batch_size = batch_size,
                    success = successes.len(),
                    failed = batch_size - successes.len(),
                    took_ms = response.took,
                    "Wrote document(s) to Elasticsearch"
                );
                for document in successes {
                    results.add_success(document);
                }
            }
            Err(e) => {
                error!(
                    batch_size = batch_size,
                    error = %e,
                    "Failed to submit bulk request; all documents failed"
                );
                let cause = e.into_cause();
                let message = contracts::root_cause_message(cause.as_ref());
                for document in submitted {
                    self.notify_failure(&document, &cause, &message);
                    results.add_failure(document, Arc::clone(&cause), message.clone());
                }
            }
        }

        results
    }

    fn notify_failure(&self, document: &D, cause: &ErrorCause, message: &str) {
        if let Some(listener) = &self.on_failure {
            listener(document, cause, message);
        }
    }
}
