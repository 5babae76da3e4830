//! Documents the bulk document writer can index

use contracts::{Document, JsonRecord, MessageId};

/// A document with the fields the bulk API needs.
pub trait IndexDocument: Send + Sync {
    /// Source body sent to the index
    fn source(&self) -> &JsonRecord;

    /// Epoch-millis timestamp; required for indexing
    fn timestamp(&self) -> Option<i64>;

    /// Existing document id; `None` lets the cluster assign one
    fn document_id(&self) -> Option<&str>;

    /// Store the id the cluster assigned
    fn set_document_id(&mut self, id: String);

    fn guid(&self) -> &str;

    fn sensor_type(&self) -> &str;
}

impl IndexDocument for Document {
    fn source(&self) -> &JsonRecord {
        &self.document
    }

    fn timestamp(&self) -> Option<i64> {
        self.timestamp
    }

    fn document_id(&self) -> Option<&str> {
        self.document_id.as_deref()
    }

    fn set_document_id(&mut self, id: String) {
        self.document_id = Some(id);
    }

    fn guid(&self) -> &str {
        &self.guid
    }

    fn sensor_type(&self) -> &str {
        &self.sensor_type
    }
}

/// A document remembering the message it was built from, so bulk outcomes can
/// be mapped back to message ids.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageIdBasedDocument {
    pub document: Document,
    pub message_id: MessageId,
}

impl MessageIdBasedDocument {
    pub fn new(document: Document, message_id: MessageId) -> Self {
        Self {
            document,
            message_id,
        }
    }
}

impl IndexDocument for MessageIdBasedDocument {
    fn source(&self) -> &JsonRecord {
        self.document.source()
    }

    fn timestamp(&self) -> Option<i64> {
        self.document.timestamp
    }

    fn document_id(&self) -> Option<&str> {
        self.document.document_id()
    }

    fn set_document_id(&mut self, id: String) {
        self.document.set_document_id(id);
    }

    fn guid(&self) -> &str {
        &self.document.guid
    }

    fn sensor_type(&self) -> &str {
        &self.document.sensor_type
    }
}
