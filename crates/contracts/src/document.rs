//! Document - a record prepared for a document index.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{sensor_type, timestamp, JsonRecord, GUID_FIELD};

/// An indexable document.
///
/// `document_id` is the backend identity. When it is `None` the backend
/// assigns one on write, and the writer stores the assigned value back here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub document: JsonRecord,
    pub guid: String,
    pub sensor_type: String,
    pub timestamp: Option<i64>,
    pub document_id: Option<String>,
}

impl Document {
    pub fn new(
        document: JsonRecord,
        guid: impl Into<String>,
        sensor_type: impl Into<String>,
        timestamp: Option<i64>,
    ) -> Self {
        Self {
            document,
            guid: guid.into(),
            sensor_type: sensor_type.into(),
            timestamp,
            document_id: None,
        }
    }

    /// Build a document from a telemetry record.
    ///
    /// `id_field` names the record field holding the document id, if any.
    pub fn from_record(record: JsonRecord, id_field: Option<&str>) -> Self {
        let guid = record
            .get(GUID_FIELD)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let sensor = sensor_type(&record).unwrap_or_default().to_string();
        let ts = timestamp(&record);
        let document_id = id_field
            .and_then(|field| record.get(field))
            .and_then(Value::as_str)
            .map(str::to_string);

        Self {
            document: record,
            guid,
            sensor_type: sensor,
            timestamp: ts,
            document_id,
        }
    }

    pub fn with_document_id(mut self, id: impl Into<String>) -> Self {
        self.document_id = Some(id.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record() -> JsonRecord {
        json!({
            "guid": "g-1",
            "source.type": "bro",
            "timestamp": 1_600_000_000_000i64,
            "ip_src_addr": "10.0.0.1"
        })
        .as_object()
        .cloned()
        .unwrap_or_default()
    }

    #[test]
    fn test_from_record_without_id_field() {
        let doc = Document::from_record(record(), None);
        assert_eq!(doc.guid, "g-1");
        assert_eq!(doc.sensor_type, "bro");
        assert_eq!(doc.timestamp, Some(1_600_000_000_000));
        assert_eq!(doc.document_id, None);
    }

    #[test]
    fn test_from_record_with_id_field() {
        let doc = Document::from_record(record(), Some("guid"));
        assert_eq!(doc.document_id.as_deref(), Some("g-1"));
    }
}
