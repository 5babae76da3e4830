//! Records as they travel through the writer.

use serde_json::{Map, Value};

use crate::MessageId;

/// A telemetry record as delivered by the inbound sink.
pub type JsonRecord = Map<String, Value>;

/// Field carrying the sensor type (the destination key) of a record.
pub const SENSOR_TYPE_FIELD: &str = "source.type";
/// Field carrying the globally unique id of a record.
pub const GUID_FIELD: &str = "guid";
/// Field carrying the epoch-millis timestamp of a record.
pub const TIMESTAMP_FIELD: &str = "timestamp";

/// A record waiting in a batch.
///
/// `destination` is the resolved target (e.g. a time-partitioned index name)
/// and may differ from the destination key the batch is scoped to.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkMessage<M> {
    pub id: MessageId,
    pub message: M,
    pub destination: String,
}

impl<M> BulkMessage<M> {
    pub fn new(id: impl Into<MessageId>, message: M, destination: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            message,
            destination: destination.into(),
        }
    }
}

/// Sensor type of a JSON record, if present.
pub fn sensor_type(record: &JsonRecord) -> Option<&str> {
    record.get(SENSOR_TYPE_FIELD).and_then(Value::as_str)
}

/// Epoch-millis timestamp of a JSON record, if present and numeric.
pub fn timestamp(record: &JsonRecord) -> Option<i64> {
    record.get(TIMESTAMP_FIELD).and_then(Value::as_i64)
}
