//! Bulk response model

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

/// Body of a `_bulk` response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BulkResponse {
    /// Milliseconds spent by the cluster
    #[serde(default)]
    pub took: u64,
    /// True when at least one item failed
    #[serde(default)]
    pub errors: bool,
    /// One entry per submitted operation, in submission order
    #[serde(default)]
    pub items: Vec<BulkItem>,
}

/// One response item, keyed by operation type (`index`, `create`, ...)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct BulkItem(pub HashMap<String, BulkItemResult>);

impl BulkItem {
    /// Item for an `index` operation
    pub fn index(result: BulkItemResult) -> Self {
        Self(HashMap::from([("index".to_string(), result)]))
    }

    /// Result of the operation, whatever its type
    pub fn result(&self) -> Option<&BulkItemResult> {
        self.0.values().next()
    }
}

/// Outcome of one operation
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BulkItemResult {
    #[serde(rename = "_index", default)]
    pub index: String,
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
    #[serde(default)]
    pub status: u16,
    #[serde(default)]
    pub error: Option<Value>,
}

impl BulkItemResult {
    pub fn is_failed(&self) -> bool {
        self.error.is_some() || self.status >= 300
    }

    /// `type: reason` of the error, or the status code
    pub fn failure_message(&self) -> String {
        match &self.error {
            Some(Value::Object(error)) => {
                let kind = error.get("type").and_then(Value::as_str).unwrap_or("error");
                match error.get("reason").and_then(Value::as_str) {
                    Some(reason) => format!("{kind}: {reason}"),
                    None => kind.to_string(),
                }
            }
            Some(other) => other.to_string(),
            None => format!("status {}", self.status),
        }
    }
}
