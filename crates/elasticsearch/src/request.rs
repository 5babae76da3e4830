//! Bulk request body (NDJSON)
//!
//! Each document contributes an action line followed by its source line.
//! Items keep insertion order; the response is correlated by position.

use contracts::{ContractError, JsonRecord};
use serde::Serialize;

#[derive(Serialize)]
struct IndexAction<'a> {
    index: ActionMeta<'a>,
}

#[derive(Serialize)]
struct ActionMeta<'a> {
    #[serde(rename = "_index")]
    index: &'a str,
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    id: Option<&'a str>,
}

/// An NDJSON `_bulk` body under construction
#[derive(Debug, Default, Clone)]
pub struct BulkRequest {
    body: Vec<u8>,
    items: usize,
}

impl BulkRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an index operation.
    ///
    /// Without `id` the cluster assigns one; with `id` the document is
    /// replaced.
    pub fn add_index(
        &mut self,
        index: &str,
        id: Option<&str>,
        source: &JsonRecord,
    ) -> Result<(), ContractError> {
        let action = IndexAction {
            index: ActionMeta { index, id },
        };
        let start = self.body.len();
        if let Err(e) = encode(&mut self.body, &action, source) {
            // keep the body well formed
            self.body.truncate(start);
            return Err(ContractError::invalid_input(format!(
                "cannot serialize document for index '{index}': {e}"
            )));
        }
        self.items += 1;
        Ok(())
    }

    /// Number of operations
    pub fn len(&self) -> usize {
        self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items == 0
    }

    /// The NDJSON body, newline terminated
    pub fn into_body(self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

fn encode(
    body: &mut Vec<u8>,
    action: &IndexAction<'_>,
    source: &JsonRecord,
) -> serde_json::Result<()> {
    serde_json::to_writer(&mut *body, action)?;
    body.push(b'\n');
    serde_json::to_writer(&mut *body, source)?;
    body.push(b'\n');
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn source(value: serde_json::Value) -> JsonRecord {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_body_layout() {
        let mut request = BulkRequest::new();
        request
            .add_index("bro_index_2024.01.01.00", None, &source(json!({"a": 1})))
            .unwrap();
        request
            .add_index("bro_index_2024.01.01.00", Some("doc-7"), &source(json!({"b": 2})))
            .unwrap();

        assert_eq!(request.len(), 2);
        let body = request.into_body();
        let lines: Vec<_> = body.lines().collect();
        assert_eq!(
            lines,
            vec![
                r#"{"index":{"_index":"bro_index_2024.01.01.00"}}"#,
                r#"{"a":1}"#,
                r#"{"index":{"_index":"bro_index_2024.01.01.00","_id":"doc-7"}}"#,
                r#"{"b":2}"#,
            ]
        );
        assert!(body.ends_with('\n'));
    }

    #[test]
    fn test_empty_request() {
        let request = BulkRequest::new();
        assert!(request.is_empty());
        assert!(request.into_body().is_empty());
    }
}
