//! In-memory `BulkClient` for tests
//!
//! Parses the submitted NDJSON and answers with one item per operation.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use contracts::ContractError;
use parking_lot::Mutex;
use serde_json::{json, Value};

use crate::client::BulkClient;
use crate::request::BulkRequest;
use crate::response::{BulkItem, BulkItemResult, BulkResponse};
use crate::WRITER_NAME;

/// Scripted bulk client.
///
/// Items without an explicit `_id` get `auto-{n}`, numbered across all calls.
#[derive(Debug, Default)]
pub struct MockBulkClient {
    requests: Mutex<Vec<String>>,
    failing_positions: HashSet<usize>,
    dropped_items: usize,
    transport_failure: AtomicBool,
    next_id: AtomicUsize,
}

impl MockBulkClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject the operations at these positions of every request.
    pub fn failing_positions(mut self, positions: &[usize]) -> Self {
        self.failing_positions.extend(positions.iter().copied());
        self
    }

    /// Leave the last `count` items out of every response.
    pub fn dropping_items(mut self, count: usize) -> Self {
        self.dropped_items = count;
        self
    }

    pub fn set_transport_failure(&self, fail: bool) {
        self.transport_failure.store(fail, Ordering::Relaxed);
    }

    /// Every submitted body in call order
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }

    fn respond(&self, body: &str) -> BulkResponse {
        let actions: Vec<(String, Option<String>)> = body
            .lines()
            .step_by(2)
            .filter_map(|line| serde_json::from_str::<Value>(line).ok())
            .map(|action| {
                let meta = &action["index"];
                (
                    meta["_index"].as_str().unwrap_or_default().to_string(),
                    meta["_id"].as_str().map(str::to_string),
                )
            })
            .collect();

        let reported = actions.len().saturating_sub(self.dropped_items);
        let mut errors = false;
        let items = actions
            .into_iter()
            .take(reported)
            .enumerate()
            .map(|(position, (index, id))| {
                let id = id.or_else(|| {
                    let n = self.next_id.fetch_add(1, Ordering::Relaxed);
                    Some(format!("auto-{n}"))
                });
                if self.failing_positions.contains(&position) {
                    errors = true;
                    BulkItem::index(BulkItemResult {
                        index,
                        id,
                        status: 400,
                        error: Some(json!({
                            "type": "mapper_parsing_exception",
                            "reason": format!("failed to parse document at position {position}")
                        })),
                    })
                } else {
                    BulkItem::index(BulkItemResult {
                        index,
                        id,
                        status: 201,
                        error: None,
                    })
                }
            })
            .collect();

        BulkResponse {
            took: 1,
            errors,
            items,
        }
    }
}

impl BulkClient for MockBulkClient {
    async fn bulk(&self, request: BulkRequest) -> Result<BulkResponse, ContractError> {
        let body = request.into_body();
        self.requests.lock().push(body.clone());

        if self.transport_failure.load(Ordering::Relaxed) {
            return Err(ContractError::transport_from(
                WRITER_NAME,
                std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused"),
            ));
        }
        Ok(self.respond(&body))
    }
}
