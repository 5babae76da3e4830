//! # Elasticsearch
//!
//! Reference bulk backend targeting the Elasticsearch `_bulk` API.
//!
//! - `BulkRequest` / `BulkResponse`: NDJSON request body and per-item response
//! - `BulkClient`: one HTTP call per bulk request (`HttpBulkClient` via reqwest)
//! - `BulkDocumentWriter`: buffers documents, submits them at once and
//!   correlates response item *i* with document *i*
//! - `ElasticsearchWriter`: the `BulkMessageWriter` used by the writer component
//! - `UpdateDao`: batch updates where any failure fails the whole call

pub mod bulk_writer;
pub mod client;
pub mod document;
pub mod index;
pub mod mock;
pub mod request;
pub mod response;
pub mod update_dao;
pub mod writer;

pub use bulk_writer::{BulkDocumentWriter, BulkDocumentWriterResults};
pub use client::{BulkClient, ElasticsearchClientConfig, HttpBulkClient, LocalBulkClient};
pub use document::{IndexDocument, MessageIdBasedDocument};
pub use index::{index_name, index_postfix, validate_date_format};
pub use request::BulkRequest;
pub use response::{BulkItem, BulkItemResult, BulkResponse};
pub use update_dao::UpdateDao;
pub use writer::ElasticsearchWriter;

/// Writer name used for configuration lookup, logs and metrics
pub const WRITER_NAME: &str = "elasticsearch";
