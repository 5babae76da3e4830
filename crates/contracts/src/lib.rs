//! # Contracts
//!
//! Frozen interface contracts shared by the writer, its backends and the CLI.
//! Business crates depend on this crate only; reverse dependencies are prohibited.
//!
//! ## Delivery model
//! - Every record enters with a `MessageId` owned by the inbound `RecordSink`
//! - Records are batched per destination key (sensor type)
//! - Every record receives exactly one `ack` or `fail`, never a retry

mod configuration;
mod document;
mod error;
mod message;
mod message_id;
mod results;
mod sink;
mod writer;

pub use configuration::*;
pub use document::Document;
pub use error::*;
pub use message::*;
pub use message_id::MessageId;
pub use results::*;
pub use sink::RecordSink;
pub use writer::{BulkMessageWriter, LocalMessageWriter, MessageWriter};
