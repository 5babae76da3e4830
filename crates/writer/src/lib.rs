//! # Writer
//!
//! Batched writes to bulk backends.
//!
//! Responsibilities:
//! - accumulate pending batches per destination (sensor type)
//! - decide when to flush via `FlushPolicy` (count / timeout)
//! - map per-record backend results back to ack / fail
//! - drive timeout flushes from a periodic tick and drain everything on shutdown

pub mod adapter;
pub mod batch_timeout;
pub mod component;
pub mod error;
pub mod flush_policy;
pub mod metrics;
pub mod mock;
pub mod ticker;
pub mod writers;

pub use adapter::WriterToBulkWriter;
pub use batch_timeout::BatchTimeoutHelper;
pub use component::{BulkWriterComponent, FlushReport, FlushTrigger};
pub use contracts::{BulkMessageWriter, RecordSink};
pub use error::WriterError;
pub use flush_policy::{CountFlushPolicy, FlushPolicy, TimeFlushPolicy};
pub use metrics::{MetricsSnapshot, WriterMetrics};
pub use ticker::{spawn_ticker, TickerHandle};
pub use writers::{FileWriter, LogWriter};
