//! Writer traits - backend output interface
//!
//! `BulkMessageWriter` is the seam between the batching component and a
//! concrete store. `MessageWriter` is the narrower contract of stores that can
//! only take one record at a time.

use std::future::Future;

use crate::{
    BulkMessage, BulkWriterResults, ContractError, JsonRecord, MessageId, WriterConfiguration,
};

/// Bulk output trait
///
/// One call to `write` is one bulk submission. The returned results must carry
/// exactly one outcome per submitted message id. A whole-call failure may be
/// reported either as `Err` or as results failing every message; the writer
/// component treats both the same way.
pub trait BulkMessageWriter<M: Send + Sync>: Send + Sync {
    /// Writer name (configuration lookup, logs, metrics)
    fn name(&self) -> &str;

    /// Resolve the target destination of a record
    ///
    /// Called once per record when it enters a batch.
    fn destination(&self, key: &str, _message: &M, config: &dyn WriterConfiguration) -> String {
        config.index(key)
    }

    /// Submit one batch for `key`
    ///
    /// # Errors
    /// Returns transport error when nothing could be submitted
    fn write(
        &self,
        key: &str,
        config: &dyn WriterConfiguration,
        messages: &[BulkMessage<M>],
    ) -> impl Future<Output = Result<BulkWriterResults<MessageId>, ContractError>> + Send;

    /// Release backend resources
    fn close(&self) -> impl Future<Output = Result<(), ContractError>> + Send {
        async { Ok(()) }
    }
}

/// Single record output trait
#[trait_variant::make(MessageWriter: Send)]
pub trait LocalMessageWriter {
    fn name(&self) -> &str;

    /// Write one record to `destination`
    async fn write(
        &self,
        destination: &str,
        id: &MessageId,
        message: &JsonRecord,
    ) -> Result<(), ContractError>;
}
