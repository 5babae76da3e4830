//! RecordSink trait - inbound delivery acknowledgement interface
//!
//! The upstream delivery framework hands records to the writer together with a
//! `MessageId` and expects exactly one of `ack` or `fail` back per id.

use std::sync::Arc;

use crate::{ErrorCause, MessageId};

/// Acknowledgement target for delivered records.
///
/// Implementations must tolerate `fail` by reporting or re-queueing upstream;
/// the writer never retries.
pub trait RecordSink: Send + Sync {
    /// The record was written (or intentionally skipped)
    fn ack(&self, id: &MessageId);

    /// The record reached a terminal failure
    fn fail(&self, id: &MessageId, cause: &ErrorCause, message: &str);
}

impl<S: RecordSink + ?Sized> RecordSink for Arc<S> {
    fn ack(&self, id: &MessageId) {
        (**self).ack(id)
    }

    fn fail(&self, id: &MessageId, cause: &ErrorCause, message: &str) {
        (**self).fail(id, cause, message)
    }
}
