//! CountingSink - terminal outcome counters for records read by the CLI

use std::sync::atomic::{AtomicU64, Ordering};

use contracts::{ErrorCause, MessageId, RecordSink};
use tracing::trace;

/// `RecordSink` counting acks and fails.
///
/// Input lines have no upstream to replay them, so a failed record is only
/// counted; the component has already logged it.
#[derive(Debug, Default)]
pub struct CountingSink {
    acked: AtomicU64,
    failed: AtomicU64,
}

impl CountingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acked(&self) -> u64 {
        self.acked.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }
}

impl RecordSink for CountingSink {
    fn ack(&self, id: &MessageId) {
        trace!(id = %id, "Record acked");
        self.acked.fetch_add(1, Ordering::Relaxed);
    }

    fn fail(&self, id: &MessageId, _cause: &ErrorCause, message: &str) {
        trace!(id = %id, error = message, "Record failed");
        self.failed.fetch_add(1, Ordering::Relaxed);
    }
}
