//! MessageId - correlation handle for an inbound record
//!
//! Owned by the inbound record sink. The writer never interprets it; it is only
//! handed back through `RecordSink::ack` / `RecordSink::fail`.

use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

/// Opaque correlation handle.
///
/// Backed by `Arc<str>` so the same id can sit in a batch, a results aggregate
/// and a log line without reallocating.
///
/// # Examples
/// ```
/// use contracts::MessageId;
///
/// let id: MessageId = "tuple-42".into();
/// assert_eq!(id.as_str(), "tuple-42");
/// assert_eq!(id, "tuple-42");
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId(Arc<str>);

impl MessageId {
    pub fn new(id: &str) -> Self {
        Self(Arc::from(id))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for MessageId {
    #[inline]
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for MessageId {
    fn from(s: &str) -> Self {
        Self(Arc::from(s))
    }
}

impl From<String> for MessageId {
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl From<u64> for MessageId {
    fn from(seq: u64) -> Self {
        Self(Arc::from(seq.to_string()))
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MessageId({:?})", self.0)
    }
}

impl PartialEq<str> for MessageId {
    fn eq(&self, other: &str) -> bool {
        self.0.as_ref() == other
    }
}

impl PartialEq<&str> for MessageId {
    fn eq(&self, other: &&str) -> bool {
        self.0.as_ref() == *other
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_lookup_by_str() {
        let mut ids: HashSet<MessageId> = HashSet::new();
        ids.insert("a".into());
        ids.insert(7u64.into());

        assert!(ids.contains("a"));
        assert!(ids.contains("7"));
        assert!(!ids.contains("b"));
    }

    #[test]
    fn test_clone_shares_storage() {
        let id = MessageId::new("m1");
        let copy = id.clone();
        assert_eq!(id.as_str().as_ptr(), copy.as_str().as_ptr());
    }
}
