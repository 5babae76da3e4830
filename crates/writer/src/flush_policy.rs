//! Flush policies
//!
//! A policy is asked, per destination key, whether the batch accumulated so far
//! must be submitted now. Policies may keep per-key state; `reset` is called on
//! every policy after each flush of that key.

use std::collections::HashMap;
use std::time::Duration;

use contracts::{BulkMessage, WriterConfiguration};
use parking_lot::Mutex;
use tokio::time::Instant;

use crate::component::FlushTrigger;

/// Decides when the batch of a destination key must flush.
pub trait FlushPolicy<M>: Send + Sync {
    /// Evaluated after every append and on every tick (timeout-driven policies only).
    fn should_flush(
        &self,
        key: &str,
        config: &dyn WriterConfiguration,
        batch: &[BulkMessage<M>],
    ) -> bool;

    /// Forget any state held for `key`.
    fn reset(&self, key: &str);

    /// Whether the periodic tick should evaluate this policy.
    fn is_timeout_driven(&self) -> bool {
        false
    }

    /// Label recorded when this policy triggers a flush.
    fn trigger(&self) -> FlushTrigger;
}

/// Flushes once the batch holds the configured batch size.
#[derive(Debug, Default, Clone, Copy)]
pub struct CountFlushPolicy;

impl CountFlushPolicy {
    pub fn new() -> Self {
        Self
    }
}

impl<M> FlushPolicy<M> for CountFlushPolicy {
    fn should_flush(
        &self,
        key: &str,
        config: &dyn WriterConfiguration,
        batch: &[BulkMessage<M>],
    ) -> bool {
        !batch.is_empty() && batch.len() >= config.batch_size(key)
    }

    fn reset(&self, _key: &str) {}

    fn trigger(&self) -> FlushTrigger {
        FlushTrigger::Count
    }
}

/// Flushes once the batch has been open longer than the configured timeout.
///
/// The deadline of a key is fixed the first time the policy sees its batch
/// non-empty, using the timeout configured at that moment. A configured
/// timeout of zero, or one above `max_batch_timeout`, is replaced by
/// `max_batch_timeout`. A deadline beyond the range of `Instant` is never
/// armed, leaving the batch to the other policies.
#[derive(Debug)]
pub struct TimeFlushPolicy {
    max_batch_timeout: Duration,
    deadlines: Mutex<HashMap<String, Instant>>,
}

impl TimeFlushPolicy {
    pub fn new(max_batch_timeout: Duration) -> Self {
        Self {
            max_batch_timeout,
            deadlines: Mutex::new(HashMap::new()),
        }
    }

    pub fn max_batch_timeout(&self) -> Duration {
        self.max_batch_timeout
    }

    /// Timeout applied to `key` for its next batch.
    pub fn effective_timeout(&self, key: &str, config: &dyn WriterConfiguration) -> Duration {
        let configured = Duration::from_secs(config.batch_timeout(key));
        if configured.is_zero() || configured > self.max_batch_timeout {
            self.max_batch_timeout
        } else {
            configured
        }
    }

    /// Deadline currently armed for `key`, if any.
    pub fn deadline(&self, key: &str) -> Option<Instant> {
        self.deadlines.lock().get(key).copied()
    }
}

impl<M> FlushPolicy<M> for TimeFlushPolicy {
    fn should_flush(
        &self,
        key: &str,
        config: &dyn WriterConfiguration,
        batch: &[BulkMessage<M>],
    ) -> bool {
        if batch.is_empty() {
            return false;
        }

        let now = Instant::now();
        let mut deadlines = self.deadlines.lock();
        let deadline = match deadlines.get(key) {
            Some(deadline) => *deadline,
            None => {
                // a timeout past the clock's range never elapses
                let Some(deadline) = now.checked_add(self.effective_timeout(key, config)) else {
                    return false;
                };
                deadlines.insert(key.to_string(), deadline);
                deadline
            }
        };
        now >= deadline
    }

    fn reset(&self, key: &str) {
        self.deadlines.lock().remove(key);
    }

    fn is_timeout_driven(&self) -> bool {
        true
    }

    fn trigger(&self) -> FlushTrigger {
        FlushTrigger::Timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::writer_config;

    fn batch(n: usize) -> Vec<BulkMessage<u32>> {
        (0..n)
            .map(|i| BulkMessage::new(i as u64, i as u32, "bro"))
            .collect()
    }

    #[test]
    fn test_count_policy_threshold() {
        let config = writer_config("elasticsearch", &[("bro", 3, 0)]);
        let policy = CountFlushPolicy::new();

        assert!(!FlushPolicy::<u32>::should_flush(
            &policy,
            "bro",
            &config,
            batch(0).as_slice()
        ));
        assert!(!policy.should_flush("bro", &config, batch(2).as_slice()));
        assert!(policy.should_flush("bro", &config, batch(3).as_slice()));
        assert!(policy.should_flush("bro", &config, batch(4).as_slice()));
    }

    #[test]
    fn test_count_policy_unconfigured_key_uses_default() {
        let config = writer_config("elasticsearch", &[]);
        let policy = CountFlushPolicy::new();
        assert!(policy.should_flush("yaf", &config, batch(1).as_slice()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_time_policy_deadline_anchored_at_first_evaluation() {
        let config = writer_config("elasticsearch", &[("bro", 100, 5)]);
        let policy = TimeFlushPolicy::new(Duration::from_secs(15));

        assert!(!policy.should_flush("bro", &config, batch(1).as_slice()));
        tokio::time::advance(Duration::from_secs(4)).await;
        assert!(!policy.should_flush("bro", &config, batch(2).as_slice()));
        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(policy.should_flush("bro", &config, batch(2).as_slice()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_time_policy_reset_rearms() {
        let config = writer_config("elasticsearch", &[("bro", 100, 2)]);
        let policy = TimeFlushPolicy::new(Duration::from_secs(15));

        assert!(!policy.should_flush("bro", &config, batch(1).as_slice()));
        tokio::time::advance(Duration::from_secs(3)).await;
        assert!(policy.should_flush("bro", &config, batch(1).as_slice()));

        FlushPolicy::<u32>::reset(&policy, "bro");
        assert!(policy.deadline("bro").is_none());
        // a fresh batch gets a fresh deadline
        assert!(!policy.should_flush("bro", &config, batch(1).as_slice()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_time_policy_empty_batch_never_flushes() {
        let config = writer_config("elasticsearch", &[("bro", 100, 1)]);
        let policy = TimeFlushPolicy::new(Duration::from_secs(15));

        FlushPolicy::<u32>::reset(&policy, "bro");
        tokio::time::advance(Duration::from_secs(60)).await;
        assert!(!policy.should_flush("bro", &config, batch(0).as_slice()));
        assert!(policy.deadline("bro").is_none());
    }

    #[tokio::test]
    async fn test_time_policy_unrepresentable_deadline_never_fires() {
        let config = writer_config("elasticsearch", &[("bro", 100, 0)]);
        let policy = TimeFlushPolicy::new(Duration::MAX);

        assert!(!policy.should_flush("bro", &config, batch(1).as_slice()));
        assert!(policy.deadline("bro").is_none());
    }

    #[test]
    fn test_time_policy_caps_timeout() {
        let config = writer_config("elasticsearch", &[("bro", 100, 0), ("snort", 100, 60)]);
        let policy = TimeFlushPolicy::new(Duration::from_secs(15));

        assert_eq!(
            policy.effective_timeout("bro", &config),
            Duration::from_secs(15)
        );
        assert_eq!(
            policy.effective_timeout("snort", &config),
            Duration::from_secs(15)
        );
        assert_eq!(
            policy.effective_timeout("yaf", &config),
            Duration::from_secs(15)
        );
    }
}
