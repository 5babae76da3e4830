//! Tick interval derivation
//!
//! Every batch must reach the backend well before the upstream gives up on its
//! records, so the largest usable batch timeout is half the upstream message
//! timeout, split again across daisy-chained writers. The tick driving
//! `flush_timeouts` runs at half the smallest effective timeout.

use std::time::Duration;

use contracts::WriterConfiguration;

type TimeoutSupplier = Box<dyn Fn() -> Vec<u64> + Send + Sync>;

/// Derives the maximum batch timeout and the recommended tick interval.
pub struct BatchTimeoutHelper {
    timeouts: TimeoutSupplier,
    message_timeout_secs: u64,
    divisor: u32,
    tick_override_secs: Option<u64>,
}

impl BatchTimeoutHelper {
    /// `timeouts` supplies every configured per-destination timeout, in seconds.
    pub fn new(
        timeouts: impl Fn() -> Vec<u64> + Send + Sync + 'static,
        message_timeout_secs: u64,
        divisor: u32,
    ) -> Self {
        Self {
            timeouts: Box::new(timeouts),
            message_timeout_secs,
            divisor: divisor.max(1),
            tick_override_secs: None,
        }
    }

    /// Helper reading everything from a configuration snapshot.
    pub fn from_configuration<C>(config: std::sync::Arc<C>) -> Self
    where
        C: WriterConfiguration + ?Sized + 'static,
    {
        let global = config.global();
        let message_timeout = global.message_timeout_secs;
        let divisor = global.batch_timeout_divisor;
        let tick = global.tick_interval_secs;

        let helper = Self::new(
            move || config.all_configured_timeouts(),
            message_timeout,
            divisor,
        );
        if tick > 0 {
            helper.with_tick_override(tick)
        } else {
            helper
        }
    }

    /// Explicit tick interval; honoured only when smaller than the derived one.
    pub fn with_tick_override(mut self, secs: u64) -> Self {
        self.tick_override_secs = Some(secs);
        self
    }

    /// Largest batch timeout allowed, in whole seconds, never below 1.
    pub fn max_batch_timeout_secs(&self) -> u64 {
        (self.message_timeout_secs / 2 / u64::from(self.divisor)).max(1)
    }

    pub fn max_batch_timeout(&self) -> Duration {
        Duration::from_secs(self.max_batch_timeout_secs())
    }

    /// Recommended tick interval in whole seconds, never below 1.
    pub fn recommended_tick_interval_secs(&self) -> u64 {
        let max = self.max_batch_timeout_secs();
        let divisor = u64::from(self.divisor);

        let smallest = (self.timeouts)()
            .into_iter()
            .filter(|t| *t > 0)
            .min()
            .map(|t| (t / divisor).clamp(1, max))
            .unwrap_or(max);

        let mut tick = smallest / 2;
        if let Some(requested) = self.tick_override_secs {
            if requested > 0 && requested < tick {
                tick = requested;
            }
        }
        tick.max(1)
    }

    pub fn recommended_tick_interval(&self) -> Duration {
        Duration::from_secs(self.recommended_tick_interval_secs())
    }
}

impl std::fmt::Debug for BatchTimeoutHelper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchTimeoutHelper")
            .field("message_timeout_secs", &self.message_timeout_secs)
            .field("divisor", &self.divisor)
            .field("tick_override_secs", &self.tick_override_secs)
            .finish_non_exhaustive()
    }
}
