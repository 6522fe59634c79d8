//! Retry policy: decides backoff delays.

use std::time::Duration;

/// Exponential backoff for failed reconciles.
///
/// delay = base_delay * multiplier^(failures - 1), capped at `max_delay`.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Delay after the first failure.
    pub base_delay: Duration,

    /// Backoff multiplier.
    pub multiplier: f64,

    /// Upper bound for any single delay.
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(base_delay: Duration, multiplier: f64, max_delay: Duration) -> Self {
        Self {
            base_delay,
            multiplier,
            max_delay,
        }
    }

    /// Delay before the next attempt.
    ///
    /// # Arguments
    /// * `failures` - Consecutive failures so far, including the one just seen.
    ///
    /// Example with base_delay=500ms, multiplier=2.0:
    /// - failure 1: 500ms
    /// - failure 2: 1s
    /// - failure 3: 2s
    pub fn next_delay(&self, failures: u32) -> Duration {
        let exponent = i32::try_from(failures.saturating_sub(1)).unwrap_or(i32::MAX);
        let delay_secs = self.base_delay.as_secs_f64() * self.multiplier.powi(exponent);
        // NaN / inf / overflow は上限に丸める
        Duration::try_from_secs_f64(delay_secs)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Duration::from_millis(500), 2.0, Duration::from_secs(300))
    }
}
