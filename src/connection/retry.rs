//! Retry policies for the establishment loops
//!
//! A policy only decides how long to pause after a failed attempt. The
//! loops themselves never give up.

use std::time::Duration;

use crate::config::BackoffConfig;

/// Decides the pause between failed establishment attempts
pub trait RetryPolicy: Send {
    /// Delay before the next attempt; called once per failure
    fn next_delay(&mut self) -> Duration;

    /// Forget previous failures; called after a pair is established
    fn reset(&mut self);
}

/// Doubles (or multiplies) the delay after each failure up to a ceiling
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    initial: Duration,
    max: Duration,
    multiplier: u32,
    current: Option<Duration>,
    failures: u32,
}

impl ExponentialBackoff {
    pub fn new(initial: Duration, max: Duration, multiplier: u32) -> Self {
        Self {
            initial,
            max: max.max(initial),
            multiplier: multiplier.max(1),
            current: None,
            failures: 0,
        }
    }

    pub fn from_config(config: &BackoffConfig) -> Self {
        Self::new(config.initial, config.max, config.multiplier)
    }

    /// Consecutive failures since the last reset
    pub fn failures(&self) -> u32 {
        self.failures
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::from_config(&BackoffConfig::default())
    }
}

impl RetryPolicy for ExponentialBackoff {
    fn next_delay(&mut self) -> Duration {
        let delay = match self.current {
            None => self.initial,
            Some(previous) => previous.saturating_mul(self.multiplier).min(self.max),
        };
        self.current = Some(delay);
        self.failures = self.failures.saturating_add(1);
        delay
    }

    fn reset(&mut self) {
        self.current = None;
        self.failures = 0;
    }
}

/// Same pause after every failure
#[derive(Debug, Clone, Copy)]
pub struct FixedDelay(pub Duration);

impl RetryPolicy for FixedDelay {
    fn next_delay(&mut self) -> Duration {
        self.0
    }

    fn reset(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponential_growth_is_capped() {
        let mut backoff =
            ExponentialBackoff::new(Duration::from_millis(100), Duration::from_millis(500), 2);

        let delays: Vec<_> = (0..6).map(|_| backoff.next_delay()).collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_millis(100),
                Duration::from_millis(200),
                Duration::from_millis(400),
                Duration::from_millis(500),
                Duration::from_millis(500),
                Duration::from_millis(500),
            ]
        );
        assert_eq!(backoff.failures(), 6);
    }

    #[test]
    fn test_reset_starts_over() {
        let mut backoff =
            ExponentialBackoff::new(Duration::from_millis(10), Duration::from_secs(1), 3);
        backoff.next_delay();
        backoff.next_delay();
        backoff.reset();

        assert_eq!(backoff.failures(), 0);
        assert_eq!(backoff.next_delay(), Duration::from_millis(10));
    }

    #[test]
    fn test_degenerate_settings_are_clamped() {
        let mut backoff =
            ExponentialBackoff::new(Duration::from_secs(2), Duration::from_secs(1), 0);
        assert_eq!(backoff.next_delay(), Duration::from_secs(2));
        assert_eq!(backoff.next_delay(), Duration::from_secs(2));
    }

    #[test]
    fn test_fixed_delay() {
        let mut fixed = FixedDelay(Duration::from_millis(25));
        assert_eq!(fixed.next_delay(), Duration::from_millis(25));
        fixed.reset();
        assert_eq!(fixed.next_delay(), Duration::from_millis(25));
    }
}
