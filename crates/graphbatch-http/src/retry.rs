//! Exponential backoff for requests that never reached the API.

use std::time::Duration;

use serde::Deserialize;

/// Backoff settings for transient transport failures.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Resends after the first try; 0 disables retrying.
    pub max_retries: u32,
    pub initial_backoff: Duration,
    /// Cap on any single delay.
    pub max_backoff: Duration,
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(5),
            multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Delay before resend number `retry` (1-based), `None` once the budget is spent.
    pub fn delay_for(&self, retry: u32) -> Option<Duration> {
        if retry == 0 || retry > self.max_retries {
            return None;
        }
        let exponent = i32::try_from(retry - 1).unwrap_or(i32::MAX);
        let millis = self.initial_backoff.as_millis() as f64 * self.multiplier.powi(exponent);
        let capped = millis.min(self.max_backoff.as_millis() as f64);
        Some(Duration::from_millis(capped as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_grow_then_stop() {
        let retry = RetryConfig {
            max_retries: 3,
            initial_backoff: Duration::from_millis(50),
            max_backoff: Duration::from_secs(10),
            multiplier: 3.0,
        };
        assert_eq!(retry.delay_for(1), Some(Duration::from_millis(50)));
        assert_eq!(retry.delay_for(2), Some(Duration::from_millis(150)));
        assert_eq!(retry.delay_for(3), Some(Duration::from_millis(450)));
        assert_eq!(retry.delay_for(4), None);
    }

    #[test]
    fn delay_is_capped() {
        let retry = RetryConfig {
            max_retries: 20,
            max_backoff: Duration::from_millis(700),
            ..RetryConfig::default()
        };
        assert_eq!(retry.delay_for(15), Some(Duration::from_millis(700)));
    }

    #[test]
    fn disabled_never_retries() {
        assert_eq!(RetryConfig::disabled().delay_for(1), None);
    }
}
