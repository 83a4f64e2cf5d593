//! Retry policies with capped exponential backoff.
//!
//! Units of work pick one of three tiers instead of hand-rolling
//! coefficients: [`RetryPolicy::fast`] for quick calls, [`RetryPolicy::slow`]
//! for generation jobs and [`RetryPolicy::long`] for multi-minute renders.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Jitter applied on top of the computed backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JitterStrategy {
    /// Random from 0 to delay
    Full,
    /// Half fixed, half random
    Equal,
}

/// Retry policy for a unit of work.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Wait before the second attempt.
    pub initial_interval: Duration,
    /// Multiplier applied to the wait after each failed attempt.
    pub backoff_coefficient: f64,
    /// Upper bound for any single wait.
    pub max_interval: Duration,
    /// Maximum attempts, including the first.
    pub max_attempts: u32,
    /// Optional jitter; `None` keeps waits deterministic.
    pub jitter: Option<JitterStrategy>,
}

impl RetryPolicy {
    /// 1s initial, x2, capped at 100s, 3 attempts.
    #[must_use]
    pub const fn fast() -> Self {
        Self {
            initial_interval: Duration::from_secs(1),
            backoff_coefficient: 2.0,
            max_interval: Duration::from_secs(100),
            max_attempts: 3,
            jitter: None,
        }
    }

    /// 5s initial, x2, capped at 10min, 3 attempts.
    #[must_use]
    pub const fn slow() -> Self {
        Self {
            initial_interval: Duration::from_secs(5),
            backoff_coefficient: 2.0,
            max_interval: Duration::from_secs(10 * 60),
            max_attempts: 3,
            jitter: None,
        }
    }

    /// 10s initial, x2, capped at 30min, 3 attempts.
    #[must_use]
    pub const fn long() -> Self {
        Self {
            initial_interval: Duration::from_secs(10),
            backoff_coefficient: 2.0,
            max_interval: Duration::from_secs(30 * 60),
            max_attempts: 3,
            jitter: None,
        }
    }

    /// A single attempt with no retries.
    #[must_use]
    pub const fn no_retry() -> Self {
        Self {
            initial_interval: Duration::ZERO,
            backoff_coefficient: 1.0,
            max_interval: Duration::ZERO,
            max_attempts: 1,
            jitter: None,
        }
    }

    /// Sets the maximum attempts.
    #[must_use]
    pub const fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Sets the jitter strategy.
    #[must_use]
    pub const fn with_jitter(mut self, jitter: JitterStrategy) -> Self {
        self.jitter = Some(jitter);
        self
    }

    /// Returns true if another attempt may follow attempt `attempt` (1-based).
    #[must_use]
    pub fn allows_retry_after(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// Backoff before the attempt following `attempt` (1-based), without jitter.
    ///
    /// `min(initial * coefficient^(attempt - 1), max_interval)`.
    #[must_use]
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let secs = self.initial_interval.as_secs_f64() * self.backoff_coefficient.powi(exponent);
        let max_secs = self.max_interval.as_secs_f64();
        if !secs.is_finite() || secs >= max_secs {
            return self.max_interval;
        }
        Duration::from_secs_f64(secs.max(0.0))
    }

    /// Backoff before the attempt following `attempt`, with jitter applied.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = self.base_delay(attempt);
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        let jittered = match self.jitter {
            None => millis,
            Some(JitterStrategy::Full) => {
                if millis == 0 {
                    0
                } else {
                    rand::thread_rng().gen_range(0..=millis)
                }
            }
            Some(JitterStrategy::Equal) => {
                let half = millis / 2;
                if half == 0 {
                    millis
                } else {
                    half + rand::thread_rng().gen_range(0..=half)
                }
            }
        };
        Duration::from_millis(jittered)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fast()
    }
}
