use crate::config::Settings;
use std::time::Duration;

/// Delay schedule for the attempts after the first one.
///
/// Attempt 1 goes through the primary strategy; every later attempt goes
/// through the fallback and is preceded by `delay_before(attempt)`.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub initial_delay: Duration,
    pub multiplier: f64,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            initial_delay: Duration::from_secs(20),
            multiplier: 1.0,
            max_delay: Duration::from_secs(300),
        }
    }
}

impl From<&Settings> for RetryPolicy {
    fn from(settings: &Settings) -> Self {
        Self {
            max_attempts: settings.max_attempts,
            initial_delay: Duration::from_secs(settings.fallback_delay),
            multiplier: settings.backoff_multiplier,
            max_delay: Duration::from_secs(settings.max_backoff),
        }
    }
}

impl RetryPolicy {
    /// Policy without waiting between attempts.
    pub fn immediate(max_attempts: usize) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::ZERO,
            multiplier: 1.0,
            max_delay: Duration::ZERO,
        }
    }

    /// `attempt` is 1-based. The first attempt never waits.
    pub fn delay_before(&self, attempt: usize) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }

        let exponent = (attempt - 2) as i32;
        let scaled = self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent);
        let capped = scaled.min(self.max_delay.as_secs_f64().max(self.initial_delay.as_secs_f64()));
        Duration::from_secs_f64(capped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_single_fixed_fallback() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 2);
        assert_eq!(policy.delay_before(1), Duration::ZERO);
        assert_eq!(policy.delay_before(2), Duration::from_secs(20));
    }

    #[test]
    fn test_exponential_growth_is_capped() {
        let policy = RetryPolicy {
            max_attempts: 5,
            initial_delay: Duration::from_secs(10),
            multiplier: 2.0,
            max_delay: Duration::from_secs(30),
        };

        assert_eq!(policy.delay_before(2), Duration::from_secs(10));
        assert_eq!(policy.delay_before(3), Duration::from_secs(20));
        assert_eq!(policy.delay_before(4), Duration::from_secs(30));
        assert_eq!(policy.delay_before(5), Duration::from_secs(30));
    }

    #[test]
    fn test_immediate_policy() {
        let policy = RetryPolicy::immediate(3);
        assert_eq!(policy.delay_before(3), Duration::ZERO);
    }
}
