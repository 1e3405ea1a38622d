use std::time::Duration;

/// Exponential backoff policy for retrying `Network`/`RateLimited` remote failures.
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    base: Duration,
    factor: u32,
    max: Duration,
    max_retries: u32,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(1),
            factor: 2,
            max: Duration::from_secs(60),
            max_retries: 5,
        }
    }
}

impl Backoff {
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Delay to sleep before the `attempt`-th retry (0-indexed: `attempt == 0` is the delay
    /// before the first retry, after the initial failed call).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let multiplier = self.factor.saturating_pow(attempt);
        self.base.saturating_mul(multiplier).min(self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubles_each_attempt_up_to_cap() {
        let backoff = Backoff::default();
        assert_eq!(backoff.delay_for(0), Duration::from_secs(1));
        assert_eq!(backoff.delay_for(1), Duration::from_secs(2));
        assert_eq!(backoff.delay_for(2), Duration::from_secs(4));
        assert_eq!(backoff.delay_for(6), Duration::from_secs(60));
        assert_eq!(backoff.delay_for(20), Duration::from_secs(60));
    }

    #[test]
    fn default_retry_budget_is_at_least_five() {
        assert!(Backoff::default().max_retries() >= 5);
    }
}
