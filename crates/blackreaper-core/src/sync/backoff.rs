//! Retry pacing for failed replay attempts.

use chrono::Duration;

/// Exponential backoff with a ceiling.
///
/// Delay after the n-th failure is `base * 2^(n-1)`, capped at `max`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    base: Duration,
    max: Duration,
}

impl RetryPolicy {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self { base, max }
    }

    /// Delay to wait after `attempts` consecutive failures (attempts >= 1).
    pub fn delay_after(&self, attempts: u32) -> Duration {
        let exponent = attempts.saturating_sub(1).min(16);
        let factor = 1i64 << exponent;
        let delay = self
            .base
            .checked_mul(factor as i32)
            .unwrap_or(self.max);
        delay.min(self.max)
    }
}

impl Default for RetryPolicy {
    /// 30 s doubling up to a 15-minute ceiling.
    fn default() -> Self {
        Self::new(Duration::seconds(30), Duration::minutes(15))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubles_until_ceiling() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after(1), Duration::seconds(30));
        assert_eq!(policy.delay_after(2), Duration::seconds(60));
        assert_eq!(policy.delay_after(3), Duration::seconds(120));
        assert_eq!(policy.delay_after(6), Duration::minutes(15));
        assert_eq!(policy.delay_after(60), Duration::minutes(15));
    }
}
