//! Retry policy for transient transport failures

use std::time::Duration;

/// Delay schedule between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Retry immediately
    None,
    /// Same delay before every retry
    Fixed(Duration),
    /// `step * attempt` before the retry following `attempt`
    Linear(Duration),
}

/// Bounded retry policy
///
/// Only [`crate::TransportError::Transient`] failures are retried.
/// Application-level errors are never retried regardless of the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Backoff,
}

impl RetryPolicy {
    /// Policy with explicit attempt budget and backoff
    ///
    /// A budget of zero is treated as one attempt.
    #[inline]
    #[must_use]
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// Zero-delay policy, for tests
    #[inline]
    #[must_use]
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Backoff::None)
    }

    /// With attempt budget
    #[inline]
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// With backoff
    #[inline]
    #[must_use]
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Total attempts allowed, including the first
    #[inline]
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay to wait after failed attempt number `attempt` (1-based)
    #[must_use]
    pub fn delay_after(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::None => Duration::ZERO,
            Backoff::Fixed(delay) => delay,
            Backoff::Linear(step) => step.saturating_mul(attempt),
        }
    }

    /// [`RetryPolicy::delay_after`] in whole milliseconds, saturating
    #[must_use]
    pub fn delay_ms_after(&self, attempt: u32) -> u64 {
        u64::try_from(self.delay_after(attempt).as_millis()).unwrap_or(u64::MAX)
    }
}

impl Default for RetryPolicy {
    /// 5 attempts, 2 seconds apart
    fn default() -> Self {
        Self::new(5, Backoff::Fixed(Duration::from_secs(2)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts(), 5);
        assert_eq!(policy.delay_after(1), Duration::from_secs(2));
        assert_eq!(policy.delay_after(4), Duration::from_secs(2));
    }

    #[test]
    fn linear_backoff_grows() {
        let policy = RetryPolicy::new(3, Backoff::Linear(Duration::from_millis(100)));
        assert_eq!(policy.delay_after(1), Duration::from_millis(100));
        assert_eq!(policy.delay_after(3), Duration::from_millis(300));
    }

    #[test]
    fn zero_attempts_clamped() {
        assert_eq!(RetryPolicy::immediate(0).max_attempts(), 1);
        assert_eq!(RetryPolicy::default().with_max_attempts(0).max_attempts(), 1);
    }

    #[test]
    fn delay_in_millis_saturates() {
        assert_eq!(RetryPolicy::default().delay_ms_after(1), 2000);
        let huge = RetryPolicy::new(3, Backoff::Linear(Duration::MAX));
        assert_eq!(huge.delay_ms_after(3), u64::MAX);
    }

    #[test]
    fn immediate_has_no_delay() {
        assert_eq!(RetryPolicy::immediate(5).delay_after(2), Duration::ZERO);
    }
}
