// SPDX-FileCopyrightText: 2026 Curbside Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Retry planning for collaborator dispatch.

use std::time::Duration;

/// Exponential backoff bounds for order dispatch.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub base_backoff_ms: u64,
    pub max_backoff_ms: u64,
    /// Total attempts, including the first.
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_backoff_ms: 2_000,
            max_backoff_ms: 300_000,
            max_attempts: 8,
        }
    }
}

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    RetryAfter(Duration),
    GiveUp,
}

impl RetryPolicy {
    /// Delay after the `attempt`-th failure (1-based): `base * 2^(attempt-1)`,
    /// capped at `max_backoff_ms`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(63);
        let ms = self
            .base_backoff_ms
            .saturating_mul(1_u64 << exponent)
            .min(self.max_backoff_ms);
        Duration::from_millis(ms)
    }

    pub fn decide(&self, attempt: u32, retryable: bool) -> RetryDecision {
        if !retryable || attempt >= self.max_attempts {
            RetryDecision::GiveUp
        } else {
            RetryDecision::RetryAfter(self.delay_for(attempt))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_doubles_then_caps() {
        let policy = RetryPolicy {
            base_backoff_ms: 1_000,
            max_backoff_ms: 5_000,
            max_attempts: 10,
        };
        let delays: Vec<u64> = (1..=5)
            .map(|n| policy.delay_for(n).as_millis() as u64)
            .collect();
        assert_eq!(delays, vec![1_000, 2_000, 4_000, 5_000, 5_000]);
        assert_eq!(policy.delay_for(200), Duration::from_millis(5_000));
    }

    #[test]
    fn gives_up_at_max_attempts_or_permanent_failure() {
        let policy = RetryPolicy::default();
        assert_eq!(
            policy.decide(1, true),
            RetryDecision::RetryAfter(Duration::from_secs(2))
        );
        assert_eq!(policy.decide(8, true), RetryDecision::GiveUp);
        assert_eq!(policy.decide(1, false), RetryDecision::GiveUp);
    }

    proptest::proptest! {
        #[test]
        fn delays_never_shrink_or_exceed_cap(
            base in 1_u64..10_000,
            cap in 1_u64..1_000_000,
            attempt in 1_u32..100,
        ) {
            let policy = RetryPolicy { base_backoff_ms: base, max_backoff_ms: cap, max_attempts: 100 };
            let here = policy.delay_for(attempt);
            let next = policy.delay_for(attempt + 1);
            proptest::prop_assert!(here <= next);
            proptest::prop_assert!(next <= Duration::from_millis(cap));
        }
    }
}
