// SPDX-FileCopyrightText: 2026 AutoSpares Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Capped exponential backoff shared by cart sync and socket reconnects.

use std::time::Duration;

/// Retry schedule: `base * factor^attempt`, capped, for a fixed number of attempts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backoff {
    pub base: Duration,
    pub factor: u32,
    pub cap: Duration,
    /// Total attempts, including the first.
    pub max_attempts: u32,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(500),
            factor: 2,
            cap: Duration::from_secs(8),
            max_attempts: 5,
        }
    }
}

impl Backoff {
    /// Delay to wait after failed attempt number `attempt` (zero-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        let multiplier = self.factor.max(1).saturating_pow(attempt);
        self.base.saturating_mul(multiplier).min(self.cap)
    }

    /// Whether another attempt is allowed after `attempts` have been made.
    pub fn allows(&self, attempts: u32) -> bool {
        attempts < self.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_schedule_doubles_then_caps() {
        let backoff = Backoff::default();
        let delays: Vec<u64> = (0..6).map(|a| backoff.delay(a).as_millis() as u64).collect();
        assert_eq!(delays, vec![500, 1000, 2000, 4000, 8000, 8000]);
    }

    #[test]
    fn huge_attempt_numbers_do_not_overflow() {
        assert_eq!(Backoff::default().delay(200), Duration::from_secs(8));
    }

    #[test]
    fn attempt_budget() {
        let backoff = Backoff::default();
        assert!(backoff.allows(4));
        assert!(!backoff.allows(5));
    }
}
