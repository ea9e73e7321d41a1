use std::time::Duration;

use rand::RngExt;

use crate::config::ReconnectPolicy;

/// Delay schedule for one run of reconnect or retry attempts.
#[derive(Debug, Clone)]
pub struct Backoff {
    policy: ReconnectPolicy,
    attempt: u32,
}

impl Backoff {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self { policy, attempt: 0 }
    }

    /// Attempts handed out since the last reset.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    /// Delay before the next attempt, or `None` once the policy is exhausted.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if let Some(max) = self.policy.max_attempts {
            if self.attempt >= max {
                return None;
            }
        }
        let base = self.base_delay(self.attempt);
        self.attempt += 1;

        let jitter = self.policy.jitter.clamp(0.0, 1.0);
        if jitter == 0.0 {
            return Some(base);
        }
        let spread = base.mul_f64(jitter);
        let extra = rand::rng().random_range(0.0..=1.0);
        Some(base + spread.mul_f64(extra))
    }

    fn base_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.min(16));
        self.policy
            .initial
            .saturating_mul(factor)
            .min(self.policy.max)
    }
}
