//! Reconnect backoff policy.

use rand::Rng;
use std::time::Duration;

/// Exponential backoff with jitter for feed reconnection.
///
/// The base delay doubles per attempt from the floor up to the cap. Jitter
/// subtracts up to a quarter of the base, so consecutive attempts below the
/// cap still produce strictly increasing delays (1.5x the previous base at
/// worst).
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    /// Minimum delay in milliseconds.
    pub floor_ms: u64,
    /// Maximum delay in milliseconds.
    pub cap_ms: u64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            floor_ms: 1_000,
            cap_ms: 30_000,
        }
    }
}

impl BackoffPolicy {
    /// The deterministic base delay for a given attempt number (0-indexed).
    pub fn base_delay_for_attempt(&self, attempt: u32) -> Duration {
        let exp = attempt.min(32);
        let delay_ms = self
            .floor_ms
            .saturating_mul(2u64.saturating_pow(exp))
            .min(self.cap_ms);
        Duration::from_millis(delay_ms)
    }

    /// The jittered delay actually slept for a given attempt number.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base = self.base_delay_for_attempt(attempt).as_millis() as u64;
        let jitter = rand::thread_rng().gen_range(0..=base / 4);
        Duration::from_millis(base - jitter)
    }
}
