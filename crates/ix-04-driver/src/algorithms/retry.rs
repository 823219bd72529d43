//! Exponential backoff for client retries and notification delivery.

use crate::domain::RetryPolicy;
use rand::Rng;
use std::time::Duration;

/// Backoff before retry number `attempt` (0-indexed), capped at
/// `max_backoff_ms`, plus up to `jitter_ms` of random delay.
pub fn backoff_for_attempt(policy: &RetryPolicy, attempt: u32) -> Duration {
    let base = base_backoff(policy, attempt);
    if policy.jitter_ms == 0 {
        return base;
    }
    let jitter = rand::thread_rng().gen_range(0..=policy.jitter_ms);
    base + Duration::from_millis(jitter)
}

fn base_backoff(policy: &RetryPolicy, attempt: u32) -> Duration {
    let exponent = attempt.min(i32::MAX as u32) as i32;
    let backoff_ms = policy.initial_backoff_ms as f64 * policy.multiplier.powi(exponent);
    let capped = backoff_ms.min(policy.max_backoff_ms as f64);
    Duration::from_millis(capped.max(0.0) as u64)
}

/// Whether another attempt is allowed after `attempts_made`.
pub fn should_retry(policy: &RetryPolicy, attempts_made: u32) -> bool {
    attempts_made < policy.max_attempts.max(1)
}
