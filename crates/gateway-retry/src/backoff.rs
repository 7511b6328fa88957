//! Backoff computation: if the failure carried a vendor-supplied retry-after
//! duration greater than zero, honor it exactly; otherwise wait
//! `min(max_backoff, base_backoff * 2^i)` with multiplicative jitter applied.

use crate::policy::RetryPolicy;
use rand::Rng;
use std::time::Duration;

/// Computes the wait before attempt `attempt_index + 1`, given the failure
/// that just occurred. `rng` is threaded in so tests can assert exact bounds
/// without fighting global randomness.
pub fn compute_backoff(
    policy: &RetryPolicy,
    attempt_index: usize,
    retry_after: Option<Duration>,
    rng: &mut impl Rng,
) -> Duration {
    if let Some(retry_after) = retry_after {
        if retry_after > Duration::ZERO {
            // A vendor-supplied retry-after is honored exactly, no jitter.
            return retry_after;
        }
    }

    let exponent = attempt_index.min(32) as u32;
    let doubled = double_n_times(policy.base_backoff, exponent);
    let capped = doubled.min(policy.max_backoff);

    apply_jitter(capped, policy.jitter_fraction, rng)
}

fn double_n_times(base: Duration, n: u32) -> Duration {
    let mut result = base;
    for _ in 0..n {
        result = match result.checked_mul(2) {
            Some(doubled) => doubled,
            None => return Duration::MAX,
        };
    }
    result
}

fn apply_jitter(duration: Duration, jitter_fraction: f64, rng: &mut impl Rng) -> Duration {
    if jitter_fraction <= 0.0 {
        return duration;
    }
    let factor = 1.0 + rng.gen_range(-jitter_fraction..=jitter_fraction);
    let millis = (duration.as_secs_f64() * factor).max(0.0);
    Duration::from_secs_f64(millis)
}
