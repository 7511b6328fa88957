//! Property-based coverage of backoff computation: for the default policy
//! and any sequence of retries, the i-th backoff before attempt i+1 lies in
//! `[0.9, 1.1] * min(max_backoff, base_backoff * 2^i)`, or equals the
//! vendor-supplied retry-after duration exactly (no jitter) when one was
//! given.

use gateway_retry::{compute_backoff, RetryPolicy};
use proptest::prelude::*;
use std::time::Duration;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Property: without a vendor-supplied `retryAfterMs`, every computed
    /// backoff falls within the documented ±10% jitter window around the
    /// capped exponential curve.
    #[test]
    fn exponential_backoff_stays_within_jitter_bounds(attempt_index in 0usize..20) {
        let policy = RetryPolicy::default();
        let mut rng = rand::thread_rng();

        let base_millis = policy.base_backoff.as_millis() as f64;
        let uncapped = base_millis * 2f64.powi(attempt_index.min(32) as i32);
        let expected_center = uncapped.min(policy.max_backoff.as_millis() as f64);
        let lower = Duration::from_secs_f64((expected_center * 0.9 / 1000.0).max(0.0));
        let upper = Duration::from_secs_f64(expected_center * 1.1 / 1000.0);

        for _ in 0..10 {
            let wait = compute_backoff(&policy, attempt_index, None, &mut rng);
            prop_assert!(
                wait >= lower && wait <= upper,
                "attempt {attempt_index}: {wait:?} not within [{lower:?}, {upper:?}]"
            );
        }
    }

    /// Property: a vendor-supplied `retryAfterMs` is honored exactly, with
    /// no jitter applied, regardless of the attempt index or policy jitter
    /// configuration.
    #[test]
    fn retry_after_is_honored_without_jitter(
        attempt_index in 0usize..20,
        retry_after_ms in 1u64..=120_000,
        jitter_fraction in 0.0f64..=0.5,
    ) {
        let policy = RetryPolicy {
            jitter_fraction,
            ..RetryPolicy::default()
        };
        let mut rng = rand::thread_rng();
        let retry_after = Duration::from_millis(retry_after_ms);

        let wait = compute_backoff(&policy, attempt_index, Some(retry_after), &mut rng);
        prop_assert_eq!(wait, retry_after);
    }

    /// Property: the computed backoff never exceeds `max_backoff`, no matter
    /// how large the attempt index grows (the exponential curve must be
    /// capped, not just "usually small").
    #[test]
    fn backoff_never_exceeds_the_configured_cap(attempt_index in 0usize..64) {
        let policy = RetryPolicy::default();
        let mut rng = rand::thread_rng();
        let cap_with_jitter = policy.max_backoff.mul_f64(1.0 + policy.jitter_fraction);

        let wait = compute_backoff(&policy, attempt_index, None, &mut rng);
        prop_assert!(wait <= cap_with_jitter);
    }
}
