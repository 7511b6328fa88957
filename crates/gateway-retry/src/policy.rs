//! Retry policy: the tunable knobs recognized by the retry algorithm, with
//! their defaults.

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total tries against this adapter. Default 3 (= 1 + 2 retries).
    pub max_attempts: usize,
    /// Hard upper bound on a single call.
    pub per_attempt_timeout: Duration,
    /// Starting wait between attempts.
    pub base_backoff: Duration,
    /// Cap on the backoff wait.
    pub max_backoff: Duration,
    /// Multiplicative jitter window, e.g. `0.1` for ±10%.
    pub jitter_fraction: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            per_attempt_timeout: Duration::from_secs(2),
            base_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(10),
            jitter_fraction: 0.1,
        }
    }
}

impl RetryPolicy {
    /// A policy with `max_attempts: 1`: disables retry but not fallback,
    /// since fallback is a separate layer above the engine — no
    /// special-casing needed here.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }
}
