//! Cancel-aware per-call timeout: rather than wrapping an arbitrary
//! `tower::Service`, this crate wraps a single future with a hard deadline,
//! which is all the retry engine needs to bound a single vendor attempt.
//!
//! `tokio::time::timeout` already aborts the wrapped future on elapse and is
//! itself cancel-safe when awaited inside a `select!`/task that is dropped,
//! so cancellation propagation falls out of using it directly rather than
//! reimplementing it.

use std::time::Duration;
use std::time::Instant;

/// A single call's timeout budget. Thin today, but kept as its own type
/// (rather than a bare `Duration`) so a future per-vendor override doesn't
/// require threading a new parameter through every call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeLimiterConfig {
    pub timeout: Duration,
}

impl TimeLimiterConfig {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for TimeLimiterConfig {
    /// The default per-attempt timeout budget.
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(2),
        }
    }
}

/// The call exceeded its deadline. Carries the elapsed wall-clock time for
/// the caller's latency accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("call exceeded its {budget:?} timeout after {elapsed:?}")]
pub struct Elapsed {
    pub budget: Duration,
    pub elapsed: Duration,
}

/// Runs `fut` under `config.timeout`. On success returns the future's
/// output and the measured latency; on timeout returns [`Elapsed`].
///
/// Dropping the returned future (e.g. because the caller itself was
/// cancelled) aborts `fut` immediately — `tokio::time::timeout` polls the
/// inner future cooperatively and drops it on its own cancellation, so no
/// extra bookkeeping is needed here.
pub async fn with_timeout<F, T>(config: TimeLimiterConfig, fut: F) -> Result<(T, Duration), Elapsed>
where
    F: std::future::Future<Output = T>,
{
    let started = Instant::now();
    match tokio::time::timeout(config.timeout, fut).await {
        Ok(value) => Ok((value, started.elapsed())),
        Err(_) => {
            let elapsed = started.elapsed();
            #[cfg(feature = "tracing")]
            tracing::debug!(budget_ms = config.timeout.as_millis() as u64, elapsed_ms = elapsed.as_millis() as u64, "call exceeded its timeout budget");
            Err(Elapsed {
                budget: config.timeout,
                elapsed,
            })
        }
    }
}
