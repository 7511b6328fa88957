//! Retry engine: runs one adapter under a timeout, retrying on retryable
//! failures per the configured backoff policy.

use crate::attempt::{AttemptObserver, RetryAttempt};
use crate::backoff::compute_backoff;
use crate::policy::RetryPolicy;
use gateway_core::entities::{AttemptOutcome, Vendor};
use gateway_timelimiter::{with_timeout, TimeLimiterConfig};
use gateway_vendor::{NormalizedRequest, NormalizedResponse, VendorAdapter, VendorFailure};
use tokio_util::sync::CancellationToken;

/// Outcome of running the engine to completion: either the first successful
/// response, or the last failure once attempts are exhausted or a
/// non-retryable failure is hit.
pub enum RetryOutcome {
    Success(NormalizedResponse),
    Failure(VendorFailure),
    /// Upstream cancellation aborted the run mid-attempt or mid-sleep.
    Cancelled,
}

/// Runs `adapter` against `request` per `policy`, reporting each attempt to
/// `observer` as it happens.
///
/// Returns the outcome plus the ordered attempts collected, so the caller
/// (the fallback orchestrator) can concatenate primary/fallback attempt
/// lists without re-deriving them from the observer.
pub async fn run(
    vendor: Vendor,
    adapter: &dyn VendorAdapter,
    request: &NormalizedRequest,
    policy: &RetryPolicy,
    observer: &dyn AttemptObserver,
    cancellation: &CancellationToken,
) -> (RetryOutcome, Vec<RetryAttempt>) {
    let mut attempts = Vec::new();
    let mut rng = rand::thread_rng();

    for attempt_index in 0..policy.max_attempts {
        if cancellation.is_cancelled() {
            return (RetryOutcome::Cancelled, attempts);
        }

        let timeout_config = TimeLimiterConfig::new(policy.per_attempt_timeout);
        let call = with_timeout(timeout_config, adapter.call(request));

        let outcome = tokio::select! {
            biased;
            _ = cancellation.cancelled() => {
                return (RetryOutcome::Cancelled, attempts);
            }
            result = call => result,
        };

        match outcome {
            Ok((Ok(response), latency)) => {
                let attempt = RetryAttempt {
                    vendor,
                    outcome: AttemptOutcome::Success,
                    http_status: Some(200),
                    latency_ms: latency.as_millis() as u64,
                    retry_index: attempt_index,
                    error_code: None,
                    error_message: None,
                };
                observer.on_attempt(&attempt).await;
                attempts.push(attempt);

                #[cfg(feature = "metrics")]
                metrics::counter!("gateway_retry_calls_total", "vendor" => vendor.as_str(), "result" => "success")
                    .increment(1);
                #[cfg(feature = "tracing")]
                {
                    if attempt_index > 0 {
                        tracing::info!(vendor = vendor.as_str(), attempts = attempt_index + 1, "vendor call succeeded after retries");
                    } else {
                        tracing::debug!(vendor = vendor.as_str(), "vendor call succeeded on first attempt");
                    }
                }

                return (RetryOutcome::Success(response), attempts);
            }
            Ok((Err(failure), latency)) => {
                let attempt = RetryAttempt {
                    vendor,
                    outcome: AttemptOutcome::Failed,
                    http_status: Some(failure.status_code),
                    latency_ms: latency.as_millis() as u64,
                    retry_index: attempt_index,
                    error_code: Some(failure.error_code.clone()),
                    error_message: Some(failure.message.clone()),
                };
                observer.on_attempt(&attempt).await;
                attempts.push(attempt);

                let is_last = attempt_index == policy.max_attempts - 1;
                if is_last || !failure.is_retryable() {
                    #[cfg(feature = "metrics")]
                    metrics::counter!("gateway_retry_calls_total", "vendor" => vendor.as_str(), "result" => "exhausted")
                        .increment(1);
                    #[cfg(feature = "tracing")]
                    tracing::warn!(vendor = vendor.as_str(), attempts = attempt_index + 1, "retry exhausted against vendor");

                    return (RetryOutcome::Failure(failure), attempts);
                }

                #[cfg(feature = "metrics")]
                metrics::counter!("gateway_retry_attempts_total", "vendor" => vendor.as_str()).increment(1);
                #[cfg(feature = "tracing")]
                tracing::debug!(vendor = vendor.as_str(), attempt = attempt_index + 1, "retrying vendor call after backoff");

                let wait = compute_backoff(policy, attempt_index, failure.retry_after, &mut rng);
                tokio::select! {
                    biased;
                    _ = cancellation.cancelled() => {
                        return (RetryOutcome::Cancelled, attempts);
                    }
                    _ = tokio::time::sleep(wait) => {}
                }
            }
            Err(elapsed) => {
                let failure = VendorFailure::timeout();
                let attempt = RetryAttempt {
                    vendor,
                    outcome: AttemptOutcome::Failed,
                    http_status: Some(failure.status_code),
                    latency_ms: elapsed.elapsed.as_millis() as u64,
                    retry_index: attempt_index,
                    error_code: Some(failure.error_code.clone()),
                    error_message: Some(failure.message.clone()),
                };
                observer.on_attempt(&attempt).await;
                attempts.push(attempt);

                let is_last = attempt_index == policy.max_attempts - 1;
                if is_last {
                    #[cfg(feature = "metrics")]
                    metrics::counter!("gateway_retry_calls_total", "vendor" => vendor.as_str(), "result" => "exhausted")
                        .increment(1);
                    #[cfg(feature = "tracing")]
                    tracing::warn!(vendor = vendor.as_str(), attempts = attempt_index + 1, "retry exhausted against vendor (timeout)");

                    return (RetryOutcome::Failure(failure), attempts);
                }

                #[cfg(feature = "metrics")]
                metrics::counter!("gateway_retry_attempts_total", "vendor" => vendor.as_str()).increment(1);
                #[cfg(feature = "tracing")]
                tracing::debug!(vendor = vendor.as_str(), attempt = attempt_index + 1, "retrying vendor call after timeout");

                let wait = compute_backoff(policy, attempt_index, None, &mut rng);
                tokio::select! {
                    biased;
                    _ = cancellation.cancelled() => {
                        return (RetryOutcome::Cancelled, attempts);
                    }
                    _ = tokio::time::sleep(wait) => {}
                }
            }
        }
    }

    unreachable!("max_attempts >= 1 guarantees the loop above always returns")
}
