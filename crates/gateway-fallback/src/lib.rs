//! Fallback orchestrator: runs the retry engine against the primary vendor;
//! on total primary failure, runs it against the fallback; merges attempt
//! logs.

use gateway_core::entities::Vendor;
use gateway_retry::{AttemptObserver, RetryAttempt, RetryOutcome, RetryPolicy};
use gateway_vendor::{NormalizedRequest, NormalizedResponse, VendorAdapter, VendorFailure};
use tokio_util::sync::CancellationToken;

/// `{winningVendor, response, fallbackUsed, attempts[]}`, collapsed into a
/// `Result` so the conversation pipeline can `?` through it.
pub struct FallbackSuccess {
    pub winning_vendor: Vendor,
    pub response: NormalizedResponse,
    pub fallback_used: bool,
    pub attempts: Vec<RetryAttempt>,
}

/// All configured vendors exhausted: no success on either primary or
/// fallback.
pub struct FallbackFailure {
    pub primary_vendor: Vendor,
    pub fallback_vendor: Option<Vendor>,
    pub attempts: Vec<RetryAttempt>,
}

pub enum FallbackResult {
    Success(FallbackSuccess),
    Failure(FallbackFailure),
    Cancelled,
}

/// A vendor paired with the adapter that speaks to it; the unit the
/// orchestrator retries.
pub struct VendorSlot<'a> {
    pub vendor: Vendor,
    pub adapter: &'a dyn VendorAdapter,
}

/// Runs [`gateway_retry::run`] against `primary`; on total failure and if
/// `fallback` is `Some`, runs it against `fallback` too, concatenating
/// attempt logs in invocation order. Primary always goes first, so there is
/// no tie-break to make.
#[allow(clippy::too_many_arguments)]
pub async fn run(
    primary: VendorSlot<'_>,
    fallback: Option<VendorSlot<'_>>,
    request: &NormalizedRequest,
    policy: &RetryPolicy,
    observer: &dyn AttemptObserver,
    cancellation: &CancellationToken,
) -> FallbackResult {
    let (primary_outcome, primary_attempts) = gateway_retry::run(
        primary.vendor,
        primary.adapter,
        request,
        policy,
        observer,
        cancellation,
    )
    .await;

    match primary_outcome {
        RetryOutcome::Success(response) => FallbackResult::Success(FallbackSuccess {
            winning_vendor: primary.vendor,
            response,
            fallback_used: false,
            attempts: primary_attempts,
        }),
        RetryOutcome::Cancelled => FallbackResult::Cancelled,
        RetryOutcome::Failure(_primary_failure) => {
            let Some(fallback) = fallback else {
                return FallbackResult::Failure(FallbackFailure {
                    primary_vendor: primary.vendor,
                    fallback_vendor: None,
                    attempts: primary_attempts,
                });
            };

            #[cfg(feature = "metrics")]
            metrics::counter!("gateway_fallback_invocations_total", "primary" => primary.vendor.as_str(), "fallback" => fallback.vendor.as_str())
                .increment(1);
            #[cfg(feature = "tracing")]
            tracing::warn!(
                primary = primary.vendor.as_str(),
                fallback = fallback.vendor.as_str(),
                "primary vendor exhausted, engaging fallback"
            );

            let (fallback_outcome, fallback_attempts) = gateway_retry::run(
                fallback.vendor,
                fallback.adapter,
                request,
                policy,
                observer,
                cancellation,
            )
            .await;

            let mut attempts = primary_attempts;
            attempts.extend(fallback_attempts);

            match fallback_outcome {
                RetryOutcome::Success(response) => FallbackResult::Success(FallbackSuccess {
                    winning_vendor: fallback.vendor,
                    response,
                    fallback_used: true,
                    attempts,
                }),
                RetryOutcome::Cancelled => FallbackResult::Cancelled,
                RetryOutcome::Failure(_fallback_failure) => {
                    FallbackResult::Failure(FallbackFailure {
                        primary_vendor: primary.vendor,
                        fallback_vendor: Some(fallback.vendor),
                        attempts,
                    })
                }
            }
        }
    }
}
