//! The attempt record emitted by the retry engine's observer, and the
//! observer capability itself.

use gateway_core::entities::{AttemptOutcome, Vendor};

/// One vendor invocation, as seen by the retry engine. Carries everything
/// an attempt-log entry needs except the tenant/session/agent/request
/// identifiers, which the caller (the fallback orchestrator, then the
/// conversation pipeline) attaches when persisting it.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryAttempt {
    pub vendor: Vendor,
    pub outcome: AttemptOutcome,
    pub http_status: Option<u16>,
    pub latency_ms: u64,
    pub retry_index: usize,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
}

/// Receives attempt records as they happen, so a crash mid-send leaves a
/// truthful partial audit. Implementations typically write through
/// `gateway-store`'s `record_attempts`.
#[async_trait::async_trait]
pub trait AttemptObserver: Send + Sync {
    async fn on_attempt(&self, attempt: &RetryAttempt);
}

/// An observer that does nothing, for call sites (tests, examples) that
/// don't need the audit trail.
pub struct NoopObserver;

#[async_trait::async_trait]
impl AttemptObserver for NoopObserver {
    async fn on_attempt(&self, _attempt: &RetryAttempt) {}
}
