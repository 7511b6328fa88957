//! The `VendorAdapter` capability and the normalized request/response/failure
//! shapes every adapter translates to and from.

use gateway_core::entities::Role;
use std::time::Duration;

/// One turn of conversation history, as consumed by a vendor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedMessage {
    pub role: Role,
    pub content: String,
}

/// `{systemPrompt, messages[{role, content}], enabledTools}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRequest {
    pub system_prompt: String,
    pub messages: Vec<NormalizedMessage>,
    pub enabled_tools: Vec<String>,
}

/// `{text, tokensIn, tokensOut, latencyMs}`. `tokens_in`/`tokens_out` must
/// be non-negative, which the unsigned types make structurally true.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedResponse {
    pub text: String,
    pub tokens_in: u64,
    pub tokens_out: u64,
    pub latency_ms: u64,
}

/// `{statusCode, errorCode, message, retryAfterMs?}`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("vendor call failed: {status_code} {error_code} ({message})")]
pub struct VendorFailure {
    pub status_code: u16,
    pub error_code: String,
    pub message: String,
    pub retry_after: Option<Duration>,
}

impl VendorFailure {
    pub fn timeout() -> Self {
        Self {
            status_code: 504,
            error_code: "TIMEOUT".into(),
            message: "vendor call timed out".into(),
            retry_after: None,
        }
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self {
            status_code: 500,
            error_code: "UNKNOWN_ERROR".into(),
            message: message.into(),
            retry_after: None,
        }
    }

    /// `>=500` and `429` are retryable; the rest of `4xx` is not.
    pub fn is_retryable(&self) -> bool {
        self.status_code >= 500 || self.status_code == 429
    }
}

/// Given a normalized request, produce a normalized response or a
/// normalized failure. Implementors are stateless with respect to a single
/// call and must be `Send + Sync` to be shared across concurrent sends.
#[async_trait::async_trait]
pub trait VendorAdapter: Send + Sync {
    async fn call(&self, request: &NormalizedRequest) -> Result<NormalizedResponse, VendorFailure>;
}
