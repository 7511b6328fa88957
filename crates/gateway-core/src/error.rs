//! The public error taxonomy: the codes a `send_message` call can fail
//! with, each carrying the data needed to populate the error envelope
//! (`{ code, message, details?, requestId }`).
//!
//! Store failures and vendor failures are separate value types
//! (`gateway-store::StoreError`, `gateway-vendor::VendorFailure`); they
//! convert into [`GatewayError::Internal`] / are consumed inside the retry
//! engine respectively. Neither ever unwinds the request — both are
//! ordinary `Result` values all the way up.

use crate::entities::{AttemptLogEntry, Vendor};
use serde::Serialize;

/// Error codes, serialized verbatim onto the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    IdempotencyKeyRequired,
    SessionNotFound,
    AgentNotFound,
    AllProvidersFailed,
    InvalidApiKey,
    /// The optional fingerprint-mismatch tightening switch, disabled by
    /// default.
    IdempotencyKeyReused,
    /// A concurrent request under the same key is mid-flight. The
    /// transport maps it to a retryable client-visible signal.
    RequestInFlight,
    Internal,
}

/// The public error surface returned by the conversation pipeline's `send`
/// operation.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GatewayError {
    /// Client bug: no idempotency key was supplied.
    #[error("idempotency key is required")]
    IdempotencyKeyRequired,

    /// `session.tenant_id != tenant_id`, or no such session exists for this
    /// tenant. Not retried by the core; the idempotency placeholder is left
    /// unset so a later send with the same key can still succeed.
    #[error("session not found")]
    SessionNotFound,

    /// The session's agent could not be resolved for this tenant.
    #[error("agent not found")]
    AgentNotFound,

    /// Retry + fallback exhausted against both vendors. The attempt audit
    /// and vendor identities ride along so the transport can surface a
    /// faithful `details` payload.
    #[error("all providers failed")]
    AllProvidersFailed {
        primary_vendor: Vendor,
        fallback_vendor: Option<Vendor>,
        attempts: Vec<AttemptLogEntry>,
    },

    /// Credential did not resolve to a tenant. The core never actually
    /// observes this variant in practice — the auth gate rejects the
    /// request before the pipeline runs — but it is part of the public
    /// taxonomy so transports can map it uniformly.
    #[error("invalid api key")]
    InvalidApiKey,

    /// The fingerprint recomputed for a replayed key differs from the one
    /// stored on the `IdempotencyRecord`, and
    /// `GatewayConfig::fail_on_fingerprint_mismatch` is enabled. Off by
    /// default; mismatches are otherwise ignored and the stored response is
    /// replayed as-is.
    #[error("idempotency key reused with a different request payload")]
    IdempotencyKeyReused,

    /// A concurrent request under the same `(tenantId, scope, key)` is
    /// mid-flight: the idempotency record exists with a null response. The
    /// core neither waits nor retries; it returns this conflict-shaped
    /// result and leaves the retry to the client.
    #[error("a request with this idempotency key is already in flight")]
    RequestInFlight,

    /// Programmer error or store failure. Partially written rows are left
    /// in place (audit-honest); the send is aborted.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    pub fn code(&self) -> ErrorCode {
        match self {
            GatewayError::IdempotencyKeyRequired => ErrorCode::IdempotencyKeyRequired,
            GatewayError::SessionNotFound => ErrorCode::SessionNotFound,
            GatewayError::AgentNotFound => ErrorCode::AgentNotFound,
            GatewayError::AllProvidersFailed { .. } => ErrorCode::AllProvidersFailed,
            GatewayError::InvalidApiKey => ErrorCode::InvalidApiKey,
            GatewayError::IdempotencyKeyReused => ErrorCode::IdempotencyKeyReused,
            GatewayError::RequestInFlight => ErrorCode::RequestInFlight,
            GatewayError::Internal(_) => ErrorCode::Internal,
        }
    }

    /// Builds the `{ code, message, details?, requestId }` envelope.
    pub fn to_envelope(&self, request_id: impl Into<String>) -> ErrorEnvelope {
        let details = match self {
            GatewayError::AllProvidersFailed {
                primary_vendor,
                fallback_vendor,
                attempts,
            } => Some(serde_json::json!({
                "primaryVendor": primary_vendor.as_str(),
                "fallbackVendor": fallback_vendor.map(|v| v.as_str()),
                "attempts": attempts,
            })),
            _ => None,
        };
        ErrorEnvelope {
            code: self.code(),
            message: self.to_string(),
            details,
            request_id: request_id.into(),
        }
    }
}

/// Wire shape of the error envelope.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEnvelope {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    pub request_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_not_found_has_no_details() {
        let err = GatewayError::SessionNotFound;
        let envelope = err.to_envelope("req-1");
        assert_eq!(envelope.code, ErrorCode::SessionNotFound);
        assert!(envelope.details.is_none());
    }

    #[test]
    fn all_providers_failed_carries_the_attempt_audit() {
        let err = GatewayError::AllProvidersFailed {
            primary_vendor: Vendor::VendorA,
            fallback_vendor: Some(Vendor::VendorB),
            attempts: vec![],
        };
        let envelope = err.to_envelope("req-2");
        assert_eq!(envelope.code, ErrorCode::AllProvidersFailed);
        let details = envelope.details.unwrap();
        assert_eq!(details["primaryVendor"], "vendorA");
        assert_eq!(details["fallbackVendor"], "vendorB");
    }

    #[test]
    fn error_code_serializes_screaming_snake_case() {
        let json = serde_json::to_string(&ErrorCode::AllProvidersFailed).unwrap();
        assert_eq!(json, "\"ALL_PROVIDERS_FAILED\"");
    }
}
