//! Wire shape of the `send_message` response envelopes, serialized once at
//! completion and replayed verbatim except for the `replayed` flag, which
//! is computed at read time rather than re-serializing the whole envelope
//! on every replay.

use gateway_core::entities::{AttemptOutcome, Message, Role, Vendor};
use gateway_core::ids::{AgentId, MessageId, SessionId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageEnvelope {
    pub id: MessageId,
    pub session_id: SessionId,
    pub role: Role,
    pub content: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl MessageEnvelope {
    /// The assistant message appended on a successful send.
    pub fn assistant(message: &Message) -> Self {
        Self {
            id: message.id,
            session_id: message.session_id,
            role: Role::Assistant,
            content: message.content.clone(),
            created_at: message.created_at,
        }
    }
}

/// One entry of `metadata.attempts`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptSummary {
    pub provider: Vendor,
    pub status: AttemptOutcome,
    pub http_status: Option<u16>,
    pub latency_ms: u64,
    pub retries: usize,
    pub error_code: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingSummary {
    pub usd_per_1k_tokens: HashMap<String, f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageSummary {
    pub tokens_in: u64,
    pub tokens_out: u64,
    pub cost_usd: f64,
    pub pricing: PricingSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdempotencyMetadata {
    pub key: String,
    pub replayed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMetadata {
    pub agent_id: AgentId,
    pub provider_used: Vendor,
    pub primary_attempted: Vendor,
    pub fallback_attempted: Option<Vendor>,
    pub fallback_used: bool,
    pub attempts: Vec<AttemptSummary>,
    pub usage: UsageSummary,
    pub idempotency: IdempotencyMetadata,
    pub request_id: String,
}

/// The `send_message` success envelope, stored verbatim in the idempotency
/// record on completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendResponseEnvelope {
    pub message: MessageEnvelope,
    pub metadata: ResponseMetadata,
}

impl SendResponseEnvelope {
    /// Serializes the envelope for storage. The stored bytes always carry
    /// `replayed=false`; replays flip the flag at read time instead of
    /// re-serializing.
    pub fn to_stored_bytes(&self) -> serde_json::Result<Vec<u8>> {
        debug_assert!(!self.metadata.idempotency.replayed);
        serde_json::to_vec(self)
    }

    /// Deserializes previously stored bytes and flips `replayed` to `true`
    /// — the single field mutated when returning a cached response.
    pub fn from_stored_bytes_replayed(bytes: &[u8]) -> serde_json::Result<Self> {
        let mut envelope: Self = serde_json::from_slice(bytes)?;
        envelope.metadata.idempotency.replayed = true;
        Ok(envelope)
    }
}
