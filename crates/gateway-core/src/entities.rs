//! The data model: tenants, credentials, agents, sessions, messages, attempt
//! log entries, usage events, and idempotency records.
//!
//! These are plain data structs. Persistence and tenant-scoping live in
//! `gateway-store`; this crate only defines the shapes and the invariants
//! that are checkable without a store (e.g. `Agent::validate`).

use crate::ids::{AgentId, AttemptId, CredentialId, MessageId, SessionId, TenantId, UsageEventId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// The two interchangeable LLM vendors the gateway can address.
///
/// A third vendor is added by extending this enum and registering an
/// adapter + price in the respective registries (see `gateway-vendor` and
/// `pricing`) — not by touching the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Vendor {
    VendorA,
    VendorB,
}

impl Vendor {
    pub fn as_str(&self) -> &'static str {
        match self {
            Vendor::VendorA => "vendorA",
            Vendor::VendorB => "vendorB",
        }
    }
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Optional fallback vendor slot on an [`Agent`]; distinguishes "no
/// fallback configured" from "fallback is vendorA/vendorB".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FallbackVendor {
    Vendor(Vendor),
    None,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: TenantId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// A hashed credential owned by a tenant. The plaintext secret never
/// appears in this type; only its hash is stored (see `gateway-pipeline`'s
/// auth gate for hashing/comparison).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub id: CredentialId,
    pub tenant_id: TenantId,
    pub credential_hash: String,
    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
}

/// Error returned by [`Agent::validate`] when the vendor configuration
/// violates the invariant that the fallback vendor must differ from the
/// primary vendor, unless no fallback is configured.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("fallback vendor must differ from the primary vendor, or be none")]
pub struct FallbackEqualsPrimary;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub tenant_id: TenantId,
    pub name: String,
    pub primary_vendor: Vendor,
    pub fallback_vendor: FallbackVendor,
    pub system_prompt: String,
    pub enabled_tools: Vec<String>,
}

impl Agent {
    /// Checks that the fallback vendor differs from the primary vendor.
    pub fn validate(&self) -> Result<(), FallbackEqualsPrimary> {
        if let FallbackVendor::Vendor(v) = self.fallback_vendor {
            if v == self.primary_vendor {
                return Err(FallbackEqualsPrimary);
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub tenant_id: TenantId,
    pub agent_id: AgentId,
    pub customer_id: String,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub tenant_id: TenantId,
    pub session_id: SessionId,
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttemptOutcome {
    Success,
    Failed,
}

/// A single vendor invocation record, append-only, owned by the session's
/// tenant. Produced by the retry engine's observer as attempts happen, so
/// a crash mid-send leaves a truthful partial audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptLogEntry {
    pub id: AttemptId,
    pub tenant_id: TenantId,
    pub session_id: SessionId,
    pub agent_id: AgentId,
    pub vendor: Vendor,
    pub outcome: AttemptOutcome,
    pub http_status: Option<u16>,
    pub latency_ms: u64,
    pub retry_index: usize,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub request_id: String,
    pub created_at: DateTime<Utc>,
}

/// The billing row produced once per successful send. Immutable once
/// created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageEvent {
    pub id: UsageEventId,
    pub tenant_id: TenantId,
    pub session_id: SessionId,
    pub agent_id: AgentId,
    pub vendor: Vendor,
    pub tokens_in: u64,
    pub tokens_out: u64,
    pub cost_usd: f64,
    pub request_id: String,
    pub created_at: DateTime<Utc>,
}

/// Composite-key record guarding the idempotency protocol.
///
/// Inserted with `response = None` at the start of processing; `response`
/// is set exactly once, on successful completion, and the record is never
/// otherwise mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdempotencyRecord {
    pub tenant_id: TenantId,
    pub scope: String,
    pub key: String,
    pub session_id: Option<SessionId>,
    pub request_fingerprint: String,
    /// Serialized response envelope bytes, set exactly once on completion.
    pub response: Option<Vec<u8>>,
    pub created_at: DateTime<Utc>,
}

impl IdempotencyRecord {
    pub fn is_completed(&self) -> bool {
        self.response.is_some()
    }
}
