//! The tenant-scoped store capability: every read and write accepts a
//! `tenantId` and returns results only for that tenant.

use crate::error::StoreError;
use gateway_core::entities::{AttemptLogEntry, Agent, IdempotencyRecord, Message, Role, Session, UsageEvent};
use gateway_core::ids::{AgentId, SessionId, TenantId};

/// Distinguishes "we created the placeholder" from "someone already did".
/// On `AlreadyExists` the caller goes back to the top of the idempotency
/// protocol exactly once rather than retrying indefinitely.
#[derive(Debug, Clone)]
pub enum IdempotencyInsertOutcome {
    Inserted(IdempotencyRecord),
    AlreadyExists(IdempotencyRecord),
}

#[async_trait::async_trait]
pub trait TenantScopedStore: Send + Sync {
    async fn find_agent(&self, tenant: TenantId, agent_id: AgentId) -> Option<Agent>;

    async fn find_session(&self, tenant: TenantId, session_id: SessionId) -> Option<Session>;

    async fn list_session_messages_ascending(
        &self,
        tenant: TenantId,
        session_id: SessionId,
    ) -> Vec<Message>;

    /// Assigns a creation time monotonic with respect to the session.
    async fn append_message(
        &self,
        tenant: TenantId,
        session_id: SessionId,
        role: Role,
        content: String,
    ) -> Message;

    async fn touch_session_activity(&self, tenant: TenantId, session_id: SessionId);

    /// Ordering within the batch is preserved.
    async fn record_attempts(&self, tenant: TenantId, attempts: Vec<AttemptLogEntry>);

    async fn record_usage(&self, tenant: TenantId, usage: UsageEvent) -> Result<(), StoreError>;

    async fn idempotency_lookup(
        &self,
        tenant: TenantId,
        scope: &str,
        key: &str,
    ) -> Option<IdempotencyRecord>;

    async fn idempotency_insert(
        &self,
        tenant: TenantId,
        scope: &str,
        key: &str,
        session_id: Option<SessionId>,
        fingerprint: String,
    ) -> IdempotencyInsertOutcome;

    /// Sets `response` exactly once, on successful completion.
    async fn idempotency_complete(
        &self,
        tenant: TenantId,
        scope: &str,
        key: &str,
        response: Vec<u8>,
    );

    /// Sweeps completed idempotency records older than `older_than_seconds`,
    /// returning the count removed. Not required for correctness and not
    /// wired to a scheduler; exists as a retention hook an operator can call
    /// periodically.
    async fn sweep_idempotency_records(&self, older_than_seconds: i64) -> usize;
}
