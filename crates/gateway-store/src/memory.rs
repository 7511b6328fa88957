//! In-memory `TenantScopedStore` + `CredentialStore` implementation: the
//! tenant-scoped store capability backed by `dashmap`'s sharded maps for
//! lock-minimal concurrent access, safe to share across concurrent sends.
//!
//! The unique `(tenantId, scope, idempotencyKey)` index is the one place
//! contention is load-bearing: `idempotency_insert` goes through
//! `DashMap::entry`, which holds its shard's lock for the full
//! check-then-insert, giving the single-writer guarantee without a separate
//! mutex.

use crate::credential::CredentialStore;
use crate::error::StoreError;
use crate::trait_def::{IdempotencyInsertOutcome, TenantScopedStore};
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use gateway_core::entities::{
    Agent, AttemptLogEntry, Credential, IdempotencyRecord, Message, Role, Session, UsageEvent,
};
use gateway_core::ids::{AgentId, MessageId, SessionId, TenantId};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

/// A single-process store keyed by every tenant-scoped index the trait
/// exposes. Every map is additionally keyed (directly or via the stored
/// value) by `TenantId`, so a lookup under the wrong tenant structurally
/// misses.
#[derive(Default)]
pub struct InMemoryStore {
    agents: DashMap<(TenantId, AgentId), Agent>,
    sessions: DashMap<(TenantId, SessionId), Mutex<Session>>,
    messages: DashMap<SessionId, Mutex<Vec<Message>>>,
    message_clocks: DashMap<SessionId, AtomicI64>,
    attempts: DashMap<SessionId, Mutex<Vec<AttemptLogEntry>>>,
    usage_by_request_id: DashMap<String, UsageEvent>,
    idempotency: DashMap<(TenantId, String, String), IdempotencyRecord>,
    credentials: DashMap<String, Credential>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds an agent the way the management plane would. Agent CRUD lives
    /// outside this crate; this is the seam a demo or test uses to set one
    /// up without that collaborator.
    pub fn seed_agent(&self, agent: Agent) {
        self.agents.insert((agent.tenant_id, agent.id), agent);
    }

    /// Seeds a session, likewise standing in for session creation.
    pub fn seed_session(&self, session: Session) {
        self.sessions
            .insert((session.tenant_id, session.id), Mutex::new(session));
    }

    /// Seeds a credential, standing in for credential issuance.
    pub fn seed_credential(&self, credential: Credential) {
        self.credentials
            .insert(credential.credential_hash.clone(), credential);
    }

    fn next_message_instant(&self, session_id: SessionId) -> DateTime<Utc> {
        let clock = self
            .message_clocks
            .entry(session_id)
            .or_insert_with(|| AtomicI64::new(0));
        next_instant(&clock)
    }
}

/// Assigns a timestamp that is both close to wall-clock time and strictly
/// greater than every timestamp previously handed out by this clock, so
/// `append_message`'s ordering stays monotonic with respect to the session
/// even when two appends land in the same clock tick.
fn next_instant(clock: &AtomicI64) -> DateTime<Utc> {
    let now_nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    let mut last = clock.load(Ordering::SeqCst);
    loop {
        let candidate = now_nanos.max(last + 1);
        match clock.compare_exchange_weak(last, candidate, Ordering::SeqCst, Ordering::SeqCst) {
            Ok(_) => return DateTime::from_timestamp_nanos(candidate),
            Err(actual) => last = actual,
        }
    }
}

#[async_trait::async_trait]
impl TenantScopedStore for InMemoryStore {
    async fn find_agent(&self, tenant: TenantId, agent_id: AgentId) -> Option<Agent> {
        self.agents.get(&(tenant, agent_id)).map(|r| r.value().clone())
    }

    async fn find_session(&self, tenant: TenantId, session_id: SessionId) -> Option<Session> {
        self.sessions
            .get(&(tenant, session_id))
            .map(|r| r.value().lock().unwrap().clone())
    }

    async fn list_session_messages_ascending(
        &self,
        tenant: TenantId,
        session_id: SessionId,
    ) -> Vec<Message> {
        let Some(guard) = self.messages.get(&session_id) else {
            return Vec::new();
        };
        let mut out: Vec<Message> = guard
            .value()
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.tenant_id == tenant)
            .cloned()
            .collect();
        // Totally ordered by createdAt with a stable tie-break on id.
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        out
    }

    async fn append_message(
        &self,
        tenant: TenantId,
        session_id: SessionId,
        role: Role,
        content: String,
    ) -> Message {
        let created_at = self.next_message_instant(session_id);
        let message = Message {
            id: MessageId::new(),
            tenant_id: tenant,
            session_id,
            role,
            content,
            created_at,
        };
        self.messages
            .entry(session_id)
            .or_insert_with(|| Mutex::new(Vec::new()))
            .value()
            .lock()
            .unwrap()
            .push(message.clone());
        message
    }

    async fn touch_session_activity(&self, tenant: TenantId, session_id: SessionId) {
        if let Some(entry) = self.sessions.get(&(tenant, session_id)) {
            entry.value().lock().unwrap().last_activity_at = Utc::now();
        }
    }

    async fn record_attempts(&self, tenant: TenantId, attempts: Vec<AttemptLogEntry>) {
        let Some(first) = attempts.first() else {
            return;
        };
        debug_assert!(
            attempts.iter().all(|a| a.tenant_id == tenant),
            "record_attempts called with an attempt owned by a different tenant"
        );
        let session_id = first.session_id;
        self.attempts
            .entry(session_id)
            .or_insert_with(|| Mutex::new(Vec::new()))
            .value()
            .lock()
            .unwrap()
            .extend(attempts);
    }

    async fn record_usage(&self, tenant: TenantId, usage: UsageEvent) -> Result<(), StoreError> {
        debug_assert_eq!(usage.tenant_id, tenant);
        match self.usage_by_request_id.entry(usage.request_id.clone()) {
            Entry::Occupied(_) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(request_id = %usage.request_id, "rejected duplicate usage event for request id");
                Err(StoreError::DuplicateRequestId(usage.request_id))
            }
            Entry::Vacant(slot) => {
                slot.insert(usage);
                Ok(())
            }
        }
    }

    async fn idempotency_lookup(
        &self,
        tenant: TenantId,
        scope: &str,
        key: &str,
    ) -> Option<IdempotencyRecord> {
        self.idempotency
            .get(&(tenant, scope.to_string(), key.to_string()))
            .map(|r| r.value().clone())
    }

    async fn idempotency_insert(
        &self,
        tenant: TenantId,
        scope: &str,
        key: &str,
        session_id: Option<SessionId>,
        fingerprint: String,
    ) -> IdempotencyInsertOutcome {
        let composite = (tenant, scope.to_string(), key.to_string());
        match self.idempotency.entry(composite) {
            Entry::Occupied(existing) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(scope, key, "idempotency key already has a record, not inserting");
                IdempotencyInsertOutcome::AlreadyExists(existing.get().clone())
            }
            Entry::Vacant(slot) => {
                let record = IdempotencyRecord {
                    tenant_id: tenant,
                    scope: scope.to_string(),
                    key: key.to_string(),
                    session_id,
                    request_fingerprint: fingerprint,
                    response: None,
                    created_at: Utc::now(),
                };
                slot.insert(record.clone());
                IdempotencyInsertOutcome::Inserted(record)
            }
        }
    }

    async fn idempotency_complete(&self, tenant: TenantId, scope: &str, key: &str, response: Vec<u8>) {
        if let Some(mut entry) = self
            .idempotency
            .get_mut(&(tenant, scope.to_string(), key.to_string()))
        {
            // The response field is set exactly once, on successful
            // completion — never overwrite an already-completed record.
            if entry.response.is_none() {
                entry.response = Some(response);
            }
        }
    }

    async fn sweep_idempotency_records(&self, older_than_seconds: i64) -> usize {
        let cutoff = Utc::now() - chrono::Duration::seconds(older_than_seconds);
        let mut removed = 0usize;
        self.idempotency.retain(|_, record| {
            let expired = record.is_completed() && record.created_at < cutoff;
            if expired {
                removed += 1;
            }
            !expired
        });
        #[cfg(feature = "tracing")]
        if removed > 0 {
            tracing::debug!(removed, "swept completed idempotency records past the retention horizon");
        }
        removed
    }
}

#[async_trait::async_trait]
impl CredentialStore for InMemoryStore {
    async fn resolve(&self, credential_hash: &str) -> Option<TenantId> {
        self.credentials.get(credential_hash).map(|c| c.value().tenant_id)
    }

    async fn touch_last_used(&self, credential_hash: &str) {
        if let Some(mut entry) = self.credentials.get_mut(credential_hash) {
            entry.last_used_at = Some(Utc::now());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_core::entities::AttemptOutcome;
    use gateway_core::entities::Vendor;
    use gateway_core::ids::{AttemptId, UsageEventId};

    fn tenant() -> TenantId {
        TenantId::new()
    }

    #[tokio::test]
    async fn find_agent_is_tenant_scoped() {
        let store = InMemoryStore::new();
        let t1 = tenant();
        let t2 = tenant();
        let agent = Agent {
            id: AgentId::new(),
            tenant_id: t1,
            name: "a".into(),
            primary_vendor: Vendor::VendorA,
            fallback_vendor: gateway_core::entities::FallbackVendor::None,
            system_prompt: "be helpful".into(),
            enabled_tools: vec![],
        };
        store.seed_agent(agent.clone());

        assert_eq!(store.find_agent(t1, agent.id).await, Some(agent.clone()));
        assert_eq!(store.find_agent(t2, agent.id).await, None);
    }

    #[tokio::test]
    async fn messages_are_ordered_ascending_with_id_tiebreak() {
        let store = InMemoryStore::new();
        let t = tenant();
        let session = SessionId::new();

        let m1 = store.append_message(t, session, Role::User, "hi".into()).await;
        let m2 = store
            .append_message(t, session, Role::Assistant, "hello".into())
            .await;
        let m3 = store.append_message(t, session, Role::User, "again".into()).await;

        let listed = store.list_session_messages_ascending(t, session).await;
        assert_eq!(listed.iter().map(|m| m.id).collect::<Vec<_>>(), vec![m1.id, m2.id, m3.id]);
        assert!(listed.windows(2).all(|w| w[0].created_at <= w[1].created_at));
    }

    #[tokio::test]
    async fn messages_are_invisible_to_other_tenants() {
        let store = InMemoryStore::new();
        let t1 = tenant();
        let t2 = tenant();
        let session = SessionId::new();
        store.append_message(t1, session, Role::User, "mine".into()).await;

        assert!(store.list_session_messages_ascending(t2, session).await.is_empty());
    }

    #[tokio::test]
    async fn idempotency_insert_is_single_writer() {
        let store = InMemoryStore::new();
        let t = tenant();

        let first = store
            .idempotency_insert(t, "send_message", "K2", None, "fp".into())
            .await;
        assert!(matches!(first, IdempotencyInsertOutcome::Inserted(_)));

        let second = store
            .idempotency_insert(t, "send_message", "K2", None, "fp-different".into())
            .await;
        match second {
            IdempotencyInsertOutcome::AlreadyExists(record) => {
                assert_eq!(record.request_fingerprint, "fp");
            }
            IdempotencyInsertOutcome::Inserted(_) => panic!("expected AlreadyExists"),
        }
    }

    #[tokio::test]
    async fn idempotency_complete_sets_response_exactly_once() {
        let store = InMemoryStore::new();
        let t = tenant();
        store
            .idempotency_insert(t, "send_message", "K1", None, "fp".into())
            .await;

        store
            .idempotency_complete(t, "send_message", "K1", b"first".to_vec())
            .await;
        store
            .idempotency_complete(t, "send_message", "K1", b"second".to_vec())
            .await;

        let record = store.idempotency_lookup(t, "send_message", "K1").await.unwrap();
        assert_eq!(record.response, Some(b"first".to_vec()));
    }

    #[tokio::test]
    async fn record_usage_rejects_duplicate_request_id() {
        let store = InMemoryStore::new();
        let t = tenant();
        let usage = |request_id: &str| UsageEvent {
            id: UsageEventId::new(),
            tenant_id: t,
            session_id: SessionId::new(),
            agent_id: AgentId::new(),
            vendor: Vendor::VendorA,
            tokens_in: 1,
            tokens_out: 1,
            cost_usd: 0.0,
            request_id: request_id.to_string(),
            created_at: Utc::now(),
        };

        assert!(store.record_usage(t, usage("req-1")).await.is_ok());
        assert!(matches!(
            store.record_usage(t, usage("req-1")).await,
            Err(StoreError::DuplicateRequestId(_))
        ));
    }

    #[tokio::test]
    async fn record_attempts_preserves_batch_order() {
        let store = InMemoryStore::new();
        let t = tenant();
        let session = SessionId::new();
        let agent = AgentId::new();
        let entry = |retry_index: usize| AttemptLogEntry {
            id: AttemptId::new(),
            tenant_id: t,
            session_id: session,
            agent_id: agent,
            vendor: Vendor::VendorA,
            outcome: AttemptOutcome::Failed,
            http_status: Some(503),
            latency_ms: 1,
            retry_index,
            error_code: Some("SERVER_ERROR".into()),
            error_message: None,
            request_id: "req".into(),
            created_at: Utc::now(),
        };

        store.record_attempts(t, vec![entry(0), entry(1)]).await;
        store.record_attempts(t, vec![entry(2)]).await;

        let all = store.attempts.get(&session).unwrap().lock().unwrap().clone();
        assert_eq!(all.iter().map(|a| a.retry_index).collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn sweep_only_removes_completed_records_past_the_horizon() {
        let store = InMemoryStore::new();
        let t = tenant();
        store
            .idempotency_insert(t, "send_message", "incomplete", None, "fp".into())
            .await;
        store
            .idempotency_insert(t, "send_message", "completed", None, "fp".into())
            .await;
        store
            .idempotency_complete(t, "send_message", "completed", b"{}".to_vec())
            .await;

        let removed = store.sweep_idempotency_records(-1).await;
        assert_eq!(removed, 1);
        assert!(store.idempotency_lookup(t, "send_message", "completed").await.is_none());
        assert!(store.idempotency_lookup(t, "send_message", "incomplete").await.is_some());
    }

    #[tokio::test]
    async fn credential_resolves_to_owning_tenant() {
        let store = InMemoryStore::new();
        let t = tenant();
        store.seed_credential(Credential {
            id: gateway_core::ids::CredentialId::new(),
            tenant_id: t,
            credential_hash: "hash-abc".into(),
            created_at: Utc::now(),
            last_used_at: None,
        });

        assert_eq!(CredentialStore::resolve(&store, "hash-abc").await, Some(t));
        assert_eq!(CredentialStore::resolve(&store, "unknown").await, None);
    }
}
