//! Idempotency protocol: unique-key guarded insert, lookup-and-replay,
//! response materialization on completion.

use gateway_core::ids::{SessionId, TenantId};
use gateway_store::{IdempotencyInsertOutcome, TenantScopedStore};
use sha2::{Digest, Sha256};

/// `"send_message"` scope shared by text and voice sends; voice reuses the
/// same protocol, only the fingerprint computation differs.
pub const SEND_MESSAGE_SCOPE: &str = "send_message";

/// `H(tenantId || sessionId || content)`.
pub fn fingerprint(tenant: TenantId, session_id: SessionId, content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(tenant.0.as_bytes());
    hasher.update(session_id.0.as_bytes());
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// What the caller (the conversation pipeline) should do next. `Replay`
/// carries the stored fingerprint alongside the response bytes so the
/// caller can apply the optional fingerprint-mismatch tightening switch
/// without a second store round-trip.
pub enum IdempotencyOutcome {
    /// A completed response exists for this key: return it verbatim with
    /// `replayed=true`, performing no writes.
    Replay {
        response: Vec<u8>,
        stored_fingerprint: String,
    },
    /// A placeholder exists with a null response: a concurrent request is
    /// mid-flight. The core neither waits nor retries.
    Conflict,
    /// This call is the writer: proceed with processing the send, using
    /// this record as "ours".
    Proceed,
}

/// Looks up the key, and if absent, inserts a placeholder. Exactly one
/// unique-violation retry: if the insert loses a race, it falls back to
/// treating the now-visible record as the lookup result rather than
/// retrying indefinitely.
pub async fn begin(
    store: &dyn TenantScopedStore,
    tenant: TenantId,
    key: &str,
    session_id: SessionId,
    fingerprint: String,
) -> IdempotencyOutcome {
    if let Some(outcome) = lookup(store, tenant, key).await {
        return outcome;
    }

    match store
        .idempotency_insert(tenant, SEND_MESSAGE_SCOPE, key, Some(session_id), fingerprint)
        .await
    {
        IdempotencyInsertOutcome::Inserted(_) => IdempotencyOutcome::Proceed,
        IdempotencyInsertOutcome::AlreadyExists(record) => outcome_from_record(record),
    }
}

async fn lookup(store: &dyn TenantScopedStore, tenant: TenantId, key: &str) -> Option<IdempotencyOutcome> {
    let record = store.idempotency_lookup(tenant, SEND_MESSAGE_SCOPE, key).await?;
    Some(outcome_from_record(record))
}

fn outcome_from_record(record: gateway_core::entities::IdempotencyRecord) -> IdempotencyOutcome {
    match record.response {
        Some(response) => IdempotencyOutcome::Replay {
            response,
            stored_fingerprint: record.request_fingerprint,
        },
        None => IdempotencyOutcome::Conflict,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_store::InMemoryStore;

    #[test]
    fn fingerprint_is_sensitive_to_every_input() {
        let t1 = TenantId::new();
        let t2 = TenantId::new();
        let s1 = SessionId::new();
        let s2 = SessionId::new();

        let base = fingerprint(t1, s1, "hello");
        assert_ne!(base, fingerprint(t2, s1, "hello"));
        assert_ne!(base, fingerprint(t1, s2, "hello"));
        assert_ne!(base, fingerprint(t1, s1, "world"));
        assert_eq!(base, fingerprint(t1, s1, "hello"));
    }

    #[tokio::test]
    async fn first_caller_proceeds_second_sees_conflict() {
        let store = InMemoryStore::new();
        let tenant = TenantId::new();
        let session = SessionId::new();

        let first = begin(&store, tenant, "K", session, "fp".into()).await;
        assert!(matches!(first, IdempotencyOutcome::Proceed));

        let second = begin(&store, tenant, "K", session, "fp".into()).await;
        assert!(matches!(second, IdempotencyOutcome::Conflict));
    }

    #[tokio::test]
    async fn completed_key_replays_with_its_stored_fingerprint() {
        use gateway_store::TenantScopedStore;

        let store = InMemoryStore::new();
        let tenant = TenantId::new();
        let session = SessionId::new();

        begin(&store, tenant, "K", session, "original-fp".into()).await;
        store
            .idempotency_complete(tenant, SEND_MESSAGE_SCOPE, "K", b"envelope-bytes".to_vec())
            .await;

        let outcome = begin(&store, tenant, "K", session, "different-fp".into()).await;
        match outcome {
            IdempotencyOutcome::Replay { response, stored_fingerprint } => {
                assert_eq!(response, b"envelope-bytes");
                assert_eq!(stored_fingerprint, "original-fp");
            }
            _ => panic!("expected a replay"),
        }
    }
}
