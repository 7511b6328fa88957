//! Conversation pipeline: the top-level orchestrator of a send — idempotency
//! check, validation, persist user turn, fallback orchestrator, persist
//! assistant turn, record usage, complete the idempotency record, build the
//! response.

use crate::envelope::{
    AttemptSummary, IdempotencyMetadata, MessageEnvelope, PricingSummary, ResponseMetadata,
    SendResponseEnvelope, UsageSummary,
};
use crate::idempotency::{self, IdempotencyOutcome};
use gateway_core::entities::{AttemptLogEntry, FallbackVendor, Role, UsageEvent};
use gateway_core::error::GatewayError;
use gateway_core::ids::{AgentId, AttemptId, SessionId, TenantId, UsageEventId};
use gateway_core::pricing::PricingTable;
use gateway_fallback::{FallbackResult, VendorSlot};
use gateway_retry::{AttemptObserver, RetryAttempt, RetryPolicy};
use gateway_store::TenantScopedStore;
use gateway_vendor::{NormalizedMessage, NormalizedRequest, VendorRegistry};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// `GatewayError` is the wire-visible error taxonomy; cancellation is kept
/// out of it deliberately — cancellation is not an error class, it simply
/// ends the task without completing the idempotency record.
#[derive(Debug)]
pub enum SendError {
    Gateway(GatewayError),
    Cancelled,
}

impl From<GatewayError> for SendError {
    fn from(err: GatewayError) -> Self {
        SendError::Gateway(err)
    }
}

/// A fingerprint-mismatch tightening switch, disabled by default: a replayed
/// key whose content fingerprint differs from the one stored is returned
/// verbatim rather than rejected, unless this is set.
#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineConfig {
    pub fail_on_fingerprint_mismatch: bool,
}

/// Wires the store, vendor registry, pricing table, and retry policy
/// together into the single `send` operation.
pub struct ConversationPipeline {
    store: Arc<dyn TenantScopedStore>,
    vendors: VendorRegistry,
    pricing: PricingTable,
    retry_policy: RetryPolicy,
    config: PipelineConfig,
}

impl ConversationPipeline {
    pub fn new(
        store: Arc<dyn TenantScopedStore>,
        vendors: VendorRegistry,
        pricing: PricingTable,
        retry_policy: RetryPolicy,
        config: PipelineConfig,
    ) -> Self {
        Self {
            store,
            vendors,
            pricing,
            retry_policy,
            config,
        }
    }

    /// Runs `send(tenantId, sessionId, idempotencyKey, userContent, requestId)`
    /// to completion (no external cancellation source).
    pub async fn send(
        &self,
        tenant: TenantId,
        session_id: SessionId,
        idempotency_key: &str,
        content: String,
        request_id: String,
    ) -> Result<SendResponseEnvelope, SendError> {
        self.send_cancellable(
            tenant,
            session_id,
            idempotency_key,
            content,
            request_id,
            &CancellationToken::new(),
        )
        .await
    }

    /// As [`Self::send`], but aborts promptly when `cancellation` fires:
    /// upstream cancellation propagates into the current vendor call and any
    /// pending sleep, aborting the send.
    #[allow(clippy::too_many_arguments)]
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self, content), fields(tenant_id = %tenant, session_id = %session_id, request_id = %request_id)))]
    pub async fn send_cancellable(
        &self,
        tenant: TenantId,
        session_id: SessionId,
        idempotency_key: &str,
        content: String,
        request_id: String,
        cancellation: &CancellationToken,
    ) -> Result<SendResponseEnvelope, SendError> {
        if idempotency_key.is_empty() {
            return Err(GatewayError::IdempotencyKeyRequired.into());
        }

        let computed_fingerprint = idempotency::fingerprint(tenant, session_id, &content);

        match idempotency::begin(
            self.store.as_ref(),
            tenant,
            idempotency_key,
            session_id,
            computed_fingerprint.clone(),
        )
        .await
        {
            IdempotencyOutcome::Replay { response, stored_fingerprint } => {
                if self.config.fail_on_fingerprint_mismatch && stored_fingerprint != computed_fingerprint {
                    return Err(GatewayError::IdempotencyKeyReused.into());
                }
                let envelope = SendResponseEnvelope::from_stored_bytes_replayed(&response)
                    .map_err(|e| GatewayError::Internal(e.to_string()))?;
                return Ok(envelope);
            }
            IdempotencyOutcome::Conflict => return Err(GatewayError::RequestInFlight.into()),
            IdempotencyOutcome::Proceed => {}
        }

        let session = self
            .store
            .find_session(tenant, session_id)
            .await
            .ok_or(GatewayError::SessionNotFound)?;

        let agent = self
            .store
            .find_agent(tenant, session.agent_id)
            .await
            .ok_or(GatewayError::AgentNotFound)?;

        // The user turn is persisted before the vendor is ever called, so a
        // total vendor failure still leaves a truthful record of what the
        // user tried to say. This is intentional.
        self.store
            .append_message(tenant, session_id, Role::User, content)
            .await;
        self.store.touch_session_activity(tenant, session_id).await;

        let history = self.store.list_session_messages_ascending(tenant, session_id).await;
        let request = NormalizedRequest {
            system_prompt: agent.system_prompt.clone(),
            messages: history
                .iter()
                .map(|m| NormalizedMessage {
                    role: m.role,
                    content: m.content.clone(),
                })
                .collect(),
            enabled_tools: agent.enabled_tools.clone(),
        };

        let primary_adapter = self.vendors.get(agent.primary_vendor).ok_or_else(|| {
            GatewayError::Internal(format!("no adapter registered for {}", agent.primary_vendor))
        })?;
        let fallback_vendor = match agent.fallback_vendor {
            FallbackVendor::Vendor(v) => Some(v),
            FallbackVendor::None => None,
        };
        let fallback_adapter = fallback_vendor
            .map(|v| {
                self.vendors
                    .get(v)
                    .ok_or_else(|| GatewayError::Internal(format!("no adapter registered for {}", v)))
            })
            .transpose()?;

        let observer = StoreAttemptObserver {
            store: self.store.as_ref(),
            tenant,
            session_id,
            agent_id: agent.id,
            request_id: request_id.clone(),
        };

        let result = gateway_fallback::run(
            VendorSlot {
                vendor: agent.primary_vendor,
                adapter: primary_adapter.as_ref(),
            },
            fallback_adapter.as_ref().map(|adapter| VendorSlot {
                vendor: fallback_vendor.expect("fallback_adapter is only Some when fallback_vendor is Some"),
                adapter: adapter.as_ref(),
            }),
            &request,
            &self.retry_policy,
            &observer,
            cancellation,
        )
        .await;

        match result {
            FallbackResult::Cancelled => Err(SendError::Cancelled),
            FallbackResult::Failure(failure) => {
                // No assistant message, no usage event, and the idempotency
                // record is left incomplete so a retry with the same key can
                // still succeed.
                #[cfg(feature = "metrics")]
                metrics::counter!("gateway_send_failed_total").increment(1);
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    primary_vendor = failure.primary_vendor.as_str(),
                    fallback_vendor = failure.fallback_vendor.map(|v| v.as_str()),
                    attempts = failure.attempts.len(),
                    "send failed: all providers exhausted"
                );

                let attempts = failure
                    .attempts
                    .iter()
                    .map(|a| to_attempt_log_entry(a, tenant, session_id, agent.id, &request_id))
                    .collect();
                Err(GatewayError::AllProvidersFailed {
                    primary_vendor: failure.primary_vendor,
                    fallback_vendor: failure.fallback_vendor,
                    attempts,
                }
                .into())
            }
            FallbackResult::Success(success) => {
                let assistant_message = self
                    .store
                    .append_message(tenant, session_id, Role::Assistant, success.response.text.clone())
                    .await;

                let cost_usd = self
                    .pricing
                    .cost_f64(success.winning_vendor, success.response.tokens_in, success.response.tokens_out)
                    .map_err(|e| GatewayError::Internal(e.to_string()))?;

                let usage = UsageEvent {
                    id: UsageEventId::new(),
                    tenant_id: tenant,
                    session_id,
                    agent_id: agent.id,
                    vendor: success.winning_vendor,
                    tokens_in: success.response.tokens_in,
                    tokens_out: success.response.tokens_out,
                    cost_usd,
                    request_id: request_id.clone(),
                    created_at: chrono::Utc::now(),
                };
                self.store
                    .record_usage(tenant, usage)
                    .await
                    .map_err(|e| GatewayError::Internal(e.to_string()))?;

                let envelope = SendResponseEnvelope {
                    message: MessageEnvelope::assistant(&assistant_message),
                    metadata: ResponseMetadata {
                        agent_id: agent.id,
                        provider_used: success.winning_vendor,
                        primary_attempted: agent.primary_vendor,
                        fallback_attempted: fallback_vendor,
                        fallback_used: success.fallback_used,
                        attempts: success.attempts.iter().map(to_attempt_summary).collect(),
                        usage: UsageSummary {
                            tokens_in: success.response.tokens_in,
                            tokens_out: success.response.tokens_out,
                            cost_usd,
                            pricing: PricingSummary {
                                usd_per_1k_tokens: self.pricing.as_usd_per_1k_map(),
                            },
                        },
                        idempotency: IdempotencyMetadata {
                            key: idempotency_key.to_string(),
                            replayed: false,
                        },
                        request_id: request_id.clone(),
                    },
                };

                // Serialize once, here, at completion; replays never
                // re-run this.
                let bytes = envelope
                    .to_stored_bytes()
                    .map_err(|e| GatewayError::Internal(e.to_string()))?;
                self.store
                    .idempotency_complete(tenant, idempotency::SEND_MESSAGE_SCOPE, idempotency_key, bytes)
                    .await;

                #[cfg(feature = "metrics")]
                metrics::counter!("gateway_send_succeeded_total", "vendor" => success.winning_vendor.as_str())
                    .increment(1);
                #[cfg(feature = "tracing")]
                tracing::info!(
                    provider_used = success.winning_vendor.as_str(),
                    fallback_used = success.fallback_used,
                    attempts = envelope.metadata.attempts.len(),
                    "send completed"
                );

                Ok(envelope)
            }
        }
    }
}

fn to_attempt_log_entry(
    attempt: &RetryAttempt,
    tenant: TenantId,
    session_id: SessionId,
    agent_id: AgentId,
    request_id: &str,
) -> AttemptLogEntry {
    AttemptLogEntry {
        id: AttemptId::new(),
        tenant_id: tenant,
        session_id,
        agent_id,
        vendor: attempt.vendor,
        outcome: attempt.outcome,
        http_status: attempt.http_status,
        latency_ms: attempt.latency_ms,
        retry_index: attempt.retry_index,
        error_code: attempt.error_code.clone(),
        error_message: attempt.error_message.clone(),
        request_id: request_id.to_string(),
        created_at: chrono::Utc::now(),
    }
}

fn to_attempt_summary(attempt: &RetryAttempt) -> AttemptSummary {
    AttemptSummary {
        provider: attempt.vendor,
        status: attempt.outcome,
        http_status: attempt.http_status,
        latency_ms: attempt.latency_ms,
        retries: attempt.retry_index,
        error_code: attempt.error_code.clone(),
    }
}

/// Writes each attempt through the store as it happens, so a crash mid-send
/// leaves a truthful partial audit.
struct StoreAttemptObserver<'a> {
    store: &'a dyn TenantScopedStore,
    tenant: TenantId,
    session_id: SessionId,
    agent_id: AgentId,
    request_id: String,
}

#[async_trait::async_trait]
impl AttemptObserver for StoreAttemptObserver<'_> {
    async fn on_attempt(&self, attempt: &RetryAttempt) {
        let entry = to_attempt_log_entry(attempt, self.tenant, self.session_id, self.agent_id, &self.request_id);
        self.store.record_attempts(self.tenant, vec![entry]).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use gateway_core::entities::{Agent, Session, SessionStatus, Vendor};
    use gateway_core::ids::SessionId;
    use gateway_core::pricing::PricingTable;
    use gateway_store::InMemoryStore;
    use gateway_vendor::{NormalizedResponse, ScriptedAdapter, VendorFailure};
    use std::collections::HashMap;

    fn setup(
        primary_vendor: Vendor,
        fallback_vendor: FallbackVendor,
    ) -> (Arc<InMemoryStore>, TenantId, SessionId, AgentId) {
        let store = Arc::new(InMemoryStore::new());
        let tenant = TenantId::new();
        let agent = Agent {
            id: AgentId::new(),
            tenant_id: tenant,
            name: "support-agent".into(),
            primary_vendor,
            fallback_vendor,
            system_prompt: "be helpful".into(),
            enabled_tools: vec![],
        };
        let session = Session {
            id: SessionId::new(),
            tenant_id: tenant,
            agent_id: agent.id,
            customer_id: "cust-1".into(),
            status: SessionStatus::Active,
            created_at: Utc::now(),
            last_activity_at: Utc::now(),
            metadata: HashMap::new(),
        };
        let session_id = session.id;
        let agent_id = agent.id;
        store.seed_agent(agent);
        store.seed_session(session);
        (store, tenant, session_id, agent_id)
    }

    fn registry(vendor: Vendor, adapter: ScriptedAdapter) -> VendorRegistry {
        let mut registry = VendorRegistry::new();
        registry.register(vendor, Arc::new(adapter));
        registry
    }

    fn registry_both(a: ScriptedAdapter, b: ScriptedAdapter) -> VendorRegistry {
        let mut registry = VendorRegistry::new();
        registry.register(Vendor::VendorA, Arc::new(a));
        registry.register(Vendor::VendorB, Arc::new(b));
        registry
    }

    fn ok(tokens_in: u64, tokens_out: u64) -> NormalizedResponse {
        NormalizedResponse {
            text: "hello there".into(),
            tokens_in,
            tokens_out,
            latency_ms: 5,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn happy_path_send_succeeds_on_first_attempt() {
        let (store, tenant, session_id, agent_id) = setup(Vendor::VendorA, FallbackVendor::None);
        let vendors = registry(Vendor::VendorA, ScriptedAdapter::always_succeed(ok(100, 200)));
        let pipeline = ConversationPipeline::new(
            store.clone(),
            vendors,
            PricingTable::with_defaults(),
            RetryPolicy::default(),
            PipelineConfig::default(),
        );

        let envelope = pipeline
            .send(tenant, session_id, "K1", "hello".into(), "req-1".into())
            .await
            .unwrap();

        assert_eq!(envelope.metadata.provider_used, Vendor::VendorA);
        assert!(!envelope.metadata.fallback_used);
        assert_eq!(envelope.metadata.attempts.len(), 1);
        assert_eq!(envelope.metadata.usage.cost_usd, 0.000600);
        assert!(!envelope.metadata.idempotency.replayed);

        let messages = store.list_session_messages_ascending(tenant, session_id).await;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[1].role, Role::Assistant);
        let _ = agent_id;
    }

    #[tokio::test(start_paused = true)]
    async fn fallback_engages_after_primary_exhausts() {
        let (store, tenant, session_id, _) = setup(Vendor::VendorA, FallbackVendor::Vendor(Vendor::VendorB));
        let primary = ScriptedAdapter::new(vec![
            gateway_vendor::ScriptedOutcome::Failure(VendorFailure {
                status_code: 500,
                error_code: "SERVER_ERROR".into(),
                message: "boom".into(),
                retry_after: None,
            });
            3
        ]);
        let fallback = ScriptedAdapter::always_succeed(ok(10, 20));
        let vendors = registry_both(primary, fallback);
        let pipeline = ConversationPipeline::new(
            store.clone(),
            vendors,
            PricingTable::with_defaults(),
            RetryPolicy::default(),
            PipelineConfig::default(),
        );

        let envelope = pipeline
            .send(tenant, session_id, "K3", "hello".into(), "req-3".into())
            .await
            .unwrap();

        assert_eq!(envelope.metadata.provider_used, Vendor::VendorB);
        assert!(envelope.metadata.fallback_used);
        assert_eq!(envelope.metadata.attempts.len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn all_providers_failed_writes_no_assistant_message_or_usage() {
        let (store, tenant, session_id, _) = setup(Vendor::VendorA, FallbackVendor::None);
        let vendors = registry(Vendor::VendorA, ScriptedAdapter::always_fail());
        let pipeline = ConversationPipeline::new(
            store.clone(),
            vendors,
            PricingTable::with_defaults(),
            RetryPolicy::default(),
            PipelineConfig::default(),
        );

        let err = pipeline
            .send(tenant, session_id, "K4", "hello".into(), "req-4".into())
            .await
            .unwrap_err();

        assert!(matches!(err, SendError::Gateway(GatewayError::AllProvidersFailed { .. })));

        let messages = store.list_session_messages_ascending(tenant, session_id).await;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, Role::User);
    }

    #[tokio::test(start_paused = true)]
    async fn replay_returns_the_same_envelope_with_replayed_true() {
        let (store, tenant, session_id, _) = setup(Vendor::VendorA, FallbackVendor::None);
        let vendors = registry(Vendor::VendorA, ScriptedAdapter::always_succeed(ok(100, 200)));
        let pipeline = ConversationPipeline::new(
            store.clone(),
            vendors,
            PricingTable::with_defaults(),
            RetryPolicy::default(),
            PipelineConfig::default(),
        );

        let first = pipeline
            .send(tenant, session_id, "K5", "hello".into(), "req-5".into())
            .await
            .unwrap();
        let second = pipeline
            .send(tenant, session_id, "K5", "world".into(), "req-5b".into())
            .await
            .unwrap();

        assert!(!first.metadata.idempotency.replayed);
        assert!(second.metadata.idempotency.replayed);
        assert_eq!(first.message.content, second.message.content);
        assert_eq!(first.metadata.request_id, second.metadata.request_id);

        let messages = store.list_session_messages_ascending(tenant, session_id).await;
        assert_eq!(messages.len(), 2, "replay must not append new messages");
    }

    #[tokio::test(start_paused = true)]
    async fn missing_idempotency_key_writes_nothing() {
        let (store, tenant, session_id, _) = setup(Vendor::VendorA, FallbackVendor::None);
        let vendors = registry(Vendor::VendorA, ScriptedAdapter::always_succeed(ok(1, 1)));
        let pipeline = ConversationPipeline::new(
            store.clone(),
            vendors,
            PricingTable::with_defaults(),
            RetryPolicy::default(),
            PipelineConfig::default(),
        );

        let err = pipeline
            .send(tenant, session_id, "", "hello".into(), "req-7".into())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            SendError::Gateway(GatewayError::IdempotencyKeyRequired)
        ));
        assert!(store.list_session_messages_ascending(tenant, session_id).await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn session_not_found_leaves_idempotency_record_incomplete() {
        let store = Arc::new(InMemoryStore::new());
        let tenant = TenantId::new();
        let vendors = registry(Vendor::VendorA, ScriptedAdapter::always_succeed(ok(1, 1)));
        let pipeline = ConversationPipeline::new(
            store.clone(),
            vendors,
            PricingTable::with_defaults(),
            RetryPolicy::default(),
            PipelineConfig::default(),
        );

        let err = pipeline
            .send(tenant, SessionId::new(), "K8", "hello".into(), "req-8".into())
            .await
            .unwrap_err();

        assert!(matches!(err, SendError::Gateway(GatewayError::SessionNotFound)));

        use gateway_store::TenantScopedStore;
        let record = store
            .idempotency_lookup(tenant, idempotency::SEND_MESSAGE_SCOPE, "K8")
            .await
            .expect("placeholder should exist");
        assert!(record.response.is_none());
    }
}
