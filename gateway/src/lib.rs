//! The top-level gateway crate: re-exports the public surface of
//! `gateway-core`/`gateway-store`/`gateway-vendor`/`gateway-pipeline`, and
//! [`build_pipeline`], the one function that wires the storage layer, vendor
//! registry, pricing, and retry policy together into a runnable
//! [`gateway_pipeline::ConversationPipeline`].
//!
//! Nothing here reintroduces an HTTP transport or management plane:
//! `gatewayctl` (the `[[bin]]` this crate ships) seeds an in-memory store
//! directly rather than fronting this with a server.

pub mod config;
pub mod logging;

pub use config::{CliArgs, ConfigError, FileConfig, GatewayConfig};
pub use gateway_core::entities::{
    Agent, AttemptLogEntry, AttemptOutcome, Credential, FallbackVendor, IdempotencyRecord, Message,
    Role, Session, SessionStatus, Tenant, UsageEvent, Vendor,
};
pub use gateway_core::error::{ErrorCode, ErrorEnvelope, GatewayError};
pub use gateway_core::ids::{AgentId, AttemptId, CredentialId, MessageId, SessionId, TenantId, UsageEventId};
pub use gateway_pipeline::{
    hash_credential, AuthGate, ConversationPipeline, MessageEnvelope, PipelineConfig,
    ResponseMetadata, SendError, SendResponseEnvelope,
};
pub use gateway_store::{CredentialStore, InMemoryStore, TenantScopedStore};
pub use gateway_vendor::{
    NormalizedMessage, NormalizedRequest, NormalizedResponse, VendorAAdapter, VendorAdapter,
    VendorBAdapter, VendorFailure, VendorRegistry,
};

use std::sync::Arc;

/// Builds a [`VendorRegistry`] with the two baseline HTTP adapters
/// registered under their well-known keys, pointed at the given base
/// URLs/API keys. A test double (`gateway_vendor::ScriptedAdapter`) is
/// registered directly by callers that don't want live HTTP.
pub fn http_vendor_registry(
    vendor_a_base_url: impl Into<String>,
    vendor_a_api_key: impl Into<String>,
    vendor_b_base_url: impl Into<String>,
    vendor_b_api_key: impl Into<String>,
) -> VendorRegistry {
    let mut registry = VendorRegistry::new();
    registry.register(
        Vendor::VendorA,
        Arc::new(VendorAAdapter::new(vendor_a_base_url, vendor_a_api_key)),
    );
    registry.register(
        Vendor::VendorB,
        Arc::new(VendorBAdapter::new(vendor_b_base_url, vendor_b_api_key)),
    );
    registry
}

/// Wires the tenant-scoped store, the vendor registry, the pricing table,
/// and the retry policy of `config` together into a [`ConversationPipeline`].
pub fn build_pipeline(
    store: Arc<dyn TenantScopedStore>,
    vendors: VendorRegistry,
    config: &GatewayConfig,
) -> ConversationPipeline {
    ConversationPipeline::new(
        store,
        vendors,
        config.pricing.clone(),
        config.retry_policy,
        PipelineConfig {
            fail_on_fingerprint_mismatch: config.fail_on_fingerprint_mismatch,
        },
    )
}
