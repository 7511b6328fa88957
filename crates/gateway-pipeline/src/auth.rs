//! Identity + auth gate: resolves an opaque credential string to a tenant.
//! Credentials are never compared in plaintext; only their hash is looked
//! up.

use gateway_core::error::GatewayError;
use gateway_core::ids::TenantId;
use gateway_store::CredentialStore;
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// Hashes a plaintext credential the same way credential issuance (outside
/// this crate) is assumed to have hashed it at rest.
pub fn hash_credential(secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Resolves a credential to its tenant and injects it into the context
/// consumed by the store and the conversation pipeline. Bumping "last used
/// at" is spawned off the request path so it never blocks resolution —
/// that update is best-effort and must not slow down the send.
pub struct AuthGate<C: CredentialStore + 'static> {
    credentials: Arc<C>,
}

impl<C: CredentialStore + 'static> AuthGate<C> {
    pub fn new(credentials: Arc<C>) -> Self {
        Self { credentials }
    }

    pub async fn resolve(&self, credential: &str) -> Result<TenantId, GatewayError> {
        let hash = hash_credential(credential);
        let tenant = self
            .credentials
            .resolve(&hash)
            .await
            .ok_or(GatewayError::InvalidApiKey)?;

        let credentials = self.credentials.clone();
        tokio::spawn(async move {
            credentials.touch_last_used(&hash).await;
        });

        Ok(tenant)
    }
}
