//! Credential lookup, backed by a unique index on the hashed credential.
//! Kept separate from [`crate::TenantScopedStore`] because a credential
//! resolves to a tenant *before* any tenant-scoped operation can run —
//! there is no tenant to scope the lookup by yet.

use gateway_core::ids::TenantId;

/// Resolves a hashed credential to its owning tenant. The plaintext secret
/// never reaches this trait; callers hash it first.
#[async_trait::async_trait]
pub trait CredentialStore: Send + Sync {
    async fn resolve(&self, credential_hash: &str) -> Option<TenantId>;

    /// Best-effort "last used at" bump; it must not block the request, so
    /// implementations may silently drop failures.
    async fn touch_last_used(&self, credential_hash: &str);
}
