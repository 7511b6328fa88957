//! Tenant-scoped store capability: every read and write accepts a
//! `tenantId` and returns results only for that tenant. This crate defines
//! the capability as a trait (so the pipeline in `gateway-pipeline` can be
//! tested against a double) plus the in-memory implementation used by tests
//! and the `gatewayctl` demonstration binary. A production deployment swaps
//! in a different implementor of the same traits; nothing above this crate
//! changes.

mod credential;
mod error;
mod memory;
mod trait_def;

pub use credential::CredentialStore;
pub use error::StoreError;
pub use memory::InMemoryStore;
pub use trait_def::{IdempotencyInsertOutcome, TenantScopedStore};
