//! Shared types for the gateway core: the data model, the pricing function,
//! the public error taxonomy, and identifiers. Observability (the
//! attempt-level audit trail) is carried by `gateway-retry`'s
//! `AttemptObserver` rather than a separate event bus — see that crate for
//! the seam every other crate's instrumentation hangs off of.

pub mod entities;
pub mod error;
pub mod ids;
pub mod pricing;

pub use entities::{
    Agent, AttemptLogEntry, AttemptOutcome, Credential, FallbackVendor, IdempotencyRecord,
    Message, Role, Session, SessionStatus, Tenant, UsageEvent, Vendor,
};
pub use error::GatewayError;
pub use ids::{AgentId, AttemptId, CredentialId, MessageId, SessionId, TenantId, UsageEventId};
pub use pricing::PricingTable;
