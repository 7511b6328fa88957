//! Wires the storage layer together with the rest of the gateway: the
//! identity gate, the idempotency protocol, the response envelope wire
//! shape, and the conversation pipeline that composes all of it into
//! `send`.

mod auth;
mod envelope;
mod idempotency;
mod pipeline;

pub use auth::{hash_credential, AuthGate};
pub use envelope::{
    AttemptSummary, IdempotencyMetadata, MessageEnvelope, PricingSummary, ResponseMetadata,
    SendResponseEnvelope, UsageSummary,
};
pub use idempotency::SEND_MESSAGE_SCOPE;
pub use pipeline::{ConversationPipeline, PipelineConfig, SendError};
