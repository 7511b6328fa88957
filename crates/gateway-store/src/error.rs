//! Store-level failures. These bubble up as an internal error and abort the
//! send; partially written rows remain in place.

#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    /// `recordUsage` fails loudly on a duplicate `(requestId)` rather than
    /// silently overwriting or double-counting it.
    #[error("a usage event already exists for request id {0}")]
    DuplicateRequestId(String),
}
