//! Newtype identifiers for every tenant-owned entity.
//!
//! Each id wraps a [`Uuid`] rather than a bare string so that the compiler
//! rejects passing a `SessionId` where an `AgentId` is expected, the same
//! discipline the data model of the gateway relies on to keep tenant-scoped
//! lookups honest.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! newtype_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generates a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }
    };
}

newtype_id!(TenantId);
newtype_id!(CredentialId);
newtype_id!(AgentId);
newtype_id!(SessionId);
newtype_id!(MessageId);
newtype_id!(AttemptId);
newtype_id!(UsageEventId);
