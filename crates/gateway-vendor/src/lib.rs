//! Vendor adapter capability: translates a normalized request to a specific
//! vendor's wire shape and normalizes its success/error shapes so the rest
//! of the pipeline never branches on which vendor answered.

mod adapter;
mod http_shared;
mod registry;
mod scripted;
mod vendor_a;
mod vendor_b;

pub use adapter::{NormalizedMessage, NormalizedRequest, NormalizedResponse, VendorAdapter, VendorFailure};
pub use registry::VendorRegistry;
pub use scripted::{ScriptedAdapter, ScriptedOutcome};
pub use vendor_a::VendorAAdapter;
pub use vendor_b::VendorBAdapter;
