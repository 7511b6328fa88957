//! `vendorB`: the baseline adapter with rate-limit responses — it
//! communicates `retryAfterMs` via a `Retry-After` header on 429s, which
//! `vendorA`'s wire shape never sends.

use crate::adapter::{NormalizedRequest, NormalizedResponse, VendorAdapter, VendorFailure};
use crate::http_shared::{call_vendor, HttpAdapterConfig};

pub struct VendorBAdapter {
    client: reqwest::Client,
    config: HttpAdapterConfig,
}

impl VendorBAdapter {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            config: HttpAdapterConfig {
                base_url: base_url.into(),
                api_key: api_key.into(),
                honor_retry_after_header: true,
            },
        }
    }
}

#[async_trait::async_trait]
impl VendorAdapter for VendorBAdapter {
    async fn call(&self, request: &NormalizedRequest) -> Result<NormalizedResponse, VendorFailure> {
        #[cfg(feature = "tracing")]
        tracing::debug!(vendor = "vendorB", "issuing vendor call");
        call_vendor(&self.client, &self.config, request).await
    }
}
