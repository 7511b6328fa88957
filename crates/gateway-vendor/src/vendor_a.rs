//! `vendorA`: the baseline HTTP adapter.

use crate::adapter::{NormalizedRequest, NormalizedResponse, VendorAdapter, VendorFailure};
use crate::http_shared::{call_vendor, HttpAdapterConfig};

pub struct VendorAAdapter {
    client: reqwest::Client,
    config: HttpAdapterConfig,
}

impl VendorAAdapter {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            config: HttpAdapterConfig {
                base_url: base_url.into(),
                api_key: api_key.into(),
                honor_retry_after_header: false,
            },
        }
    }
}

#[async_trait::async_trait]
impl VendorAdapter for VendorAAdapter {
    async fn call(&self, request: &NormalizedRequest) -> Result<NormalizedResponse, VendorFailure> {
        #[cfg(feature = "tracing")]
        tracing::debug!(vendor = "vendorA", "issuing vendor call");
        call_vendor(&self.client, &self.config, request).await
    }
}
