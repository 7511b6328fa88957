//! Shared HTTP plumbing for the two concrete adapters. Both vendors speak a
//! chat-completion-shaped JSON wire format; the only behavioral difference
//! between them is that vendorB communicates rate-limit holds via a
//! `Retry-After` header, which vendorA's wire shape never sends.

use crate::adapter::{NormalizedRequest, NormalizedResponse, VendorFailure};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub(crate) struct HttpAdapterConfig {
    pub base_url: String,
    pub api_key: String,
    /// Whether to parse a `Retry-After` response header into
    /// `VendorFailure::retry_after` on a 429.
    pub honor_retry_after_header: bool,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct WireRequest<'a> {
    system_prompt: &'a str,
    messages: Vec<WireMessage<'a>>,
    tools: &'a [String],
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    text: String,
    tokens_in: u64,
    tokens_out: u64,
}

#[derive(Debug, Deserialize)]
struct WireError {
    code: String,
    message: String,
}

pub(crate) async fn call_vendor(
    client: &reqwest::Client,
    config: &HttpAdapterConfig,
    request: &NormalizedRequest,
) -> Result<NormalizedResponse, VendorFailure> {
    let wire = WireRequest {
        system_prompt: &request.system_prompt,
        messages: request
            .messages
            .iter()
            .map(|m| WireMessage {
                role: match m.role {
                    gateway_core::entities::Role::User => "user",
                    gateway_core::entities::Role::Assistant => "assistant",
                },
                content: &m.content,
            })
            .collect(),
        tools: &request.enabled_tools,
    };

    let started = Instant::now();
    let response = client
        .post(format!("{}/v1/chat", config.base_url))
        .bearer_auth(&config.api_key)
        .json(&wire)
        .send()
        .await;

    let response = match response {
        Ok(r) => r,
        Err(e) if e.is_timeout() => return Err(VendorFailure::timeout()),
        Err(e) => return Err(VendorFailure::unknown(e.to_string())),
    };

    let status = response.status();
    let latency_ms = started.elapsed().as_millis() as u64;

    if status.is_success() {
        let body: WireResponse = response
            .json()
            .await
            .map_err(|e| VendorFailure::unknown(e.to_string()))?;
        return Ok(NormalizedResponse {
            text: body.text,
            tokens_in: body.tokens_in,
            tokens_out: body.tokens_out,
            latency_ms,
        });
    }

    let retry_after = if config.honor_retry_after_header && status.as_u16() == 429 {
        response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs)
    } else {
        None
    };

    let status_code = status.as_u16();
    let body: Option<WireError> = response.json().await.ok();
    let (error_code, message) = match body {
        Some(e) => (e.code, e.message),
        None => (classify_unlabeled(status_code), status.to_string()),
    };

    Err(VendorFailure {
        status_code,
        error_code,
        message,
        retry_after,
    })
}

/// A status alone tells you the error class even without a vendor-supplied
/// `errorCode`.
fn classify_unlabeled(status_code: u16) -> String {
    match status_code {
        429 => "RATE_LIMITED".to_string(),
        500..=599 => "SERVER_ERROR".to_string(),
        _ => "CLIENT_ERROR".to_string(),
    }
}
