//! `ScriptedAdapter`: an in-memory `VendorAdapter` test double used to drive
//! retry/fallback scenarios in tests without a network.

use crate::adapter::{NormalizedRequest, NormalizedResponse, VendorAdapter, VendorFailure};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// One scripted outcome for a single call.
#[derive(Debug, Clone)]
pub enum ScriptedOutcome {
    Success(NormalizedResponse),
    Failure(VendorFailure),
}

/// Replays a fixed script of outcomes, one per call, in order. Once the
/// script is exhausted the last outcome repeats, so a test can script "fail
/// twice then succeed" and let any trailing calls keep succeeding.
pub struct ScriptedAdapter {
    script: Vec<ScriptedOutcome>,
    calls: AtomicUsize,
    /// Records every request the pipeline assembled, so a test can assert
    /// on `enabled_tools`/history content without instrumenting the caller.
    seen: Mutex<Vec<NormalizedRequest>>,
}

impl ScriptedAdapter {
    pub fn new(script: Vec<ScriptedOutcome>) -> Self {
        assert!(!script.is_empty(), "a scripted adapter needs at least one outcome");
        Self {
            script,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn always_succeed(response: NormalizedResponse) -> Self {
        Self::new(vec![ScriptedOutcome::Success(response)])
    }

    pub fn always_fail() -> Self {
        Self::new(vec![ScriptedOutcome::Failure(VendorFailure::unknown(
            "scripted failure",
        ))])
    }

    pub fn fail_then_succeed(failure: VendorFailure, times: usize, success: NormalizedResponse) -> Self {
        let mut script = vec![ScriptedOutcome::Failure(failure); times];
        script.push(ScriptedOutcome::Success(success));
        Self::new(script)
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests_seen(&self) -> Vec<NormalizedRequest> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl VendorAdapter for ScriptedAdapter {
    async fn call(&self, request: &NormalizedRequest) -> Result<NormalizedResponse, VendorFailure> {
        let index = self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(request.clone());
        let slot = index.min(self.script.len() - 1);
        match &self.script[slot] {
            ScriptedOutcome::Success(response) => Ok(response.clone()),
            ScriptedOutcome::Failure(failure) => Err(failure.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req() -> NormalizedRequest {
        NormalizedRequest {
            system_prompt: "be helpful".into(),
            messages: vec![],
            enabled_tools: vec![],
        }
    }

    fn ok(tokens_in: u64, tokens_out: u64) -> NormalizedResponse {
        NormalizedResponse {
            text: "hi".into(),
            tokens_in,
            tokens_out,
            latency_ms: 5,
        }
    }

    #[tokio::test]
    async fn replays_script_in_order_then_repeats_last() {
        let adapter = ScriptedAdapter::new(vec![
            ScriptedOutcome::Failure(VendorFailure::unknown("first")),
            ScriptedOutcome::Success(ok(1, 1)),
        ]);
        assert!(adapter.call(&req()).await.is_err());
        assert!(adapter.call(&req()).await.is_ok());
        // script exhausted: repeats the last (success) outcome
        assert!(adapter.call(&req()).await.is_ok());
        assert_eq!(adapter.call_count(), 3);
    }

    #[tokio::test]
    async fn fail_then_succeed_helper() {
        let adapter = ScriptedAdapter::fail_then_succeed(
            VendorFailure {
                status_code: 503,
                error_code: "SERVER_ERROR".into(),
                message: "boom".into(),
                retry_after: None,
            },
            2,
            ok(100, 200),
        );
        assert!(adapter.call(&req()).await.is_err());
        assert!(adapter.call(&req()).await.is_err());
        let result = adapter.call(&req()).await.unwrap();
        assert_eq!(result.tokens_in, 100);
    }
}
