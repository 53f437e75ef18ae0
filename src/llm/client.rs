//! LLM client trait and a scripted client for tests

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::{Result, SleuthError};
use crate::llm::types::{CompletionRequest, CompletionResponse};

/// Stateless LLM client. Each call carries the full transcript.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Single completion request (blocking until complete)
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;

    /// Model identifier used when the request does not name one
    fn model(&self) -> &str;
}

/// Client that replays scripted responses and records every request.
///
/// Once the script is down to its last response, that response repeats.
#[derive(Clone, Default)]
pub struct MockLlmClient {
    script: Arc<Mutex<VecDeque<Result<CompletionResponse>>>>,
    last: Arc<Mutex<Option<CompletionResponse>>>,
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl MockLlmClient {
    pub fn new<I>(responses: I) -> Self
    where
        I: IntoIterator<Item = CompletionResponse>,
    {
        let client = Self::default();
        if let Ok(mut script) = client.script.lock() {
            script.extend(responses.into_iter().map(Ok));
        }
        client
    }

    /// Queue a backend failure
    pub fn then_fail(self, message: &str) -> Self {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(Err(SleuthError::Backend(message.to_string())));
        }
        self
    }

    /// Every request received so far
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }

        let next = self.script.lock().ok().and_then(|mut s| s.pop_front());
        let mut last = self
            .last
            .lock()
            .map_err(|_| SleuthError::Backend("mock client poisoned".to_string()))?;
        match next {
            Some(Ok(response)) => {
                *last = Some(response.clone());
                Ok(response)
            }
            Some(Err(e)) => Err(e),
            None => last
                .clone()
                .ok_or_else(|| SleuthError::Backend("mock client has no scripted responses".to_string())),
        }
    }

    fn model(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::types::{Message, ToolCall};
    use serde_json::json;

    fn request() -> CompletionRequest {
        CompletionRequest::new(vec![Message::user("why?")])
    }

    #[tokio::test]
    async fn test_replays_in_order_then_repeats_last() {
        let call = ToolCall::new("c1", "run_debug_cmd", json!({"cmd": "bt"}));
        let client = MockLlmClient::new([CompletionResponse::text("first"), CompletionResponse::tools("", vec![call])]);

        assert_eq!(client.complete(request()).await.unwrap().content, "first");
        for _ in 0..3 {
            let resp = client.complete(request()).await.unwrap();
            assert_eq!(resp.tool_calls.len(), 1);
        }
        assert_eq!(client.call_count(), 4);
    }

    #[tokio::test]
    async fn test_records_requests() {
        let client = MockLlmClient::new([CompletionResponse::text("ok")]);
        client.complete(request()).await.unwrap();
        assert_eq!(client.requests()[0].messages[0].content, "why?");
    }

    #[tokio::test]
    async fn test_scripted_failure() {
        let client = MockLlmClient::default().then_fail("401 unauthorized");
        let err = client.complete(request()).await.unwrap_err();
        assert!(matches!(err, SleuthError::Backend(msg) if msg.contains("401")));
    }

    #[tokio::test]
    async fn test_empty_script_is_backend_error() {
        let client = MockLlmClient::default();
        assert!(matches!(client.complete(request()).await, Err(SleuthError::Backend(_))));
    }

    #[test]
    fn test_trait_object() {
        let client: Box<dyn LlmClient> = Box::new(MockLlmClient::default());
        assert_eq!(client.model(), "mock");
    }
}
