//! LLM client trait and a scripted client for tests

use std::collections::VecDeque;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::{Result, TriloopError};
use crate::llm::types::{CompletionRequest, CompletionResponse};

/// Stateless LLM client - each call carries the whole conversation
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;

    fn model(&self) -> &str;

    /// Whether the client has what it needs to make calls
    fn is_ready(&self) -> bool;
}

/// Replays scripted responses in order and records every request
pub struct MockLlmClient {
    responses: Mutex<VecDeque<CompletionResponse>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl MockLlmClient {
    pub fn new(responses: Vec<CompletionResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Requests received so far
    pub async fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().await.clone()
    }

    pub async fn remaining(&self) -> usize {
        self.responses.lock().await.len()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        self.requests.lock().await.push(request);
        self.responses
            .lock()
            .await
            .pop_front()
            .ok_or_else(|| TriloopError::Llm("mock client has no scripted response left".to_string()))
    }

    fn model(&self) -> &str {
        "mock"
    }

    fn is_ready(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_replays_in_order() {
        let client = MockLlmClient::new(vec![CompletionResponse::text("one"), CompletionResponse::text("two")]);

        let first = client.complete(CompletionRequest::new("sys")).await.unwrap();
        let second = client.complete(CompletionRequest::new("sys")).await.unwrap();

        assert_eq!(first.text_content(), "one");
        assert_eq!(second.text_content(), "two");
        assert_eq!(client.requests().await.len(), 2);
        assert_eq!(client.remaining().await, 0);
    }

    #[tokio::test]
    async fn test_mock_errors_when_exhausted() {
        let client = MockLlmClient::new(vec![]);
        let result = client.complete(CompletionRequest::new("sys")).await;
        assert!(matches!(result, Err(TriloopError::Llm(_))));
        assert!(client.is_ready());
    }
}
