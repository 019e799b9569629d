// SPDX-FileCopyrightText: 2026 AutoSpares Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock LLM provider adapter for deterministic testing.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use autospares_core::traits::adapter::PluginAdapter;
use autospares_core::traits::provider::ProviderAdapter;
use autospares_core::types::{
    AdapterType, HealthStatus, ProviderRequest, ProviderResponse, TurnPart,
};
use autospares_core::StoreError;

/// A scripted response: a reply or a provider failure.
type Scripted = Result<ProviderResponse, String>;

/// A mock LLM provider that returns pre-configured responses.
///
/// Responses are popped from a FIFO queue. When the queue is empty,
/// a default "mock response" text is returned.
pub struct MockProvider {
    responses: Arc<Mutex<VecDeque<Scripted>>>,
    requests: Arc<Mutex<Vec<ProviderRequest>>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a mock provider pre-loaded with text replies.
    pub fn with_responses(texts: Vec<String>) -> Self {
        let queue = texts.into_iter().map(|t| Ok(text_response(&t))).collect();
        Self {
            responses: Arc::new(Mutex::new(queue)),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub async fn push_response(&self, response: ProviderResponse) {
        self.responses.lock().await.push_back(Ok(response));
    }

    pub async fn push_text(&self, text: &str) {
        self.push_response(text_response(text)).await;
    }

    /// Queue a failure; the matching `complete` call returns a provider error.
    pub async fn push_error(&self, message: &str) {
        self.responses.lock().await.push_back(Err(message.to_string()));
    }

    /// Every request received so far, in order.
    pub async fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().await.clone()
    }

    async fn next_response(&self) -> Scripted {
        self.responses
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Ok(text_response("mock response")))
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

/// A response holding a single text part.
pub fn text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        parts: vec![TurnPart::text(text)],
        finish_reason: Some("STOP".to_string()),
    }
}

/// A response asking for one function call.
pub fn function_call(name: &str, args: serde_json::Value) -> ProviderResponse {
    ProviderResponse {
        parts: vec![TurnPart::FunctionCall {
            name: name.to_string(),
            args,
        }],
        finish_reason: Some("STOP".to_string()),
    }
}

#[async_trait]
impl PluginAdapter for MockProvider {
    fn name(&self) -> &str {
        "mock-provider"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, StoreError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[async_trait]
impl ProviderAdapter for MockProvider {
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, StoreError> {
        self.requests.lock().await.push(request);
        self.next_response()
            .await
            .map_err(|message| StoreError::Provider {
                message,
                source: None,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fifo_then_default() {
        let provider = MockProvider::with_responses(vec!["first".into()]);
        provider.push_error("boom").await;

        let first = provider.complete(ProviderRequest::default()).await.unwrap();
        assert_eq!(first.text().as_deref(), Some("first"));
        assert!(provider.complete(ProviderRequest::default()).await.is_err());
        let fallback = provider.complete(ProviderRequest::default()).await.unwrap();
        assert_eq!(fallback.text().as_deref(), Some("mock response"));
        assert_eq!(provider.requests().await.len(), 3);
    }

    #[test]
    fn function_call_helper() {
        let response = function_call("get_cart_status", serde_json::json!({}));
        assert!(response.text().is_none());
        assert_eq!(response.function_calls()[0].name, "get_cart_status");
    }
}
