//! Mock provider for development and tests.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use uuid::Uuid;

use vibegate_core::{
    traits::UpstreamClient,
    types::{ChatMessage, Choice, CompletionRequest, CompletionResponse, TokenUsage},
    Result,
};

/// Echoes the sanitized content back with fixed token usage.
pub struct MockUpstream {
    latency: Duration,
    calls: AtomicUsize,
}

impl MockUpstream {
    /// Create a mock with a simulated network delay.
    pub fn new() -> Self {
        Self {
            latency: Duration::from_millis(500),
            calls: AtomicUsize::new(0),
        }
    }

    /// Create a mock that responds immediately.
    pub fn instant() -> Self {
        Self {
            latency: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of completions served.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockUpstream {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UpstreamClient for MockUpstream {
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.calls.fetch_add(1, Ordering::SeqCst);

        let echo = request.last_content().unwrap_or("");

        Ok(CompletionResponse {
            id: format!("chatcmpl-{}", Uuid::new_v4()),
            object: "chat.completion".to_string(),
            created: Utc::now().timestamp(),
            model: request.model.clone(),
            choices: vec![Choice {
                index: 0,
                message: ChatMessage::new(
                    "assistant",
                    format!("[vibegate mock] received sanitized: '{echo}'"),
                ),
                finish_reason: "stop".to_string(),
            }],
            usage: TokenUsage {
                prompt_tokens: 10,
                completion_tokens: 20,
                total_tokens: 30,
            },
        })
    }
}
