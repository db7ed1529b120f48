//! OpenAI-compatible HTTP provider client.

use async_trait::async_trait;
use secrecy::{ExposeSecret, Secret};
use std::time::Duration;

use vibegate_core::{
    config::UpstreamConfig,
    error::UpstreamError,
    traits::UpstreamClient,
    types::{CompletionRequest, CompletionResponse},
    Error, Result,
};

/// Forwards sanitized requests to a `/chat/completions` endpoint.
///
/// The request timeout is a hard ceiling; the client does not retry
/// (retry policy belongs here if ever added, not in the pipeline).
pub struct OpenAiCompatClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<Secret<String>>,
}

impl OpenAiCompatClient {
    /// Build a client from configuration.
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl UpstreamClient for OpenAiCompatClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
        let url = format!("{}/chat/completions", self.base_url);

        let mut builder = self.http.post(&url).json(request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key.expose_secret());
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::Upstream(UpstreamError::Timeout)
            } else {
                Error::Upstream(UpstreamError::Unavailable(e.to_string()))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!(status = status.as_u16(), model = %request.model, "Upstream provider error");
            return Err(UpstreamError::Provider {
                status: status.as_u16(),
            }
            .into());
        }

        response.json::<CompletionResponse>().await.map_err(|e| {
            Error::Upstream(UpstreamError::Unavailable(format!(
                "malformed provider response: {}",
                e
            )))
        })
    }
}
