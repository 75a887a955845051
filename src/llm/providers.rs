use super::interfaces::{ReviewRequest, ReviewResponse, ReviewService};
use crate::config::ReviewServiceSettings;
use crate::error::{Result, ValidationError};
use async_trait::async_trait;
use reqwest::{header, Client};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// HTTP client for an OpenAI-compatible chat completion endpoint.
///
/// One POST per call, no retry and no pooling beyond what reqwest does internally.
pub struct HttpReviewClient {
    client: Client,
    api_key: String,
    endpoint_url: String,
    model: String,
    system_prompt: String,
}

impl HttpReviewClient {
    pub fn new(
        settings: &ReviewServiceSettings,
        api_key: String,
        system_prompt: impl Into<String>,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(settings.request_timeout())
            .build()
            .map_err(|e| ValidationError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            endpoint_url: settings.endpoint_url(),
            model: settings.model.clone(),
            system_prompt: system_prompt.into(),
        })
    }

    /// Build from settings, resolving the credential from the environment
    pub fn from_settings(
        settings: &ReviewServiceSettings,
        system_prompt: impl Into<String>,
    ) -> Result<Self> {
        let api_key = settings.resolve_api_key()?;
        Self::new(settings, api_key, system_prompt)
    }

    pub fn endpoint_url(&self) -> &str {
        &self.endpoint_url
    }
}

#[async_trait]
impl ReviewService for HttpReviewClient {
    async fn review(&self, prompt: &str) -> Result<String> {
        let request = ReviewRequest::new(&self.system_prompt, prompt, &self.model);

        let response = self
            .client
            .post(&self.endpoint_url)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| ValidationError::Transport(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ValidationError::Transport(e.to_string()))?;

        debug!("Review service answered with status {}", status);

        if !status.is_success() {
            return Err(ValidationError::Protocol(format!(
                "review service returned {}: {}",
                status, text
            )));
        }

        ReviewResponse::parse_content(&text)
    }
}

/// Run one review call under a per-call timeout and the run-wide cancellation token.
/// Expiry and cancellation both surface as transport errors.
pub async fn call_with_deadline(
    service: &dyn ReviewService,
    prompt: &str,
    timeout: Duration,
    cancellation: &CancellationToken,
) -> Result<String> {
    if cancellation.is_cancelled() {
        return Err(ValidationError::Transport(
            "run cancelled before request was sent".to_string(),
        ));
    }

    tokio::select! {
        _ = cancellation.cancelled() => Err(ValidationError::Transport(
            "run cancelled while waiting for the review service".to_string(),
        )),
        outcome = tokio::time::timeout(timeout, service.review(prompt)) => match outcome {
            Ok(result) => result,
            Err(_) => Err(ValidationError::Transport(format!(
                "request timed out after {}s",
                timeout.as_secs_f64()
            ))),
        },
    }
}
