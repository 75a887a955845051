use crate::error::{Result, ValidationError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Message in a review request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
}

/// Request body sent to the review service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRequest {
    pub messages: Vec<Message>,
    pub model: String,
    pub stream: bool,
    pub temperature: u8,
}

impl ReviewRequest {
    /// Fixed-shape request: one system instruction, one user prompt, no streaming,
    /// deterministic sampling.
    pub fn new(system_prompt: &str, user_prompt: &str, model: &str) -> Self {
        Self {
            messages: vec![
                Message {
                    role: MessageRole::System,
                    content: system_prompt.to_string(),
                },
                Message {
                    role: MessageRole::User,
                    content: user_prompt.to_string(),
                },
            ],
            model: model.to_string(),
            stream: false,
            temperature: 0,
        }
    }
}

/// Response body returned by the review service; only the first choice is read
#[derive(Debug, Clone, Deserialize)]
pub struct ReviewResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    pub message: Option<ChoiceMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChoiceMessage {
    pub content: Option<String>,
}

impl ReviewResponse {
    /// Parse a raw body and extract `choices[0].message.content`
    pub fn parse_content(body: &str) -> Result<String> {
        let response: ReviewResponse = serde_json::from_str(body)?;
        response.into_content()
    }

    pub fn into_content(self) -> Result<String> {
        self.choices
            .into_iter()
            .next()
            .ok_or_else(|| ValidationError::Protocol("response has no choices".to_string()))?
            .message
            .and_then(|message| message.content)
            .ok_or_else(|| {
                ValidationError::Protocol("first choice has no message content".to_string())
            })
    }
}

/// A remote reviewer that answers one prompt per call
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReviewService: Send + Sync {
    /// Send a single prompt and return the reviewer's text
    async fn review(&self, prompt: &str) -> Result<String>;
}
