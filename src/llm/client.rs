//! Chat completions client

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::ModelConfig;

/// Model API errors
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("TOGETHER_API_KEY is not configured")]
    NotConfigured,

    #[error("{0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status; message is the provider's own when it sent one
    #[error("{message} (status {status})")]
    Api { status: u16, message: String },

    #[error("Unexpected response: {0}")]
    InvalidResponse(String),
}

/// A chat message; `content` is either a string or a list of parts
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: serde_json::Value,
}

impl ChatMessage {
    pub fn system(text: &str) -> Self {
        Self {
            role: "system",
            content: serde_json::Value::String(text.to_string()),
        }
    }

    pub fn user(text: &str) -> Self {
        Self {
            role: "user",
            content: serde_json::Value::String(text.to_string()),
        }
    }

    pub fn user_with_image(text: &str, image_url: &str) -> Self {
        Self {
            role: "user",
            content: serde_json::json!([
                { "type": "text", "text": text },
                { "type": "image_url", "image_url": { "url": image_url } }
            ]),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ResponseFormat {
    #[serde(rename = "type")]
    pub kind: &'static str,
}

/// Chat completion request body
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
}

impl ChatRequest {
    pub fn new(model: &str, messages: Vec<ChatMessage>, max_tokens: u32) -> Self {
        Self {
            model: model.to_string(),
            messages,
            max_tokens,
            temperature: 0.0,
            response_format: None,
        }
    }

    pub fn json_only(mut self) -> Self {
        self.response_format = Some(ResponseFormat { kind: "json_object" });
        self
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ChatResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

/// Client for an OpenAI-compatible chat completions endpoint
#[derive(Clone)]
pub struct ChatClient {
    http: Client,
    api_url: String,
    api_key: Option<String>,
}

impl ChatClient {
    pub fn new(config: &ModelConfig) -> Result<Self, LlmError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Run a completion and return the first choice's content, if any
    pub async fn complete(&self, request: &ChatRequest) -> Result<Option<String>, LlmError> {
        let api_key = self.api_key.as_deref().ok_or(LlmError::NotConfigured)?;

        tracing::debug!(model = %request.model, api_url = %self.api_url, "Calling chat completions");

        let response = self
            .http
            .post(&self.api_url)
            .bearer_auth(api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                message: upstream_message(&body)
                    .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string()),
            });
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        Ok(body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .filter(|content| !content.trim().is_empty()))
    }
}

/// Pull `error.message` (or a bare `error` string) out of an error body
fn upstream_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    match &value["error"] {
        serde_json::Value::String(message) => Some(message.clone()),
        error => error["message"].as_str().map(str::to_string),
    }
}
