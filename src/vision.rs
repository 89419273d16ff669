//! Chat-completions client for the hosted vision/language model.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_MAX_TOKENS: u32 = 1000;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Model API error {0}: {1}")]
    Api(u16, String),

    #[error("Unexpected model response: {0}")]
    Parse(String),

    #[error("Model returned no text")]
    EmptyResponse,
}

/// Fixed sampling parameters for every identification request.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Also send the image as an `image_url` content part.
    pub attach_image: bool,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            attach_image: true,
        }
    }
}

#[async_trait]
pub trait PlantModel: Send + Sync {
    /// Send `prompt` about the image at `image_url`, return the raw text reply.
    async fn complete(&self, prompt: &str, image_url: &str) -> Result<String, ModelError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

pub struct OpenAiClient {
    http_client: reqwest::Client,
    endpoint: String,
    api_key: String,
    settings: ModelSettings,
}

impl OpenAiClient {
    pub fn new(
        base_url: &str,
        api_key: String,
        settings: ModelSettings,
        timeout: Duration,
    ) -> Result<Self, ModelError> {
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http_client,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key,
            settings,
        })
    }

    pub fn settings(&self) -> &ModelSettings {
        &self.settings
    }

    fn user_content(&self, prompt: &str, image_url: &str) -> serde_json::Value {
        if self.settings.attach_image {
            serde_json::json!([
                { "type": "text", "text": prompt },
                { "type": "image_url", "image_url": { "url": image_url } }
            ])
        } else {
            serde_json::Value::String(prompt.to_string())
        }
    }
}

#[async_trait]
impl PlantModel for OpenAiClient {
    async fn complete(&self, prompt: &str, image_url: &str) -> Result<String, ModelError> {
        let request = ChatRequest {
            model: &self.settings.model,
            messages: vec![ChatMessage {
                role: "user",
                content: self.user_content(prompt, image_url),
            }],
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
        };

        tracing::debug!(model = %self.settings.model, %image_url, "Sending identification request");

        let response = self
            .http_client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ModelError::Api(status.as_u16(), body));
        }

        let parsed: ChatResponse =
            serde_json::from_str(&body).map_err(|e| ModelError::Parse(e.to_string()))?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or(ModelError::EmptyResponse)?;

        tracing::debug!(chars = text.len(), "Model replied");
        Ok(text)
    }
}
