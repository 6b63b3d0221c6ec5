use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::error::AppError;

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Returns the text of the first reply choice.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, AppError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI-compatible `/chat/completions` client.
pub struct OpenAiClient {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(api_key: &str, model: &str, base_url: &str, client: reqwest::Client) -> Self {
        Self {
            api_key: api_key.to_string(),
            model: model.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    pub fn from_config(config: &AppConfig, client: reqwest::Client) -> Result<Self, AppError> {
        let api_key = config
            .openai_api_key
            .as_deref()
            .ok_or_else(|| AppError::Auth("OPENAI_KEY is not configured".to_string()))?;
        Ok(Self::new(
            api_key,
            &config.openai_model,
            &config.openai_base_url,
            client,
        ))
    }

    pub fn model_id(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl CompletionService for OpenAiClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, AppError> {
        let endpoint = format!("{}/chat/completions", self.base_url);
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user,
                },
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let response = self
            .client
            .post(&endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Completion(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AppError::Completion(e.to_string()))?;
        tracing::debug!("completion response: status={status} chars={}", text.len());

        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(AppError::Auth(format!(
                "completion auth failed ({status}). Check OPENAI_KEY."
            )));
        }
        if !status.is_success() {
            return Err(AppError::Completion(format!("error {status}: {text}")));
        }

        let parsed: ChatResponse = serde_json::from_str(&text)
            .map_err(|e| AppError::Completion(format!("response parse failed: {e}")))?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .ok_or_else(|| {
                AppError::Completion("missing choices[0].message.content".to_string())
            })
    }
}
