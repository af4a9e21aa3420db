//! Hosted chat-completion APIs (OpenAI and compatible endpoints)

use crate::core::config::OpenAiConfig;
use crate::core::error::{LlmError, LlmErrorKind};
use crate::llm::client::{status_error, LlmProvider, LlmResponse, TokenUsage};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// System turn sent ahead of the formatted prompt
const SYSTEM_ROLE: &str =
    "You are an issue tracker assistant. Reply with the requested JSON and nothing else.";

const MAX_TOKENS: u32 = 4096;

pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    api_url: String,
    model: String,
}

impl OpenAiProvider {
    pub fn new(config: &OpenAiConfig) -> Result<Self, LlmError> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| LlmError::config("OpenAI API key not configured"))?;
        if config.model.trim().is_empty() {
            return Err(LlmError::config("OpenAI model not specified"));
        }
        Ok(Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            api_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn generate(&self, prompt: &str) -> Result<LlmResponse, LlmError> {
        let request = ChatRequest {
            model: &self.model,
            max_tokens: MAX_TOKENS,
            temperature: 0.0,
            messages: vec![
                Message {
                    role: "system",
                    content: SYSTEM_ROLE,
                },
                Message {
                    role: "user",
                    content: prompt,
                },
            ],
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.api_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(LlmError::from_reqwest)?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        let completion: ChatResponse = response.json().await.map_err(LlmError::from_reqwest)?;
        completion.into_response(&self.model)
    }

    async fn validate_connection(&self) -> bool {
        match self
            .client
            .get(format!("{}/models", self.api_url))
            .bearer_auth(&self.api_key)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::error!("OpenAI connection validation failed: {}", e);
                false
            }
        }
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    model: Option<String>,
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    // null when the model refuses or only emits tool calls
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

impl ChatResponse {
    fn into_response(self, fallback_model: &str) -> Result<LlmResponse, LlmError> {
        let choice = self.choices.into_iter().next().ok_or_else(|| {
            LlmError::new(LlmErrorKind::InvalidResponse, "Completion has no choices")
        })?;
        Ok(LlmResponse {
            raw_text: choice.message.content.unwrap_or_default(),
            model_id: self.model.unwrap_or_else(|| fallback_model.to_string()),
            usage: self.usage.map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
            }),
        })
    }
}
