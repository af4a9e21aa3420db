//! Locally hosted models served by Ollama

use crate::core::config::OllamaConfig;
use crate::core::error::{LlmError, LlmErrorKind};
use crate::llm::client::{status_error, LlmProvider, LlmResponse, TokenUsage};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

pub struct OllamaProvider {
    client: Client,
    base_url: String,
    model: String,
}

impl OllamaProvider {
    /// Create a provider, rejecting model names without a tag
    pub fn new(config: &OllamaConfig) -> Result<Self, LlmError> {
        if config.host.trim().is_empty() {
            return Err(LlmError::config("Ollama host not configured"));
        }
        if !config.model.contains(':') {
            return Err(LlmError::config(format!(
                "Invalid Ollama model '{}', expected name:tag",
                config.model
            )));
        }
        Ok(Self {
            client: Client::new(),
            base_url: config.base_url(),
            model: config.model.clone(),
        })
    }

    /// Check that the configured model has been pulled on the server
    pub async fn model_available(&self) -> Result<bool, LlmError> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await
            .map_err(LlmError::from_reqwest)?;
        if !response.status().is_success() {
            return Err(status_error(response).await);
        }
        let tags: TagsResponse = response.json().await.map_err(LlmError::from_reqwest)?;
        Ok(tags.contains(&self.model))
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    async fn generate(&self, prompt: &str) -> Result<LlmResponse, LlmError> {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
        };

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(LlmError::from_reqwest)?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        let body: GenerateResponse = response.json().await.map_err(LlmError::from_reqwest)?;
        body.into_response(&self.model)
    }

    async fn validate_connection(&self) -> bool {
        match self
            .client
            .get(format!("{}/api/version", self.base_url))
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => {}
            Ok(response) => {
                tracing::error!("Ollama version check returned HTTP {}", response.status());
                return false;
            }
            Err(e) => {
                tracing::error!("Ollama connection validation failed: {}", e);
                return false;
            }
        }

        // A reachable server without the model pulled cannot serve requests
        match self.model_available().await {
            Ok(true) => true,
            Ok(false) => {
                tracing::error!(model = %self.model, "Model not available on Ollama server");
                false
            }
            Err(e) => {
                tracing::error!("Ollama model lookup failed: {}", e);
                false
            }
        }
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: Option<String>,
    model: Option<String>,
    prompt_eval_count: Option<u32>,
    eval_count: Option<u32>,
}

impl GenerateResponse {
    fn into_response(self, fallback_model: &str) -> Result<LlmResponse, LlmError> {
        let raw_text = self.response.ok_or_else(|| {
            LlmError::new(
                LlmErrorKind::InvalidResponse,
                "Ollama reply is missing the 'response' field",
            )
        })?;
        let usage = match (self.prompt_eval_count, self.eval_count) {
            (Some(prompt_tokens), Some(completion_tokens)) => Some(TokenUsage {
                prompt_tokens,
                completion_tokens,
            }),
            _ => None,
        };
        Ok(LlmResponse {
            raw_text,
            model_id: self.model.unwrap_or_else(|| fallback_model.to_string()),
            usage,
        })
    }
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Deserialize)]
struct ModelTag {
    name: String,
}

impl TagsResponse {
    fn contains(&self, model: &str) -> bool {
        let wanted = model.to_lowercase();
        self.models.iter().any(|m| m.name.to_lowercase() == wanted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_creation() {
        let provider = OllamaProvider::new(&OllamaConfig::default()).unwrap();
        assert_eq!(provider.base_url, "http://localhost:11434");
        assert_eq!(provider.model(), "deepseek-r1:14b");
    }

    #[test]
    fn test_model_without_tag_rejected() {
        let config = OllamaConfig {
            model: "llama2".into(),
            ..OllamaConfig::default()
        };
        let err = OllamaProvider::new(&config).err().unwrap();
        assert_eq!(err.kind, LlmErrorKind::Config);
    }

    #[test]
    fn test_generate_response_with_usage() {
        let body: GenerateResponse = serde_json::from_str(
            r#"{"model":"deepseek-r1:14b","response":"<answer>{}</answer>","done":true,
                "prompt_eval_count":12,"eval_count":34}"#,
        )
        .unwrap();
        let response = body.into_response("fallback").unwrap();
        assert_eq!(response.raw_text, "<answer>{}</answer>");
        assert_eq!(response.model_id, "deepseek-r1:14b");
        assert_eq!(
            response.usage,
            Some(TokenUsage {
                prompt_tokens: 12,
                completion_tokens: 34
            })
        );
    }

    #[test]
    fn test_generate_response_missing_field() {
        let body: GenerateResponse = serde_json::from_str(r#"{"error":"model not found"}"#).unwrap();
        let err = body.into_response("m:1").unwrap_err();
        assert_eq!(err.kind, LlmErrorKind::InvalidResponse);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_tags_lookup_is_case_insensitive() {
        let tags: TagsResponse = serde_json::from_str(
            r#"{"models":[{"name":"DeepSeek-R1:14b"},{"name":"llama2:13b"}]}"#,
        )
        .unwrap();
        assert!(tags.contains("deepseek-r1:14b"));
        assert!(!tags.contains("mistral:7b"));
    }
}
