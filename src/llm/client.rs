//! LLM provider capability
//!
//! Every backend implements [`LlmProvider`]. The pipeline only ever holds an
//! `Arc<dyn LlmProvider>` built by [`crate::llm::factory::create_provider`],
//! so backends are swappable from configuration and fakeable in tests.

use crate::core::error::LlmError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Token accounting reported by the backend, when it reports any
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

/// Raw text produced by one successful generate call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmResponse {
    pub raw_text: String,
    pub model_id: String,
    pub usage: Option<TokenUsage>,
}

#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send a fully formatted prompt, return the model's text
    ///
    /// Implementations make exactly one network attempt; retries and
    /// deadlines belong to [`crate::llm::gateway::LlmGateway`].
    async fn generate(&self, prompt: &str) -> Result<LlmResponse, LlmError>;

    /// Cheap reachability probe
    async fn validate_connection(&self) -> bool;

    /// Model identifier used for requests
    fn model(&self) -> &str;
}

/// Turn a non-success HTTP response into a classified error
pub(crate) async fn status_error(response: reqwest::Response) -> LlmError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    LlmError::from_status(status, &body)
}
