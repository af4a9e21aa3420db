//! The single door to the LLM backend
//!
//! Wraps a provider with a per-attempt deadline and a [`RetryPolicy`].
//! Nothing else in the crate talks to the model.

use crate::core::config::LlmConfig;
use crate::core::error::LlmError;
use crate::llm::client::{LlmProvider, LlmResponse};
use crate::llm::retry::RetryPolicy;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct LlmGateway {
    provider: Arc<dyn LlmProvider>,
    retry: RetryPolicy,
    timeout: Duration,
}

impl LlmGateway {
    pub fn new(provider: Arc<dyn LlmProvider>, retry: RetryPolicy, timeout: Duration) -> Self {
        Self {
            provider,
            retry,
            timeout,
        }
    }

    pub fn from_config(provider: Arc<dyn LlmProvider>, config: &LlmConfig) -> Self {
        Self::new(provider, RetryPolicy::from_config(config), config.timeout())
    }

    /// Generate a completion, retrying transient failures
    ///
    /// An empty completion is a success here; the parser rejects it.
    pub async fn generate(&self, prompt: &str) -> Result<LlmResponse, LlmError> {
        let response = self
            .retry
            .run(
                |attempt| async move {
                    tracing::debug!(attempt, model = self.provider.model(), "Calling LLM");
                    match tokio::time::timeout(self.timeout, self.provider.generate(prompt)).await {
                        Ok(result) => result,
                        Err(_) => Err(LlmError::timeout(format!(
                            "no response within {}s",
                            self.timeout.as_secs_f32()
                        ))),
                    }
                },
                LlmError::is_retryable,
            )
            .await?;

        if let Some(usage) = response.usage {
            tracing::debug!(
                model = %response.model_id,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "LLM usage"
            );
        }
        Ok(response)
    }

    pub async fn validate_connection(&self) -> bool {
        match tokio::time::timeout(self.timeout, self.provider.validate_connection()).await {
            Ok(connected) => connected,
            Err(_) => false,
        }
    }

    pub fn model(&self) -> &str {
        self.provider.model()
    }
}
