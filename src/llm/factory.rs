//! Select an LLM backend from configuration

use crate::core::config::{LlmConfig, ProviderKind};
use crate::core::error::LlmError;
use crate::llm::client::LlmProvider;
use crate::llm::ollama::OllamaProvider;
use crate::llm::openai::OpenAiProvider;
use std::sync::Arc;

pub fn create_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    let provider: Arc<dyn LlmProvider> = match config.provider {
        ProviderKind::Ollama => Arc::new(OllamaProvider::new(&config.ollama)?),
        ProviderKind::OpenAi => Arc::new(OpenAiProvider::new(&config.openai)?),
    };
    tracing::info!(
        "Using {:?} provider with model {}",
        config.provider,
        provider.model()
    );
    Ok(provider)
}
