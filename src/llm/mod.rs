//! Everything that talks to, or interprets, the language model

pub mod client;
pub mod factory;
pub mod gateway;
pub mod ollama;
pub mod openai;
pub mod parser;
pub mod prompt;
pub mod retry;

pub use client::{LlmProvider, LlmResponse, TokenUsage};
pub use factory::create_provider;
pub use gateway::LlmGateway;
pub use parser::ActionCandidate;
pub use retry::RetryPolicy;
