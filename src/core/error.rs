use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Policy violation: {0}")]
    PolicyViolation(String),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Parse error: {message}")]
    Parse { message: String, excerpt: String },

    #[error("Validation error on `{field}`: {message}")]
    Validation { field: &'static str, message: String },

    #[error("Execution error: {0}")]
    Execution(String),

    #[error("Tracker error: {0}")]
    Tracker(#[from] TrackerError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),
}

impl AgentError {
    pub fn parse(message: impl Into<String>, raw: &str) -> Self {
        Self::Parse {
            message: message.into(),
            excerpt: excerpt(raw, 200),
        }
    }

    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AgentError>;

/// Classification of an LLM backend failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmErrorKind {
    /// Attempt exceeded its deadline
    Timeout,
    /// Connection refused, reset, DNS, ...
    Transport,
    /// HTTP 5xx
    Server,
    /// HTTP 429
    RateLimited,
    /// Any other HTTP 4xx
    Client,
    /// Body could not be decoded into the backend's response shape
    InvalidResponse,
    /// Provider misconfigured; never reaches the network
    Config,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind:?}: {message}")]
pub struct LlmError {
    pub kind: LlmErrorKind,
    pub message: String,
}

impl LlmError {
    pub fn new(kind: LlmErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::Timeout, message)
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::Config, message)
    }

    /// Classify an HTTP error status
    pub fn from_status(status: u16, body: &str) -> Self {
        let kind = match status {
            429 => LlmErrorKind::RateLimited,
            500..=599 => LlmErrorKind::Server,
            _ => LlmErrorKind::Client,
        };
        Self::new(kind, format!("HTTP {}: {}", status, excerpt(body, 200)))
    }

    /// Classify a reqwest failure that happened before a status was seen
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            LlmErrorKind::Timeout
        } else if err.is_decode() {
            LlmErrorKind::InvalidResponse
        } else {
            LlmErrorKind::Transport
        };
        Self::new(kind, err.to_string())
    }

    /// Only transient failures are worth another attempt
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            LlmErrorKind::Timeout
                | LlmErrorKind::Transport
                | LlmErrorKind::Server
                | LlmErrorKind::RateLimited
        )
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct TrackerError {
    pub status: Option<u16>,
    pub message: String,
}

impl TrackerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }

    pub fn from_status(status: u16, body: &str) -> Self {
        Self {
            status: Some(status),
            message: format!("HTTP {}: {}", status, excerpt(body, 200)),
        }
    }
}

impl From<reqwest::Error> for TrackerError {
    fn from(err: reqwest::Error) -> Self {
        Self {
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}

/// First `max` characters of `text`, for logs and error payloads
pub fn excerpt(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
