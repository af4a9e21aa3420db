//! Agent configuration
//!
//! Loaded from a TOML file, then overridden from the environment (a `.env`
//! file is read first by the binary). Every field has a default so an empty
//! file is a valid starting point; [`AgentConfig::validate`] catches the
//! settings that have no sensible default, like tracker credentials.

use crate::core::error::{AgentError, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Per-attempt LLM deadlines outside this range are allowed but logged
pub const RECOMMENDED_LLM_TIMEOUT_SECS: std::ops::RangeInclusive<u64> = 30..=300;

/// Which LLM backend to talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Ollama,
    OpenAi,
}

impl ProviderKind {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "ollama" => Some(Self::Ollama),
            "openai" => Some(Self::OpenAi),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Skip tracker mutation for every command, regardless of the request
    pub dry_run: bool,
    /// Upper bound on the number of actions one command may produce
    pub max_issues_per_request: usize,
    pub llm: LlmConfig,
    pub tracker: TrackerConfig,
    pub security: SecurityConfig,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            max_issues_per_request: 10,
            llm: LlmConfig::default(),
            tracker: TrackerConfig::default(),
            security: SecurityConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: ProviderKind,
    /// Deadline for a single attempt
    pub timeout_secs: u64,
    pub max_attempts: u32,
    /// Delay before the first retry; doubles per retry up to `max_delay_secs`
    pub base_delay_secs: u64,
    pub max_delay_secs: u64,
    pub ollama: OllamaConfig,
    pub openai: OpenAiConfig,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Ollama,
            timeout_secs: 120,
            max_attempts: 3,
            base_delay_secs: 4,
            max_delay_secs: 100,
            ollama: OllamaConfig::default(),
            openai: OpenAiConfig::default(),
        }
    }
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Model name of the selected provider
    pub fn provider_model(&self) -> &str {
        match self.provider {
            ProviderKind::Ollama => &self.ollama.model,
            ProviderKind::OpenAi => &self.openai.model,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    pub host: String,
    pub port: u16,
    /// `name:tag`, e.g. `deepseek-r1:14b`
    pub model: String,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 11434,
            model: "deepseek-r1:14b".into(),
        }
    }
}

impl OllamaConfig {
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gpt-3.5-turbo".into(),
            base_url: "https://api.openai.com/v1".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Base URL of the Jira server
    pub server: String,
    pub user: String,
    pub token: String,
    pub timeout_secs: u64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            server: String::new(),
            user: String::new(),
            token: String::new(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    pub protected_projects: Vec<String>,
    /// Whole-word tokens that block a command before the LLM sees it
    pub denied_keywords: Vec<String>,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            protected_projects: vec!["PROD".into(), "LIVE".into(), "ADMIN".into()],
            denied_keywords: ["delete", "remove", "drop", "admin", "password", "token", "key"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl AgentConfig {
    /// Parse a TOML document
    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Load from `path` if it exists, fall back to defaults otherwise,
    /// then apply environment overrides
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            Self::from_toml(&contents)?
        } else {
            tracing::debug!("No config file at {}, using defaults", path.display());
            Self::default()
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply overrides from an environment lookup
    ///
    /// Takes the lookup as a closure so tests don't have to mutate the
    /// process environment.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("LLM_PROVIDER") {
            self.llm.provider = ProviderKind::parse(&v)
                .ok_or_else(|| AgentError::Config(format!("Unsupported LLM provider: {}", v)))?;
        }
        if let Some(v) = lookup("OLLAMA_IP") {
            self.llm.ollama.host = v;
        }
        if let Some(v) = lookup("OLLAMA_PORT") {
            self.llm.ollama.port = parse_env("OLLAMA_PORT", &v)?;
        }
        if let Some(v) = lookup("OLLAMA_MODEL") {
            self.llm.ollama.model = v;
        }
        if let Some(v) = lookup("OPENAI_API_KEY") {
            self.llm.openai.api_key = Some(v);
        }
        if let Some(v) = lookup("OPENAI_MODEL") {
            self.llm.openai.model = v;
        }
        if let Some(v) = lookup("JIRA_SERVER") {
            self.tracker.server = v;
        }
        if let Some(v) = lookup("JIRA_USER") {
            self.tracker.user = v;
        }
        if let Some(v) = lookup("JIRA_TOKEN") {
            self.tracker.token = v;
        }
        if let Some(v) = lookup("PROTECTED_PROJECTS") {
            self.security.protected_projects = v
                .split(',')
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect();
        }
        if let Some(v) = lookup("DRY_RUN") {
            self.dry_run = parse_env("DRY_RUN", &v)?;
        }
        if let Some(v) = lookup("MAX_ISSUES_PER_REQUEST") {
            self.max_issues_per_request = parse_env("MAX_ISSUES_PER_REQUEST", &v)?;
        }
        Ok(())
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.tracker.server.is_empty() {
            return Err(AgentError::Config("tracker.server (JIRA_SERVER) is not set".into()));
        }
        if self.tracker.user.is_empty() || self.tracker.token.is_empty() {
            return Err(AgentError::Config(
                "tracker.user and tracker.token (JIRA_USER, JIRA_TOKEN) are required".into(),
            ));
        }
        if self.llm.timeout_secs == 0 {
            return Err(AgentError::Config("llm.timeout_secs must be positive".into()));
        }
        if !RECOMMENDED_LLM_TIMEOUT_SECS.contains(&self.llm.timeout_secs) {
            tracing::warn!(
                "llm.timeout_secs = {} is outside the recommended {}-{}s range",
                self.llm.timeout_secs,
                RECOMMENDED_LLM_TIMEOUT_SECS.start(),
                RECOMMENDED_LLM_TIMEOUT_SECS.end()
            );
        }
        if self.tracker.timeout_secs == 0 {
            return Err(AgentError::Config("tracker.timeout_secs must be positive".into()));
        }
        if self.llm.max_attempts == 0 {
            return Err(AgentError::Config("llm.max_attempts must be at least 1".into()));
        }
        if self.llm.base_delay_secs > self.llm.max_delay_secs {
            return Err(AgentError::Config(format!(
                "llm.base_delay_secs ({}) should be <= llm.max_delay_secs ({})",
                self.llm.base_delay_secs, self.llm.max_delay_secs
            )));
        }
        if self.max_issues_per_request == 0 {
            return Err(AgentError::Config("max_issues_per_request must be positive".into()));
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| AgentError::Config(format!("{} has an invalid value: {}", key, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn valid_config() -> AgentConfig {
        let mut config = AgentConfig::default();
        config.tracker.server = "https://example.atlassian.net".into();
        config.tracker.user = "bot@example.com".into();
        config.tracker.token = "secret".into();
        config
    }

    #[test]
    fn test_defaults() {
        let config = AgentConfig::default();
        assert_eq!(config.llm.provider, ProviderKind::Ollama);
        assert_eq!(config.llm.max_attempts, 3);
        assert_eq!(config.max_issues_per_request, 10);
        assert_eq!(config.llm.ollama.base_url(), "http://localhost:11434");
        assert!(config.security.protected_projects.contains(&"PROD".to_string()));
    }

    #[test]
    fn test_from_toml_partial() {
        let config = AgentConfig::from_toml(
            r#"
dry_run = true

[llm]
provider = "openai"
timeout_secs = 30

[llm.openai]
model = "gpt-4o-mini"

[security]
protected_projects = ["SECRET"]
"#,
        )
        .unwrap();
        assert!(config.dry_run);
        assert_eq!(config.llm.provider, ProviderKind::OpenAi);
        assert_eq!(config.llm.provider_model(), "gpt-4o-mini");
        assert_eq!(config.llm.timeout(), Duration::from_secs(30));
        assert_eq!(config.llm.openai.model, "gpt-4o-mini");
        assert_eq!(config.llm.max_attempts, 3);
        assert_eq!(config.security.protected_projects, vec!["SECRET".to_string()]);
        assert!(!config.security.denied_keywords.is_empty());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("LLM_PROVIDER", "OpenAI"),
            ("OLLAMA_PORT", "9999"),
            ("PROTECTED_PROJECTS", "PROD, OPS,"),
            ("DRY_RUN", "true"),
        ]
        .into_iter()
        .collect();

        let mut config = AgentConfig::default();
        config
            .apply_env(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.llm.provider, ProviderKind::OpenAi);
        assert_eq!(config.llm.ollama.port, 9999);
        assert_eq!(
            config.security.protected_projects,
            vec!["PROD".to_string(), "OPS".to_string()]
        );
        assert!(config.dry_run);
    }

    #[test]
    fn test_env_rejects_unknown_provider() {
        let mut config = AgentConfig::default();
        let result = config.apply_env(|k| (k == "LLM_PROVIDER").then(|| "claude".to_string()));
        assert!(matches!(result, Err(AgentError::Config(_))));
    }

    #[test]
    fn test_validate_requires_tracker_credentials() {
        assert!(AgentConfig::default().validate().is_err());
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_timeouts() {
        let mut config = valid_config();
        config.llm.timeout_secs = 0;
        assert!(matches!(config.validate(), Err(AgentError::Config(ref m)) if m.contains("llm.timeout_secs")));

        let mut config = valid_config();
        config.tracker.timeout_secs = 0;
        assert!(matches!(config.validate(), Err(AgentError::Config(ref m)) if m.contains("tracker.timeout_secs")));
    }

    #[test]
    fn test_validate_allows_unusual_timeouts() {
        let mut config = valid_config();
        config.llm.timeout_secs = 5;
        assert!(config.validate().is_ok());
        config.llm.timeout_secs = 600;
        assert!(config.validate().is_ok());
        assert!(RECOMMENDED_LLM_TIMEOUT_SECS.contains(&AgentConfig::default().llm.timeout_secs));
    }

    #[test]
    fn test_validate_delay_ordering() {
        let mut config = valid_config();
        config.llm.base_delay_secs = 200;
        assert!(config.validate().is_err());
    }
}
