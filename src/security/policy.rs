//! Command and action security policy
//!
//! `screen` is a coarse surface check on the command text. It matches whole
//! whitespace-separated tokens, so a deny-listed word anywhere in the text
//! blocks the command even when it is harmless in context. The deny-list is
//! configuration, not code, so deployments can tune it.

use crate::core::config::SecurityConfig;
use crate::core::types::{Action, Command, PolicyDecision};
use std::collections::HashSet;

#[derive(Debug, Clone)]
pub struct SecurityPolicy {
    denied_keywords: HashSet<String>,
    protected_projects: HashSet<String>,
}

impl Default for SecurityPolicy {
    fn default() -> Self {
        Self::from_config(&SecurityConfig::default())
    }
}

impl SecurityPolicy {
    pub fn new<K, P>(denied_keywords: K, protected_projects: P) -> Self
    where
        K: IntoIterator,
        K::Item: AsRef<str>,
        P: IntoIterator,
        P::Item: AsRef<str>,
    {
        Self {
            denied_keywords: denied_keywords
                .into_iter()
                .map(|k| k.as_ref().trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
            protected_projects: protected_projects
                .into_iter()
                .map(|p| p.as_ref().trim().to_uppercase())
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    pub fn from_config(config: &SecurityConfig) -> Self {
        Self::new(&config.denied_keywords, &config.protected_projects)
    }

    /// Reject commands containing a deny-listed token
    pub fn screen(&self, command: &Command) -> PolicyDecision {
        let lowered = command.text.to_lowercase();
        let mut hits: Vec<&str> = lowered
            .split_whitespace()
            .filter(|token| self.denied_keywords.contains(*token))
            .collect();

        if hits.is_empty() {
            return PolicyDecision::allow();
        }
        hits.sort_unstable();
        hits.dedup();
        PolicyDecision::deny(format!(
            "Command blocked: contains restricted keywords ({})",
            hits.join(", ")
        ))
    }

    /// Reject actions targeting a protected project
    pub fn authorize(&self, action: &Action) -> PolicyDecision {
        if self.is_protected(&action.project) {
            PolicyDecision::deny(format!(
                "Access denied to protected project: {}",
                action.project
            ))
        } else {
            PolicyDecision::allow()
        }
    }

    pub fn is_protected(&self, project: &str) -> bool {
        self.protected_projects.contains(&project.to_uppercase())
    }
}
