//! Issue tracker capability and its Jira implementation

pub mod jira;

use crate::core::error::TrackerError;
use crate::core::types::IssueType;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use jira::JiraClient;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Handle of an issue the tracker just created
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedIssue {
    pub key: String,
}

/// The account the tracker client is authenticated as
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub display_name: String,
    pub email: Option<String>,
}

/// Operations the executor needs from a tracker
///
/// Implementations must be safe to share across concurrent commands.
#[async_trait]
pub trait IssueTracker: Send + Sync {
    async fn list_projects(&self) -> Result<Vec<Project>, TrackerError>;

    async fn create_issue(
        &self,
        project: &str,
        summary: &str,
        description: &str,
        issue_type: IssueType,
    ) -> Result<CreatedIssue, TrackerError>;

    /// Authenticated identity; doubles as a connection check
    async fn whoami(&self) -> Result<Identity, TrackerError>;
}
