//! Jira REST v2 client

use crate::core::config::TrackerConfig;
use crate::core::error::{AgentError, Result, TrackerError};
use crate::core::types::IssueType;
use crate::tracker::{CreatedIssue, Identity, IssueTracker, Project};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub struct JiraClient {
    client: Client,
    base_url: String,
    user: String,
    token: String,
}

impl JiraClient {
    pub fn new(config: &TrackerConfig) -> Result<Self> {
        if config.server.trim().is_empty() {
            return Err(AgentError::Config("Jira server URL not configured".into()));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AgentError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: config.server.trim().trim_end_matches('/').to_string(),
            user: config.user.clone(),
            token: config.token.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/rest/api/2/{}", self.base_url, path)
    }

    async fn get(&self, path: &str) -> std::result::Result<Response, TrackerError> {
        let response = self
            .client
            .get(self.url(path))
            .basic_auth(&self.user, Some(&self.token))
            .send()
            .await?;
        ensure_success(response).await
    }
}

async fn ensure_success(response: Response) -> std::result::Result<Response, TrackerError> {
    if response.status().is_success() {
        Ok(response)
    } else {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(TrackerError::from_status(status, &body))
    }
}

#[async_trait]
impl IssueTracker for JiraClient {
    async fn list_projects(&self) -> std::result::Result<Vec<Project>, TrackerError> {
        let projects: Vec<Project> = self.get("project").await?.json().await?;
        Ok(projects)
    }

    async fn create_issue(
        &self,
        project: &str,
        summary: &str,
        description: &str,
        issue_type: IssueType,
    ) -> std::result::Result<CreatedIssue, TrackerError> {
        let request = CreateIssueRequest::new(project, summary, description, issue_type);
        let response = self
            .client
            .post(self.url("issue"))
            .basic_auth(&self.user, Some(&self.token))
            .json(&request)
            .send()
            .await?;
        let created: CreatedIssue = ensure_success(response).await?.json().await?;
        tracing::info!(key = %created.key, "Created issue");
        Ok(created)
    }

    async fn whoami(&self) -> std::result::Result<Identity, TrackerError> {
        let me: Myself = self.get("myself").await?.json().await?;
        Ok(Identity {
            display_name: me.display_name,
            email: me.email_address,
        })
    }
}

#[derive(Serialize)]
struct CreateIssueRequest<'a> {
    fields: IssueFields<'a>,
}

#[derive(Serialize)]
struct IssueFields<'a> {
    project: KeyRef<'a>,
    summary: &'a str,
    description: &'a str,
    issuetype: NameRef<'a>,
}

#[derive(Serialize)]
struct KeyRef<'a> {
    key: &'a str,
}

#[derive(Serialize)]
struct NameRef<'a> {
    name: &'a str,
}

impl<'a> CreateIssueRequest<'a> {
    fn new(project: &'a str, summary: &'a str, description: &'a str, issue_type: IssueType) -> Self {
        Self {
            fields: IssueFields {
                project: KeyRef { key: project },
                summary,
                description,
                issuetype: NameRef {
                    name: issue_type.as_str(),
                },
            },
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Myself {
    display_name: String,
    email_address: Option<String>,
}
