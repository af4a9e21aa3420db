//! Command execution - applies validated actions to the tracker
//!
//! Unlike every earlier stage, execution is not all-or-nothing: each action
//! gets its own outcome and a failure never stops the actions after it.

use crate::core::error::{AgentError, Result};
use crate::core::types::{Action, ActionKind, ExecutionOutcome};
use crate::tracker::IssueTracker;
use std::sync::Arc;

/// Executes actions against an issue tracker, strictly in order
#[derive(Clone)]
pub struct CommandExecutor {
    tracker: Arc<dyn IssueTracker>,
}

impl CommandExecutor {
    pub fn new(tracker: Arc<dyn IssueTracker>) -> Self {
        Self { tracker }
    }

    /// Execute every action, returning one outcome per action in input order
    pub async fn execute(&self, actions: Vec<Action>, dry_run: bool) -> Vec<ExecutionOutcome> {
        let mut outcomes = Vec::with_capacity(actions.len());
        for action in actions {
            let outcome = if dry_run {
                tracing::info!(project = %action.project, summary = %action.summary, "[DRY RUN] Would {} issue", action.kind);
                ExecutionOutcome::skipped(action)
            } else {
                self.execute_one(action).await
            };
            outcomes.push(outcome);
        }
        outcomes
    }

    async fn execute_one(&self, action: Action) -> ExecutionOutcome {
        match self.apply(&action).await {
            Ok(key) => ExecutionOutcome::created(action, key),
            Err(e) => {
                tracing::error!(project = %action.project, kind = %action.kind, "Action failed: {}", e);
                ExecutionOutcome::failed(action, failure_message(e))
            }
        }
    }

    /// Apply one action, returning the key of the issue it produced
    async fn apply(&self, action: &Action) -> Result<String> {
        // Re-read per action: an earlier action may have changed what exists
        let projects = self
            .tracker
            .list_projects()
            .await
            .map_err(|e| AgentError::Execution(format!("failed to list projects: {}", e)))?;
        if !projects.iter().any(|p| p.key == action.project) {
            return Err(AgentError::Execution(format!(
                "project not found: {}",
                action.project
            )));
        }

        match action.kind {
            ActionKind::Create => {
                let description = action.description.as_deref().unwrap_or("");
                let created = self
                    .tracker
                    .create_issue(&action.project, &action.summary, description, action.issue_type)
                    .await
                    .map_err(|e| AgentError::Execution(format!("issue creation failed: {}", e)))?;
                Ok(created.key)
            }
            ActionKind::Update | ActionKind::Comment | ActionKind::Transition => Err(
                AgentError::Execution(format!("{} is not supported by the tracker client", action.kind)),
            ),
        }
    }
}

/// Outcome text for a failed action, without the error-kind prefix
fn failure_message(err: AgentError) -> String {
    match err {
        AgentError::Execution(message) => message,
        other => other.to_string(),
    }
}
