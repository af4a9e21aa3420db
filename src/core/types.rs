//! Core type definitions used throughout the pipeline

use serde::{Deserialize, Serialize};
use std::fmt;

/// A natural language instruction as submitted by a caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    pub text: String,
    /// Project key to fall back on when the model names none
    pub target_project: Option<String>,
    pub dry_run: bool,
}

impl Command {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            target_project: None,
            dry_run: false,
        }
    }

    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.target_project = Some(project.into());
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

/// Kinds of tracker operations the model may request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionKind {
    Create,
    Update,
    Comment,
    Transition,
}

impl ActionKind {
    /// Map a wire name (`create_issue`, `create_issues`, `CREATE`, ...) to a kind
    pub fn from_wire(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "create" | "create_issue" | "create_issues" => Some(Self::Create),
            "update" | "update_issue" | "update_issues" => Some(Self::Update),
            "comment" | "comment_issue" => Some(Self::Comment),
            "transition" | "transition_issue" => Some(Self::Transition),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Comment => "comment",
            Self::Transition => "transition",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tracker issue types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum IssueType {
    #[default]
    Task,
    Bug,
    Story,
    Epic,
}

impl IssueType {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "task" => Some(Self::Task),
            "bug" => Some(Self::Bug),
            "story" => Some(Self::Story),
            "epic" => Some(Self::Epic),
            _ => None,
        }
    }

    /// Name as the tracker expects it in `issuetype.name`
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Task => "Task",
            Self::Bug => "Bug",
            Self::Story => "Story",
            Self::Epic => "Epic",
        }
    }
}

impl fmt::Display for IssueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated operation against the tracker
///
/// Only [`crate::command::validator`] constructs these from model output, so
/// `project` is always upper-case and `summary` always trimmed and in bounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub kind: ActionKind,
    pub project: String,
    pub summary: String,
    pub description: Option<String>,
    #[serde(default)]
    pub issue_type: IssueType,
}

/// Verdict of a security check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyDecision {
    pub allowed: bool,
    pub reason: Option<String>,
}

impl PolicyDecision {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutcomeStatus {
    Created,
    SkippedDryRun,
    Failed,
}

/// Result of executing a single action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub action: Action,
    pub status: OutcomeStatus,
    /// Tracker-assigned key, e.g. `TEST-101`
    pub external_id: Option<String>,
    pub error: Option<String>,
}

impl ExecutionOutcome {
    pub fn created(action: Action, external_id: impl Into<String>) -> Self {
        Self {
            action,
            status: OutcomeStatus::Created,
            external_id: Some(external_id.into()),
            error: None,
        }
    }

    pub fn skipped(action: Action) -> Self {
        Self {
            action,
            status: OutcomeStatus::SkippedDryRun,
            external_id: None,
            error: None,
        }
    }

    pub fn failed(action: Action, error: impl Into<String>) -> Self {
        Self {
            action,
            status: OutcomeStatus::Failed,
            external_id: None,
            error: Some(error.into()),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.status == OutcomeStatus::Failed
    }
}

/// Pipeline stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Screen,
    Generate,
    Parse,
    Validate,
    Authorize,
    Execute,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Screen => "screen",
            Self::Generate => "generate",
            Self::Parse => "parse",
            Self::Validate => "validate",
            Self::Authorize => "authorize",
            Self::Execute => "execute",
        };
        f.write_str(name)
    }
}

/// Final answer for one command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResult {
    pub success: bool,
    pub message: String,
    pub actions: Vec<ExecutionOutcome>,
    /// Stage that aborted the command, if one did
    pub failed_stage: Option<Stage>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    /// Start of the model's reply, when a stage after generation rejected it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_excerpt: Option<String>,
}

impl CommandResult {
    /// Aggregate executor outcomes; success only when nothing failed
    pub fn from_outcomes(outcomes: Vec<ExecutionOutcome>) -> Self {
        let failed = outcomes.iter().filter(|o| o.is_failed()).count();
        let errors: Vec<String> = outcomes.iter().filter_map(|o| o.error.clone()).collect();
        let message = if failed == 0 {
            format!("{} action(s) processed", outcomes.len())
        } else {
            format!("{} of {} action(s) failed", failed, outcomes.len())
        };
        Self {
            success: failed == 0,
            message,
            actions: outcomes,
            failed_stage: if failed == 0 { None } else { Some(Stage::Execute) },
            errors,
            raw_excerpt: None,
        }
    }

    /// A command aborted before execution
    pub fn aborted(stage: Stage, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            success: false,
            message: message.clone(),
            actions: Vec::new(),
            failed_stage: Some(stage),
            errors: vec![message],
            raw_excerpt: None,
        }
    }

    pub fn with_raw_excerpt(mut self, excerpt: Option<String>) -> Self {
        self.raw_excerpt = excerpt;
        self
    }
}

/// Connectivity of the two external collaborators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub tracker_connected: bool,
    pub llm_connected: bool,
}
