pub mod config;
pub mod error;
pub mod types;

pub use config::AgentConfig;
pub use error::{AgentError, LlmError, LlmErrorKind, Result, TrackerError};
pub use types::{
    Action, ActionKind, Command, CommandResult, ExecutionOutcome, HealthStatus, IssueType,
    OutcomeStatus, PolicyDecision, Stage,
};
