//! Command pipeline
//!
//! Turns validated model output into tracker effects:
//! Vec<ActionCandidate> -> validator -> Vec<Action> -> CommandExecutor -> Vec<ExecutionOutcome>

pub mod executor;
pub mod pipeline;
pub mod validator;

pub use executor::CommandExecutor;
pub use pipeline::Pipeline;
pub use validator::{validate, validate_batch};
