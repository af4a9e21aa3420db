//! Command pipeline
//!
//! text -> screen -> prompt -> LLM -> parse -> validate -> authorize -> execute
//!
//! Every stage before execution is all-or-nothing: the first failure aborts
//! the command and no tracker mutation happens. Callers always get a
//! [`CommandResult`], never an error.

use crate::command::executor::CommandExecutor;
use crate::command::validator;
use crate::core::config::AgentConfig;
use crate::core::error::{excerpt, AgentError, Result};
use crate::core::types::{Action, Command, CommandResult, HealthStatus, Stage};
use crate::llm::client::LlmProvider;
use crate::llm::gateway::LlmGateway;
use crate::llm::{parser, prompt};
use crate::security::SecurityPolicy;
use crate::tracker::{IssueTracker, Project};
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

/// A stage failure, with the raw completion when one was already received
struct Abort {
    stage: Stage,
    error: AgentError,
    raw: Option<String>,
}

impl Abort {
    fn new(stage: Stage, error: AgentError) -> Self {
        Self {
            stage,
            error,
            raw: None,
        }
    }

    fn with_raw(mut self, raw: &str) -> Self {
        self.raw = Some(raw.to_string());
        self
    }

    /// Parse errors already carry their excerpt; other stages cut one here
    fn raw_excerpt(&self) -> Option<String> {
        match &self.error {
            AgentError::Parse { excerpt, .. } => Some(excerpt.clone()),
            _ => self.raw.as_deref().map(|raw| excerpt(raw, 200)),
        }
    }
}

/// The assembled pipeline; construct once and share behind an `Arc`
#[derive(Clone)]
pub struct Pipeline {
    policy: SecurityPolicy,
    gateway: LlmGateway,
    tracker: Arc<dyn IssueTracker>,
    executor: CommandExecutor,
    max_actions: usize,
    force_dry_run: bool,
}

impl Pipeline {
    pub fn new(
        policy: SecurityPolicy,
        gateway: LlmGateway,
        tracker: Arc<dyn IssueTracker>,
        max_actions: usize,
    ) -> Self {
        Self {
            policy,
            gateway,
            executor: CommandExecutor::new(tracker.clone()),
            tracker,
            max_actions,
            force_dry_run: false,
        }
    }

    pub fn from_config(
        config: &AgentConfig,
        provider: Arc<dyn LlmProvider>,
        tracker: Arc<dyn IssueTracker>,
    ) -> Self {
        let mut pipeline = Self::new(
            SecurityPolicy::from_config(&config.security),
            LlmGateway::from_config(provider, &config.llm),
            tracker,
            config.max_issues_per_request,
        );
        pipeline.force_dry_run = config.dry_run;
        pipeline
    }

    /// Turn every command into a dry run, whatever the caller asks for
    pub fn with_forced_dry_run(mut self, force: bool) -> Self {
        self.force_dry_run = force;
        self
    }

    /// Process one natural language command end to end
    pub async fn process_command(
        &self,
        text: &str,
        target_project: Option<&str>,
        dry_run: bool,
    ) -> CommandResult {
        let mut command = Command::new(text).with_dry_run(dry_run);
        if let Some(project) = target_project {
            command = command.with_project(project);
        }
        self.run(&command).await
    }

    pub async fn run(&self, command: &Command) -> CommandResult {
        let span = tracing::info_span!("command", id = %Uuid::new_v4());
        async {
            tracing::info!(text = %command.text, dry_run = command.dry_run, "Processing command");
            match self.run_stages(command).await {
                Ok(result) => {
                    tracing::info!(success = result.success, "{}", result.message);
                    result
                }
                Err(abort) => {
                    let raw_excerpt = abort.raw_excerpt();
                    tracing::error!(
                        text = %command.text,
                        stage = %abort.stage,
                        raw = raw_excerpt.as_deref().unwrap_or_default(),
                        "Command failed: {}",
                        abort.error
                    );
                    CommandResult::aborted(abort.stage, abort.error.to_string())
                        .with_raw_excerpt(raw_excerpt)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn run_stages(&self, command: &Command) -> std::result::Result<CommandResult, Abort> {
        let decision = self.policy.screen(command);
        if !decision.allowed {
            let reason = decision.reason.unwrap_or_default();
            return Err(Abort::new(Stage::Screen, AgentError::PolicyViolation(reason)));
        }

        let prompt = prompt::format(command);
        let response = self
            .gateway
            .generate(&prompt)
            .await
            .map_err(|e| Abort::new(Stage::Generate, e.into()))?;
        let raw = response.raw_text.as_str();

        let candidates =
            parser::parse(raw).map_err(|e| Abort::new(Stage::Parse, e).with_raw(raw))?;
        let actions = validator::validate_batch(
            &candidates,
            command.target_project.as_deref(),
            self.max_actions,
        )
        .map_err(|e| Abort::new(Stage::Validate, e).with_raw(raw))?;

        self.authorize(&actions)
            .map_err(|e| Abort::new(Stage::Authorize, e).with_raw(raw))?;

        let dry_run = command.dry_run || self.force_dry_run;
        tracing::debug!(count = actions.len(), dry_run, "Executing actions");
        let outcomes = self.executor.execute(actions, dry_run).await;
        Ok(CommandResult::from_outcomes(outcomes))
    }

    /// One protected target rejects the whole batch
    fn authorize(&self, actions: &[Action]) -> Result<()> {
        for action in actions {
            let decision = self.policy.authorize(action);
            if !decision.allowed {
                return Err(AgentError::PolicyViolation(
                    decision.reason.unwrap_or_default(),
                ));
            }
        }
        Ok(())
    }

    pub async fn list_projects(&self) -> Result<Vec<Project>> {
        Ok(self.tracker.list_projects().await?)
    }

    /// Probe both collaborators; never fails
    pub async fn health(&self) -> HealthStatus {
        let tracker_connected = match self.tracker.whoami().await {
            Ok(identity) => {
                tracing::debug!(user = %identity.display_name, "Tracker reachable");
                true
            }
            Err(e) => {
                tracing::warn!("Tracker health check failed: {}", e);
                false
            }
        };
        let llm_connected = self.gateway.validate_connection().await;
        if !llm_connected {
            tracing::warn!(model = self.gateway.model(), "LLM health check failed");
        }
        HealthStatus {
            tracker_connected,
            llm_connected,
        }
    }
}
