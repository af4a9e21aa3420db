//! Ticket Agent - Entry Point
//!
//! Loads configuration, assembles the pipeline and dispatches one of the
//! subcommands. `repl` keeps a single pipeline alive across commands.

use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use ticket_agent::command::Pipeline;
use ticket_agent::core::config::AgentConfig;
use ticket_agent::core::error::Result;
use ticket_agent::core::types::{CommandResult, OutcomeStatus};
use ticket_agent::llm::create_provider;
use ticket_agent::tracker::JiraClient;
use tokio::runtime::Runtime;
use tracing_subscriber::EnvFilter;

/// Ticket Agent - natural language commands for Jira
#[derive(Parser, Debug)]
#[command(name = "ticket-agent")]
#[command(about = "Translate natural language requests into Jira actions")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(long, global = true, default_value = "agent.toml")]
    config: PathBuf,

    /// Show what would be done without touching the tracker
    #[arg(long, global = true)]
    dry_run: bool,

    /// Project key to use when the request names none
    #[arg(long, global = true)]
    project: Option<String>,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Process a single command and print the result as JSON
    Run {
        /// The request, e.g. "Create a bug ticket for login page in TEST"
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
    /// Interactive loop; `exit` or `quit` to leave
    Repl,
    /// List projects visible to the configured account
    Projects,
    /// Check connectivity to the tracker and the LLM
    Health,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ticket_agent=info")),
        )
        .init();

    let args = Args::parse();

    let config = AgentConfig::load(&args.config)?;
    config.validate()?;

    let provider = create_provider(&config.llm)?;
    let tracker = Arc::new(JiraClient::new(&config.tracker)?);
    let pipeline = Pipeline::from_config(&config, provider, tracker);
    tracing::info!(model = %config.llm.provider_model(), "Ticket agent ready");

    let rt = Runtime::new()?;
    let project = args.project.as_deref();

    match args.command {
        Cmd::Run { text } => {
            let result = rt.block_on(pipeline.process_command(&text.join(" "), project, args.dry_run));
            println!("{}", serde_json::to_string_pretty(&result)?);
            if !result.success {
                std::process::exit(1);
            }
        }
        Cmd::Repl => repl(&rt, &pipeline, project, args.dry_run)?,
        Cmd::Projects => {
            let projects = rt.block_on(pipeline.list_projects())?;
            println!("{}", serde_json::to_string_pretty(&projects)?);
        }
        Cmd::Health => {
            let health = rt.block_on(pipeline.health());
            println!("{}", serde_json::to_string_pretty(&health)?);
            if !(health.tracker_connected && health.llm_connected) {
                std::process::exit(1);
            }
        }
    }
    Ok(())
}

fn repl(rt: &Runtime, pipeline: &Pipeline, project: Option<&str>, dry_run: bool) -> Result<()> {
    println!("\n=== TICKET AGENT ===");
    if dry_run {
        println!("Dry run: nothing will be written to the tracker");
    }
    println!("Type a request, or 'exit' to quit.\n");

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();

        if input.is_empty() {
            continue;
        }
        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            break;
        }

        let result = rt.block_on(pipeline.process_command(input, project, dry_run));
        print_result(&result);
    }

    println!("Goodbye!");
    Ok(())
}

fn print_result(result: &CommandResult) {
    println!();
    if let Some(stage) = result.failed_stage.filter(|_| result.actions.is_empty()) {
        println!("Failed at {}: {}", stage, result.message);
        if let Some(raw) = &result.raw_excerpt {
            println!("  model replied: {}", raw);
        }
        println!();
        return;
    }

    println!("{}", result.message);
    for outcome in &result.actions {
        let action = &outcome.action;
        match outcome.status {
            OutcomeStatus::Created => println!(
                "  + {} {} ({})",
                outcome.external_id.as_deref().unwrap_or("?"),
                action.summary,
                action.issue_type
            ),
            OutcomeStatus::SkippedDryRun => println!(
                "  ~ would {} in {}: {} ({})",
                action.kind, action.project, action.summary, action.issue_type
            ),
            OutcomeStatus::Failed => println!(
                "  ! {} in {}: {}",
                action.kind,
                action.project,
                outcome.error.as_deref().unwrap_or("unknown error")
            ),
        }
    }
    println!();
}
