use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use crate::action::control_registry;
use crate::config::Config;
use crate::interceptor::TracingInterceptor;
use crate::interpreter::{build_plan, outline, Run, RunSettings};
use crate::script::ScriptCase;
use crate::telemetry;
use crate::template::MissingParamPolicy;

#[derive(Parser)]
#[command(name = "robot")]
#[command(about = "Robot - run and inspect browser automation scripts", long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default search)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Abort a run after this many seconds (overrides config file and env vars)
    #[arg(long, global = true)]
    pub timeout_secs: Option<u64>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a script, printing each step result as a JSON line
    Run {
        /// Script case in JSON form
        script: PathBuf,

        /// Fail a step that references an unset parameter
        #[arg(long)]
        strict: bool,

        /// Milliseconds to wait between loop guard checks
        #[arg(long)]
        poll_interval_ms: Option<u64>,
    },

    /// Resolve a script's block structure and print it without running anything
    Check {
        /// Script case in JSON form
        script: PathBuf,
    },
}

/// Run the CLI by parsing process arguments
pub async fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    run_cli_with_args(cli).await
}

/// Run the CLI with provided arguments
pub async fn run_cli_from_args(args: Vec<String>) -> Result<()> {
    let cli = Cli::parse_from(args);
    run_cli_with_args(cli).await
}

async fn run_cli_with_args(cli: Cli) -> Result<()> {
    dotenvy::dotenv().ok();

    match cli.command {
        Commands::Run {
            script,
            strict,
            poll_interval_ms,
        } => {
            let config = Config::builder()
                .config_path(cli.config)
                .run_timeout_secs(cli.timeout_secs)
                .loop_poll_interval_ms(poll_interval_ms)
                .missing_params(strict.then_some(MissingParamPolicy::Strict))
                .build()?;
            telemetry::init_tracing(&config.logging)?;
            run_script(&script, &config).await
        }

        Commands::Check { script } => check_script(&script),
    }
}

fn load_case(path: &Path) -> Result<ScriptCase> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read script {}", path.display()))?;
    ScriptCase::from_json(&source)
        .with_context(|| format!("Failed to parse script {}", path.display()))
}

async fn run_script(path: &Path, config: &Config) -> Result<()> {
    let case = load_case(path)?;
    let name = case.name.clone();

    // No browser driver is linked into the binary: browser steps are unsupported here
    let run = Run::new(case, Arc::new(control_registry()))
        .with_settings(RunSettings::from(config))
        .intercept(TracingInterceptor);
    let cancel = run.cancellation_token();
    let mut handle = run.spawn();

    loop {
        tokio::select! {
            result = handle.next_result() => match result {
                Some(result) => println!("{}", serde_json::to_string(&result)?),
                None => break,
            },
            _ = tokio::signal::ctrl_c(), if !cancel.is_cancelled() => {
                warn!("interrupt received, cancelling run");
                cancel.cancel();
            }
        }
    }

    let outcome = handle.join().await.context("Run task failed")?;
    match outcome.error {
        Some(err) => Err(err).with_context(|| format!("Script '{}' failed", name)),
        None => {
            info!(script = %name, steps = outcome.emitted, "script finished");
            Ok(())
        }
    }
}

fn check_script(path: &Path) -> Result<()> {
    let case = load_case(path)?;
    let plan = build_plan(&case.steps)
        .with_context(|| format!("Script '{}' has unbalanced blocks", case.name))?;

    println!("{} ({} steps)", case.name, case.len());
    print!("{}", outline(&plan));
    Ok(())
}
