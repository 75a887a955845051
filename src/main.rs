use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use multi_agent_validator::{
    agents::{OrchestratorConfig, ValidationOrchestrator},
    config::Config,
    llm::{AgentPrompts, HttpReviewClient},
    reports::{ReportGenerator, ReportWriter},
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "agent-validator")]
#[command(about = "Run independent review agents in parallel and aggregate their findings")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every configured agent and write the aggregate report
    Run {
        /// Directory for per-agent and aggregate reports
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Console summary format (json, markdown, text)
        #[arg(short, long, default_value = "text")]
        format: String,

        /// Overall run deadline in seconds (0 disables it)
        #[arg(short, long)]
        deadline_seconds: Option<u64>,
    },

    /// List the configured agents
    Agents,

    /// Write the default configuration file
    Init {
        /// Configuration file path
        #[arg(long, default_value = "validator.yml")]
        config_file: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    init_tracing(&cli.log_level)?;

    info!("Starting multi-agent validator");

    let mut config = load_config(cli.config.as_ref()).await?;

    match cli.command {
        Commands::Run {
            output_dir,
            format,
            deadline_seconds,
        } => {
            if let Some(dir) = output_dir {
                config.run.output_dir = dir;
            }
            if let Some(seconds) = deadline_seconds {
                config.run.run_deadline_seconds = (seconds > 0).then_some(seconds);
            }
            config.validate().context("Invalid configuration")?;

            run_validation(config, &format).await?;
        }

        Commands::Agents => {
            config.validate().context("Invalid configuration")?;
            list_agents(&config);
        }

        Commands::Init { config_file, force } => {
            init_config(config_file, force).await?;
        }
    }

    Ok(())
}

/// Initialize tracing with the specified log level
fn init_tracing(log_level: &str) -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(log_level))
        .context("Failed to create env filter")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(true)
                .with_level(true),
        )
        .with(env_filter)
        .init();

    Ok(())
}

/// Load configuration from file or use defaults, then apply environment overrides
async fn load_config(config_path: Option<&PathBuf>) -> Result<Config> {
    let mut config = match config_path {
        Some(path) if path.exists() => {
            info!("Loading configuration from: {:?}", path);
            Config::load_from_file(path)
                .await
                .with_context(|| format!("Failed to load config file: {:?}", path))?
        }
        Some(path) => {
            warn!("Configuration file not found: {:?}. Using defaults.", path);
            Config::default()
        }
        None => Config::default(),
    };

    config
        .apply_env_overrides()
        .context("Invalid environment override")?;

    Ok(config)
}

/// Execute all agents, stream progress to the console and print the aggregate
async fn run_validation(config: Config, format: &str) -> Result<()> {
    let prompts = AgentPrompts::new(config.run.target_description.clone());

    // A missing credential is the one failure that stops the process before any agent runs
    let client = HttpReviewClient::from_settings(&config.review_service, prompts.system_prompt())
        .context("Cannot start validation run")?;
    info!("Using review service at {}", client.endpoint_url());

    let writer = ReportWriter::new(&config.run.output_dir, config.run.aggregate_file.clone());
    let aggregate_path = writer.aggregate_report_path();

    let cancellation = CancellationToken::new();
    let interrupt = cancellation.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling outstanding review calls");
            interrupt.cancel();
        }
    });

    let orchestrator = ValidationOrchestrator::new(
        Arc::new(client),
        prompts,
        writer,
        OrchestratorConfig::from_config(&config),
    )
    .with_cancellation(cancellation);

    let mut progress = orchestrator.communication_bus().subscribe();
    let printer = tokio::spawn(async move {
        loop {
            match progress.recv().await {
                Ok(event) => println!("{}", event.progress_line()),
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Progress output skipped {} events", skipped)
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let outcome = orchestrator.run(&config.agents).await;

    // Dropping the orchestrator closes the progress channel
    drop(orchestrator);
    if let Err(e) = printer.await {
        warn!("Progress printer stopped abnormally: {}", e);
    }

    let report = outcome.context("Validation run failed")?;

    let rendered = ReportGenerator::new()
        .generate(&report, format)
        .context("Failed to render report")?;
    println!("{}", rendered);

    if report.has_critical_issues() {
        warn!("Reviewers flagged {} critical issues", report.summary.critical_issues);
    }

    info!("Validation run completed; aggregate written to {:?}", aggregate_path);
    Ok(())
}

/// Print the configured agent registry
fn list_agents(config: &Config) {
    println!("Configured agents ({}):", config.agents.len());
    for agent in &config.agents {
        println!("  #{} {} - {}", agent.id, agent.task, agent.focus);
    }
}

/// Initialize configuration file
async fn init_config(config_file: PathBuf, force: bool) -> Result<()> {
    info!("Initializing configuration file: {:?}", config_file);

    if config_file.exists() && !force {
        warn!("Configuration file already exists: {:?}", config_file);
        println!(
            "Configuration file {:?} already exists; pass --force to overwrite it.",
            config_file
        );
        return Ok(());
    }

    Config::default()
        .save_to_file(&config_file)
        .await
        .with_context(|| format!("Failed to write configuration file: {:?}", config_file))?;

    info!("Configuration file created successfully: {:?}", config_file);
    println!("Configuration file created: {:?}", config_file);
    println!("Edit this file to customize the agents and the review service.");

    Ok(())
}
