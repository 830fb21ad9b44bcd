//! CLI entrypoint for gapwise
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use gapwise_application::{
    AutoApproveCheckpoint, AutoRejectCheckpoint, HumanCheckpointPort, NoProgress,
    PipelineProgressNotifier, RunPipelineUseCase, WorldModelHandle, WorldModelStore,
};
use gapwise_domain::{ConfigIssueCode, OutputFormat, PipelineRun, RunId};
use gapwise_infrastructure::{
    BuiltinToolExecutor, ConfigLoader, ConfiguredGateway, FileConfig, JsonCheckpointStore,
    JsonSensedItems, JsonWorldModelStore, JsonlInferenceLogger,
};
use gapwise_presentation::{
    Cli, ConsoleFormatter, InteractiveCheckpoint, OutputFormatter, ProgressReporter,
    SimpleProgress,
};
use std::io::IsTerminal;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

/// Exit code of a run that ended paused.
const EXIT_PAUSED: u8 = 2;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    if cli.show_config {
        ConfigLoader::print_config_sources(cli.config.as_ref());
        return Ok(ExitCode::SUCCESS);
    }

    let mut config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_ref())
            .map_err(|e| anyhow!("Failed to load configuration: {}", e))?
    };
    if let Some(path) = &cli.world_model {
        config.storage.world_model = Some(path.display().to_string());
    }
    if let Some(path) = &cli.inbox {
        config.storage.sensed_items = Some(path.display().to_string());
    }

    let _log_guard = init_logging(cli.verbose, &config)?;
    info!("Starting gapwise");

    check_config(&config, cli.offline)?;

    if !config.output.color {
        colored::control::set_override(false);
    }
    let format: OutputFormat = cli
        .output
        .map(Into::into)
        .or(config.output.format)
        .unwrap_or_default();

    // === Dependency Injection ===
    let gateway = Arc::new(ConfiguredGateway::from_config(&config, cli.offline)?);
    let tools = Arc::new(BuiltinToolExecutor::new());

    let store = Arc::new(JsonWorldModelStore::new(config.storage.world_model_path()));
    let model = store
        .load()
        .await
        .with_context(|| format!("Failed to load world model from {}", store.path().display()))?;
    let source = Arc::new(JsonSensedItems::new(config.storage.sensed_items_path()));
    let checkpoints = Arc::new(JsonCheckpointStore::new(
        config.storage.checkpoint_dir_path(),
    ));

    let cancellation = CancellationToken::new();
    spawn_interrupt_handler(cancellation.clone());

    let mut pipeline = RunPipelineUseCase::new(
        gateway,
        tools,
        WorldModelHandle::new(model),
        store,
        source,
    )
    .with_params(config.to_pipeline_params())
    .with_checkpoint_store(checkpoints)
    .with_cancellation(cancellation);

    if let Some(dir) = config.logging.inference_log_dir() {
        match JsonlInferenceLogger::in_dir(&dir) {
            Some(logger) => {
                info!("Inference transcript: {}", logger.path().display());
                pipeline = pipeline.with_inference_logger(Arc::new(logger));
            }
            None => warn!("Inference log disabled: cannot write to {}", dir.display()),
        }
    }

    let checkpoint: Box<dyn HumanCheckpointPort> = if cli.auto_approve {
        Box::new(AutoApproveCheckpoint)
    } else if cli.auto_reject {
        Box::new(AutoRejectCheckpoint)
    } else {
        Box::new(InteractiveCheckpoint::new())
    };

    let progress: Box<dyn PipelineProgressNotifier> = if cli.quiet {
        Box::new(NoProgress)
    } else if std::io::stderr().is_terminal() {
        Box::new(ProgressReporter::new())
    } else if format == OutputFormat::Json {
        Box::new(NoProgress)
    } else {
        Box::new(SimpleProgress)
    };

    let resume_id = match &cli.resume {
        None => None,
        Some(_) if cli.resume_latest() => match pipeline.latest_run().await? {
            Some(run) => Some(run.id),
            None => bail!("No saved run to resume"),
        },
        Some(id) => Some(RunId::new(id.as_str())),
    };

    if !cli.quiet && format != OutputFormat::Json {
        print_header(&config, resume_id.as_ref(), cli.offline);
    }

    let run = match &resume_id {
        Some(id) => {
            pipeline
                .resume_to_completion(id, checkpoint.as_ref(), progress.as_ref())
                .await?
        }
        None => {
            pipeline
                .run_to_completion_with_progress(checkpoint.as_ref(), progress.as_ref())
                .await?
        }
    };

    println!("{}", ConsoleFormatter.format(&run, format));

    Ok(exit_code(&run))
}

/// Stderr filtered by `-v`, plus a daily rolling file when `[logging].dir` is set.
fn init_logging(verbose: u8, config: &FileConfig) -> Result<Option<WorkerGuard>> {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace", // -vvv or more
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::new(level));

    let (file_layer, guard) = match config.logging.log_dir() {
        Some(dir) => {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(&dir, "gapwise.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(EnvFilter::new("debug"));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .init();

    Ok(guard)
}

/// Warnings are logged; errors abort before anything runs.
fn check_config(config: &FileConfig, offline: bool) -> Result<()> {
    let mut fatal = Vec::new();
    for issue in config.validate() {
        // --offline never reaches the remote provider
        if offline && issue.code == ConfigIssueCode::MissingApiKey {
            continue;
        }
        if issue.is_error() {
            fatal.push(issue.message);
        } else {
            warn!("Config: {}", issue.message);
        }
    }
    if !fatal.is_empty() {
        bail!("Invalid configuration:\n  {}", fatal.join("\n  "));
    }
    Ok(())
}

/// First Ctrl-C stops the run at the next stage boundary; the second exits.
fn spawn_interrupt_handler(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        eprintln!("\nStopping at the next stage boundary (Ctrl-C again to exit)");
        token.cancel();
        if tokio::signal::ctrl_c().await.is_ok() {
            std::process::exit(130);
        }
    });
}

fn print_header(config: &FileConfig, resume: Option<&RunId>, offline: bool) {
    let provider = if offline {
        "offline"
    } else {
        config.inference.provider.as_str()
    };
    println!();
    println!("+============================================================+");
    println!("|           gapwise - close the gap                          |");
    println!("+============================================================+");
    println!();
    println!("World model: {}", config.storage.world_model_path().display());
    println!("Items:       {}", config.storage.sensed_items_path().display());
    println!("Provider:    {}", provider);
    if let Some(id) = resume {
        println!("Resuming:    {}", id);
    }
    println!();
}

fn exit_code(run: &PipelineRun) -> ExitCode {
    if run.state().is_paused() {
        ExitCode::from(EXIT_PAUSED)
    } else {
        ExitCode::SUCCESS
    }
}
