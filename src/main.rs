mod error;
mod models;
mod services;

use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use services::command_runner::CommandRunner;
use services::config_loader::{LoggingConfig, load_scoreboard_config};
use services::snapshot_export::export_standings;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "scoreboard")]
#[command(about = "Contest scoreboard with freeze and scroll reveal")]
struct Args {
    /// TOML config file, defaults are used when it does not exist
    #[arg(short, long, default_value = "scoreboard.toml")]
    config: PathBuf,

    /// Command file, reads stdin when omitted
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Write the final standings as JSON, overrides the config
    #[arg(long)]
    export: Option<PathBuf>,
}

fn init_tracing(logging: &LoggingConfig) -> Option<WorkerGuard> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    // stdout carries the protocol
    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true);

    let _ = fs::create_dir_all(&logging.directory);
    let file_appender = tracing_appender::rolling::daily(&logging.directory, &logging.file_name);
    let (file_writer, file_guard) = tracing_appender::non_blocking(file_appender);
    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(file_writer)
        .with_target(true);

    let init_result = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init();

    if let Err(err) = init_result {
        eprintln!("tracing init failed: {err}");
        return None;
    }

    Some(file_guard)
}

fn main() -> Result<()> {
    let args = Args::parse();
    let loaded = load_scoreboard_config(&args.config)?;
    let config_found = loaded.is_some();
    let config = loaded.unwrap_or_default();
    let _log_guard = init_tracing(&config.logging);
    if config_found {
        info!("Starting scoreboard with config {}", args.config.display());
    } else {
        info!(
            "Config file not found, using defaults: {}",
            args.config.display()
        );
    }

    let stdout = io::stdout();
    let mut runner = CommandRunner::new(stdout.lock());
    let summary = match &args.input {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open command file {}", path.display()))?;
            runner.run(BufReader::new(file))?
        }
        None => runner.run(io::stdin().lock())?,
    };

    if summary.error_count > 0 {
        warn!("{} malformed lines were skipped", summary.error_count);
    }

    if let Some(export_path) = args.export.or(config.export.snapshot_path) {
        export_standings(runner.board(), &export_path)?;
    }

    Ok(())
}
