//! `relaunch` application entry point.
//!
//! Rebuilds the app image from the local `Dockerfile`, replaces the running
//! container, and reports its status. It uses `eyre` for opaque error
//! handling at the application boundary, converting domain-specific errors
//! into human-readable reports.
//!
//! Configuration is loaded with layered precedence via `OrthoConfig`:
//! 1. Application defaults
//! 2. Configuration file (`~/.config/relaunch/config.toml` or path from `RELAUNCH_CONFIG_PATH`)
//! 3. Environment variables (`RELAUNCH_*`)
//! 4. Command-line arguments

use std::process::ExitCode;

use clap::Parser;
use eyre::{Report, Result as EyreResult};
use mockable::DefaultEnv;
use relaunch::api::{LaunchReport, TerminalSurface, launch, show_status, tear_down};
use relaunch::config::{AppConfig, Cli, Commands, load_config};
use relaunch::engine::EngineConnector;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Application entry point.
///
/// Loads configuration, runs the selected command on a fresh runtime, and
/// maps the launch report to the process exit code. Progress goes to stdout
/// through the terminal surface; diagnostics go to stderr through `tracing`.
fn main() -> EyreResult<ExitCode> {
    init_tracing();

    let cli = Cli::parse();

    // Load configuration with layered precedence: defaults < file < env < CLI.
    let config = load_config(&cli).map_err(Report::from)?;
    let runtime = EngineConnector::create_runtime().map_err(Report::from)?;

    let report = runtime.block_on(run(cli.command, &config));
    debug!(?report, "command finished");

    Ok(if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Dispatch `command` to its orchestration function.
async fn run(command: Commands, config: &AppConfig) -> LaunchReport {
    let env = DefaultEnv::new();
    let mut surface = TerminalSurface::stdout();

    match command {
        Commands::Up => launch(config, &env, &mut surface).await,
        Commands::Status => show_status(config, &env, &mut surface).await,
        Commands::Down => tear_down(config, &env, &mut surface).await,
    }
}

/// Install the stderr log subscriber, honouring `RUST_LOG` and defaulting to
/// `warn`.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
