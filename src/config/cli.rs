//! Command-line argument definitions for relaunch.

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};

/// Command-line interface for relaunch.
#[derive(Debug, Parser)]
#[command(name = "relaunch")]
#[command(
    author,
    version,
    about = "Rebuild and relaunch a single named container from a local Dockerfile"
)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file.
    #[arg(long, global = true)]
    pub config: Option<Utf8PathBuf>,

    /// Container engine socket path or URL.
    #[arg(long, global = true)]
    pub engine_socket: Option<String>,

    /// Build context directory containing the Dockerfile.
    #[arg(long, global = true)]
    pub context: Option<Utf8PathBuf>,
}

/// Available subcommands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum Commands {
    /// Build the image, replace the container, and show its status.
    Up,

    /// Show the status of the managed container.
    Status,

    /// Stop and remove the managed container.
    Down,
}
