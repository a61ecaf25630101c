//! Configuration system for relaunch.
//!
//! This module provides the configuration structures and CLI definitions for the
//! relaunch application. Configuration loading and precedence merging is handled by
//! the `ortho_config` crate. Precedence: CLI flags override environment
//! variables, which override configuration files, which override defaults.
//!
//! The configuration file is expected at `~/.config/relaunch/config.toml` by default.
//!
//! # Example Configuration
//!
//! ```toml
//! engine_socket = "unix:///var/run/docker.sock"
//!
//! [build]
//! context_dir = "/srv/unhided"
//! ```

mod cli;
mod loader;
mod types;

#[cfg(test)]
mod tests;

pub use cli::{Cli, Commands};
pub use loader::{env_var_names, load_config, load_config_with_env};
pub use types::{APP_PORT, AppConfig, BUILD_DEFINITION, BuildConfig, CONTAINER_NAME, IMAGE_TAG};
