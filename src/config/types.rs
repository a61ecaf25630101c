//! Configuration types for relaunch.

use std::sync::Arc;

use camino::Utf8PathBuf;
use ortho_config::{OrthoConfig, OrthoError, OrthoResult, PostMergeContext, PostMergeHook};
use serde::{Deserialize, Serialize};

/// Image tag produced by the build step and consumed by the run step.
pub const IMAGE_TAG: &str = "unhided-app-image";

/// Name of the single container managed by relaunch.
pub const CONTAINER_NAME: &str = "unhided-app-container";

/// Container port published to the same host port.
pub const APP_PORT: u16 = 7860;

/// Build definition file, relative to the build context.
pub const BUILD_DEFINITION: &str = "Dockerfile";

/// Build configuration.
///
/// Only the context directory is configurable. The build definition is
/// always [`BUILD_DEFINITION`] and intermediate containers are always removed.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Directory sent to the engine as the build context.
    pub context_dir: Utf8PathBuf,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            context_dir: Utf8PathBuf::from("."),
        }
    }
}

/// Root application configuration.
///
/// Loaded from configuration files, environment variables, and command-line
/// arguments with layered precedence (lowest to highest): defaults,
/// configuration file, environment variables, command-line arguments.
///
/// Configuration files are discovered in this order:
/// 1. Path specified via `RELAUNCH_CONFIG_PATH` environment variable
/// 2. `.relaunch.toml` in the current working directory
/// 3. `.relaunch.toml` in the home directory
/// 4. `~/.config/relaunch/config.toml` (XDG default)
///
/// The image tag, container name, port, and build definition are
/// compile-time constants ([`IMAGE_TAG`], [`CONTAINER_NAME`], [`APP_PORT`],
/// [`BUILD_DEFINITION`]) and are not configurable.
#[derive(Debug, Clone, Default, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(
    prefix = "RELAUNCH",
    post_merge_hook,
    discovery(
        app_name = "relaunch",
        env_var = "RELAUNCH_CONFIG_PATH",
        config_file_name = "config.toml",
        dotfile_name = ".relaunch.toml",
        config_cli_long = "config",
        config_cli_visible = true,
    )
)]
pub struct AppConfig {
    /// The container engine socket path or URL.
    pub engine_socket: Option<String>,

    /// Image build configuration.
    #[serde(default)]
    #[ortho_config(skip_cli)]
    pub build: BuildConfig,
}

impl PostMergeHook for AppConfig {
    fn post_merge(&mut self, _ctx: &PostMergeContext) -> OrthoResult<()> {
        if self.engine_socket.as_deref().is_some_and(|s| s.trim().is_empty()) {
            self.engine_socket = None;
        }
        if self.build.context_dir.as_str().trim().is_empty() {
            return Err(Arc::new(OrthoError::Validation {
                key: String::from("build.context_dir"),
                message: String::from("must not be empty"),
            }));
        }
        Ok(())
    }
}
