//! Configuration loading with layered precedence.
//!
//! Loads configuration with the precedence order (lowest to highest):
//! application defaults, configuration file, environment variables,
//! command-line arguments.
//!
//! Layers are composed manually with `MergeComposer` rather than through the
//! derive-generated `load()`, because the `Cli` struct owns subcommand
//! dispatch and the `--config` flag, and because environment values must be
//! validated fail-fast: Figment silently drops unparseable values.
//!
//! # Environment Variable Handling
//!
//! `RELAUNCH_ENGINE_SOCKET` is always accepted; a blank value means "unset".
//! `RELAUNCH_BUILD_CONTEXT_DIR` must name a path, so a blank value fails with
//! `ConfigError::InvalidValue` instead of silently building the working
//! directory.

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use mockable::DefaultEnv;
use ortho_config::discovery::ConfigDiscovery;
use ortho_config::serde_json::{self, Map, Value};
use ortho_config::{MergeComposer, toml};

use crate::config::{AppConfig, Cli};
use crate::error::{ConfigError, Result};

/// The type of value expected from an environment variable.
#[derive(Clone, Copy)]
enum EnvVarType {
    /// String value (always accepted).
    String,
    /// Filesystem path. Blank values return an error.
    Path,
}

/// Specification for a single environment variable mapping.
struct EnvVarSpec {
    /// The environment variable name (e.g., `RELAUNCH_ENGINE_SOCKET`).
    env_var: &'static str,
    /// The JSON path segments (e.g., `["build", "context_dir"]`).
    path: &'static [&'static str],
    /// The expected value type.
    var_type: EnvVarType,
}

/// Table of all environment variables and their JSON paths.
const ENV_VAR_SPECS: &[EnvVarSpec] = &[
    EnvVarSpec {
        env_var: "RELAUNCH_ENGINE_SOCKET",
        path: &["engine_socket"],
        var_type: EnvVarType::String,
    },
    EnvVarSpec {
        env_var: "RELAUNCH_BUILD_CONTEXT_DIR",
        path: &["build", "context_dir"],
        var_type: EnvVarType::Path,
    },
];

/// Returns the list of environment variable names recognised by the config loader.
///
/// This is primarily useful for tests that need to clear all `RELAUNCH_*` environment
/// variables to ensure isolation. Using this function instead of a hard-coded list
/// ensures the test stays in sync with the loader's actual environment variable
/// mappings.
#[must_use]
pub fn env_var_names() -> Vec<&'static str> {
    ENV_VAR_SPECS.iter().map(|spec| spec.env_var).collect()
}

/// Read and parse the TOML file at `path`.
///
/// The parent directory is opened through `cap_std` and the file read
/// relative to it.
fn read_config_file(path: &Utf8Path) -> Result<Value> {
    let parent = path
        .parent()
        .filter(|dir| !dir.as_str().is_empty())
        .unwrap_or(Utf8Path::new("."));
    let file_name = path.file_name().unwrap_or(path.as_str());

    let parse_error = |message: String| ConfigError::ParseError { message };

    let dir = Dir::open_ambient_dir(parent, ambient_authority())
        .map_err(|e| parse_error(format!("failed to open directory {parent}: {e}")))?;
    let content = dir
        .read_to_string(file_name)
        .map_err(|e| parse_error(format!("failed to read {path}: {e}")))?;

    let value = toml::from_str::<Value>(&content)
        .map_err(|e| parse_error(format!("failed to parse {path}: {e}")))?;
    Ok(value)
}

/// Pick the configuration file: the `--config` path when given, else the
/// first existing discovery candidate.
///
/// # Errors
///
/// Returns `ConfigError::ParseError` when `--config` names a missing file.
fn discover_config_path(cli: &Cli) -> Result<Option<Utf8PathBuf>> {
    if let Some(explicit) = &cli.config {
        if !explicit.exists() {
            return Err(ConfigError::ParseError {
                message: format!("configuration file {explicit} does not exist"),
            }
            .into());
        }
        return Ok(Some(explicit.clone()));
    }

    Ok(ConfigDiscovery::builder("relaunch")
        .env_var("RELAUNCH_CONFIG_PATH")
        .config_file_name("config.toml")
        .dotfile_name(".relaunch.toml")
        .build()
        .candidates()
        .into_iter()
        .filter(|candidate| candidate.exists())
        .find_map(|candidate| Utf8PathBuf::try_from(candidate).ok()))
}

/// Load configuration with full layer precedence.
///
/// This function loads configuration from all available sources:
/// 1. Application defaults defined in the struct
/// 2. Configuration file (discovered via XDG paths or `RELAUNCH_CONFIG_PATH`)
/// 3. Environment variables prefixed with `RELAUNCH_`
/// 4. Command-line arguments (from the provided `Cli`)
///
/// Later sources override earlier ones.
///
/// # Errors
///
/// Returns `ConfigError` if configuration loading fails due to:
/// - Malformed configuration files
/// - An explicit `--config` path that does not exist
/// - A blank `RELAUNCH_BUILD_CONTEXT_DIR`
/// - A blank `build.context_dir` after merging
pub fn load_config(cli: &Cli) -> Result<AppConfig> {
    load_config_with_env(cli, &DefaultEnv::new())
}

/// Load configuration reading environment variables through `env`.
///
/// Behaves like [`load_config`] but lets tests substitute a `mockable::MockEnv`
/// for the process environment. Configuration file discovery still consults
/// the real `RELAUNCH_CONFIG_PATH`.
///
/// # Errors
///
/// Returns the same errors as [`load_config`].
pub fn load_config_with_env<E: mockable::Env>(cli: &Cli, env: &E) -> Result<AppConfig> {
    let mut composer = MergeComposer::new();

    let defaults =
        serde_json::to_value(AppConfig::default()).map_err(|e| ConfigError::ParseError {
            message: format!("failed to serialise defaults: {e}"),
        })?;
    composer.push_defaults(defaults);

    if let Some(path) = discover_config_path(cli)? {
        let file_layer = read_config_file(&path)?;
        composer.push_file(file_layer, Some(path));
    }

    let env_values = collect_env_vars(env)?;
    if !env_values.is_null() {
        composer.push_environment(env_values);
    }

    let cli_overrides = build_cli_overrides(cli);
    if !cli_overrides.is_null() {
        composer.push_cli(cli_overrides);
    }

    let config =
        AppConfig::merge_from_layers(composer.layers()).map_err(ConfigError::OrthoConfig)?;

    Ok(config)
}

/// Collect environment variables with the `RELAUNCH_` prefix into a JSON value.
///
/// All mappings live in [`ENV_VAR_SPECS`].
///
/// # Errors
///
/// Returns `ConfigError::InvalidValue` if a path variable is blank.
fn collect_env_vars<E: mockable::Env>(env: &E) -> Result<Value> {
    let mut root = Map::new();

    for spec in ENV_VAR_SPECS {
        let Some(raw_value) = env.string(spec.env_var) else {
            continue;
        };

        if matches!(spec.var_type, EnvVarType::Path) && raw_value.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: spec.env_var.to_owned(),
                reason: String::from("expected a directory path, got an empty value"),
            }
            .into());
        }

        insert_at_path(&mut root, spec.path, Value::String(raw_value));
    }

    if root.is_empty() {
        Ok(Value::Null)
    } else {
        Ok(Value::Object(root))
    }
}

/// Insert `value` at `path`, creating intermediate objects.
///
/// A non-object already sitting on the path leaves the map unchanged.
fn insert_at_path(root: &mut Map<String, Value>, path: &[&str], value: Value) {
    let Some((&field, parents)) = path.split_last() else {
        return;
    };

    let mut current = root;
    for &segment in parents {
        match current
            .entry(segment.to_owned())
            .or_insert_with(|| Value::Object(Map::new()))
        {
            Value::Object(next) => current = next,
            _ => return,
        }
    }
    current.insert(field.to_owned(), value);
}

/// Build a JSON value containing CLI overrides.
fn build_cli_overrides(cli: &Cli) -> Value {
    let mut overrides = Map::new();

    if let Some(ref socket) = cli.engine_socket {
        overrides.insert(String::from("engine_socket"), Value::String(socket.clone()));
    }

    if let Some(ref context) = cli.context {
        let mut build = Map::new();
        build.insert(
            String::from("context_dir"),
            Value::String(context.as_str().to_owned()),
        );
        overrides.insert(String::from("build"), Value::Object(build));
    }

    if overrides.is_empty() {
        Value::Null
    } else {
        Value::Object(overrides)
    }
}
