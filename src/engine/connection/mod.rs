//! Socket resolution and container engine connection.
//!
//! Resolves the container engine endpoint from configuration, environment, or
//! the platform default, checks that a Unix socket endpoint actually exists,
//! and opens a `Bollard` client for it.

mod error_classification;
mod probe;

use std::path::PathBuf;

use bollard::Docker;
use tracing::debug;

use crate::error::{ContainerError, RelaunchError};
use error_classification::classify_connection_error;
pub(crate) use error_classification::{is_not_found, is_not_modified};
pub use probe::{EngineProbe, VersionFuture};

/// Environment variable names checked in fallback order after configuration sources.
const FALLBACK_ENV_VARS: &[&str] = &["DOCKER_HOST", "CONTAINER_HOST", "PODMAN_HOST"];

/// Connection timeout in seconds for engine API requests.
///
/// Image builds stream through a single request, so this bounds the longest
/// build the engine may run.
const CONNECTION_TIMEOUT_SECS: u64 = 600;

/// Timeout in seconds for the liveness version query.
const VERSION_QUERY_TIMEOUT_SECS: u64 = 10;

/// Default socket path for Unix platforms.
#[cfg(unix)]
const DEFAULT_SOCKET: &str = "unix:///var/run/docker.sock";

/// Default socket path for Windows platforms.
#[cfg(windows)]
const DEFAULT_SOCKET: &str = "npipe:////./pipe/docker_engine";

/// Resolves container engine endpoints from environment variables.
///
/// # Example
///
/// ```ignore
/// use mockable::DefaultEnv;
/// use relaunch::engine::SocketResolver;
///
/// let env = DefaultEnv::new();
/// let resolver = SocketResolver::new(&env);
///
/// if let Some(socket) = resolver.resolve_from_env() {
///     println!("Found socket: {}", socket);
/// }
/// ```
pub struct SocketResolver<'a, E: mockable::Env> {
    env: &'a E,
}

impl<'a, E: mockable::Env> SocketResolver<'a, E> {
    /// Creates a new socket resolver with the given environment provider.
    #[must_use]
    pub const fn new(env: &'a E) -> Self {
        Self { env }
    }

    /// Resolves the endpoint from `DOCKER_HOST`, `CONTAINER_HOST`, then
    /// `PODMAN_HOST`, skipping unset and empty values.
    #[must_use]
    pub fn resolve_from_env(&self) -> Option<String> {
        FALLBACK_ENV_VARS
            .iter()
            .filter_map(|var_name| self.env.string(var_name))
            .find(|value| !value.is_empty())
    }

    /// Returns the platform default endpoint.
    #[must_use]
    pub const fn default_socket() -> &'static str {
        DEFAULT_SOCKET
    }
}

/// Classifies endpoint strings by scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SocketType {
    /// `unix://` socket.
    Unix,
    /// `npipe://` Windows named pipe.
    NamedPipe,
    /// HTTP, HTTPS, or TCP endpoint (TCP is rewritten to HTTP).
    Http,
    /// Bare path without scheme prefix.
    BarePath,
}

impl SocketType {
    fn classify(socket: &str) -> Self {
        if socket.starts_with("unix://") {
            Self::Unix
        } else if socket.starts_with("npipe://") {
            Self::NamedPipe
        } else if socket.starts_with("tcp://")
            || socket.starts_with("http://")
            || socket.starts_with("https://")
        {
            Self::Http
        } else {
            Self::BarePath
        }
    }
}

/// Opens connections to Docker-API-compatible container engines.
pub struct EngineConnector;

impl EngineConnector {
    /// Open a client for `socket`.
    ///
    /// Supported endpoint formats:
    /// - Unix sockets: `unix:///path/to/socket`
    /// - Windows named pipes: `npipe:////./pipe/name`
    /// - TCP: `tcp://host:port` (treated as HTTP)
    /// - HTTP and HTTPS: `http://host:port`, `https://host:port`
    /// - Bare paths: `//` or `\\` prefixes are named pipes, anything else is
    ///   a Unix socket path
    ///
    /// Opening a client does not contact the engine; use
    /// [`Self::probe_version_async`] to verify liveness.
    ///
    /// # Errors
    ///
    /// Returns a `ContainerError` classified from the `Bollard` failure.
    pub fn connect(socket: &str) -> Result<Docker, RelaunchError> {
        let result = match SocketType::classify(socket) {
            SocketType::Unix | SocketType::NamedPipe => Docker::connect_with_socket(
                socket,
                CONNECTION_TIMEOUT_SECS,
                bollard::API_DEFAULT_VERSION,
            ),
            SocketType::Http => {
                let http_socket = socket.replacen("tcp://", "http://", 1);
                Docker::connect_with_http(
                    &http_socket,
                    CONNECTION_TIMEOUT_SECS,
                    bollard::API_DEFAULT_VERSION,
                )
            }
            SocketType::BarePath => Docker::connect_with_socket(
                &Self::normalize_bare_path(socket),
                CONNECTION_TIMEOUT_SECS,
                bollard::API_DEFAULT_VERSION,
            ),
        };

        result.map_err(|error| RelaunchError::from(classify_connection_error(&error, socket)))
    }

    /// Named pipe paths start with `\\` or `//`, whatever the platform.
    fn is_pipe_path(path: &str) -> bool {
        path.starts_with("\\\\") || path.starts_with("//")
    }

    /// Prefix a bare path with the scheme its syntax implies.
    fn normalize_bare_path(path: &str) -> String {
        if Self::is_pipe_path(path) {
            format!("npipe://{path}")
        } else {
            format!("unix://{path}")
        }
    }

    /// Return the filesystem path of a Unix socket endpoint.
    ///
    /// Named pipes and network endpoints have no path to check and yield
    /// `None`.
    #[must_use]
    pub fn unix_socket_path(socket: &str) -> Option<PathBuf> {
        match SocketType::classify(socket) {
            SocketType::Unix => socket.strip_prefix("unix://").map(PathBuf::from),
            SocketType::BarePath if !Self::is_pipe_path(socket) => Some(PathBuf::from(socket)),
            _ => None,
        }
    }

    /// Check that a Unix socket endpoint exists before any engine call.
    ///
    /// # Errors
    ///
    /// Returns `ContainerError::SocketNotFound` when `socket` names a Unix
    /// socket path that is absent from the filesystem.
    pub fn ensure_socket_present(socket: &str) -> Result<(), RelaunchError> {
        let Some(path) = Self::unix_socket_path(socket) else {
            debug!(socket, "endpoint has no filesystem path to check");
            return Ok(());
        };

        if path.exists() {
            Ok(())
        } else {
            Err(ContainerError::SocketNotFound { path }.into())
        }
    }

    /// Resolve the endpoint without connecting.
    ///
    /// Resolution order:
    /// 1. `config_socket` (from CLI, config file, or `RELAUNCH_ENGINE_SOCKET`)
    /// 2. `DOCKER_HOST`, `CONTAINER_HOST`, `PODMAN_HOST` (via resolver)
    /// 3. Platform default socket
    #[must_use]
    pub fn resolve_socket<E: mockable::Env>(
        config_socket: Option<&str>,
        resolver: &SocketResolver<'_, E>,
    ) -> String {
        config_socket
            .filter(|s| !s.trim().is_empty())
            .map(String::from)
            .or_else(|| resolver.resolve_from_env())
            .unwrap_or_else(|| SocketResolver::<E>::default_socket().to_owned())
    }

    /// Create a tokio runtime for synchronous callers.
    ///
    /// # Errors
    ///
    /// Returns `ContainerError::RuntimeCreationFailed` if the runtime cannot
    /// be created.
    pub fn create_runtime() -> Result<tokio::runtime::Runtime, RelaunchError> {
        tokio::runtime::Runtime::new().map_err(|e| {
            RelaunchError::from(ContainerError::RuntimeCreationFailed {
                message: e.to_string(),
            })
        })
    }
}
