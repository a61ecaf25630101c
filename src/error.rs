//! Semantic error types for the relaunch application.
//!
//! Conditions a caller might inspect or classify are modelled as `thiserror`
//! enums. Opaque `eyre::Report` values are reserved for the binary boundary.
//!
//! A container that does not exist is never an error here: lookups return
//! `Option` so the "expected absence" branch stays out of the error channel.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be parsed.
    #[error("failed to parse configuration file: {message}")]
    ParseError {
        /// A description of the parse error.
        message: String,
    },

    /// A configuration value failed validation.
    #[error("invalid configuration value for '{field}': {reason}")]
    InvalidValue {
        /// The name of the invalid field.
        field: String,
        /// The reason the value is invalid.
        reason: String,
    },

    /// The `OrthoConfig` library returned an error during layer merging.
    #[error("configuration loading failed: {0}")]
    OrthoConfig(Arc<ortho_config::OrthoError>),
}

/// Errors raised while talking to the container engine.
#[derive(Debug, Error)]
pub enum ContainerError {
    /// The container engine socket was not found.
    #[error(
        "Docker socket not found at {}. Ensure the socket is mounted with -v {}:{}.",
        path.display(),
        path.display(),
        path.display()
    )]
    SocketNotFound {
        /// The path where the socket was expected.
        path: PathBuf,
    },

    /// Permission denied when accessing the container engine socket.
    #[error("permission denied accessing container socket: {}", path.display())]
    PermissionDenied {
        /// The path to the socket.
        path: PathBuf,
    },

    /// Failed to connect to the container engine.
    #[error("failed to connect to container engine: {message}")]
    ConnectionFailed {
        /// A description of the connection failure.
        message: String,
    },

    /// The engine did not answer the version query.
    #[error("container engine version query failed: {message}")]
    VersionQueryFailed {
        /// A description of the failure.
        message: String,
    },

    /// The version query did not complete in time.
    #[error("container engine version query timed out after {seconds} seconds")]
    VersionQueryTimeout {
        /// The timeout duration in seconds.
        seconds: u64,
    },

    /// The engine rejected or aborted the image build.
    #[error("failed to build image '{image}': {message}")]
    BuildFailed {
        /// The image tag being built.
        image: String,
        /// A description of the build failure.
        message: String,
    },

    /// Looking up a container failed for a reason other than absence.
    #[error("failed to inspect container '{container}': {message}")]
    InspectFailed {
        /// The container name.
        container: String,
        /// A description of the failure.
        message: String,
    },

    /// Stopping a container failed.
    #[error("failed to stop container '{container}': {message}")]
    StopFailed {
        /// The container name.
        container: String,
        /// A description of the failure.
        message: String,
    },

    /// Removing a container failed.
    #[error("failed to remove container '{container}': {message}")]
    RemoveFailed {
        /// The container name.
        container: String,
        /// A description of the failure.
        message: String,
    },

    /// Failed to create a container.
    #[error("failed to create container: {message}")]
    CreateFailed {
        /// A description of the creation failure.
        message: String,
    },

    /// Failed to start a container.
    #[error("failed to start container '{container}': {message}")]
    StartFailed {
        /// The name or ID of the container that failed to start.
        container: String,
        /// A description of the start failure.
        message: String,
    },

    /// The async runtime could not be created.
    #[error("failed to create async runtime: {message}")]
    RuntimeCreationFailed {
        /// A description of the failure.
        message: String,
    },
}

/// Errors that can occur during filesystem operations.
#[derive(Debug, Error)]
pub enum FilesystemError {
    /// A file or directory was not found.
    #[error("path not found: {}", path.display())]
    NotFound {
        /// The path that was not found.
        path: PathBuf,
    },

    /// An I/O error occurred.
    #[error("I/O error at '{}': {message}", path.display())]
    IoError {
        /// The path where the error occurred.
        path: PathBuf,
        /// A description of the I/O error.
        message: String,
    },
}

/// Top-level error type for the relaunch application.
#[derive(Debug, Error)]
pub enum RelaunchError {
    /// An error occurred during configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// An error occurred while driving the container engine.
    #[error(transparent)]
    Container(#[from] ContainerError),

    /// An error occurred during filesystem operations.
    #[error(transparent)]
    Filesystem(#[from] FilesystemError),
}

/// A specialised `Result` type for relaunch operations.
pub type Result<T> = std::result::Result<T, RelaunchError>;
