//! Classification of low-level `Bollard` errors.
//!
//! Opening a client on a Unix socket or named pipe fails eagerly when the
//! path is missing or unreadable. Those two cases get their own
//! `ContainerError` variants so the user sees which path to fix; every other
//! connection failure is `ConnectionFailed`. Engine responses are checked here
//! too, for the status codes lifecycle calls treat as benign.

use std::io::ErrorKind;
use std::path::PathBuf;

use bollard::errors::Error as BollardError;

use crate::error::ContainerError;

/// Return the filesystem path behind a `unix://` or `npipe://` endpoint.
///
/// Network endpoints and bare paths yield `None`.
pub(super) fn socket_path(socket_uri: &str) -> Option<PathBuf> {
    ["unix://", "npipe://"]
        .iter()
        .find_map(|scheme| socket_uri.strip_prefix(scheme))
        .map(PathBuf::from)
}

/// Return the first `io::Error` kind among the sources of `error`.
fn io_kind_in_sources(error: &dyn std::error::Error) -> Option<ErrorKind> {
    std::iter::successors(error.source(), |current| current.source())
        .find_map(|source| source.downcast_ref::<std::io::Error>())
        .map(std::io::Error::kind)
}

/// Return the I/O error kind that best explains `error`.
///
/// A wrapped cause wins over the outer kind, which is often `Other`.
fn io_kind(error: &BollardError) -> Option<ErrorKind> {
    match error {
        BollardError::SocketNotFoundError(_) => Some(ErrorKind::NotFound),
        BollardError::IOError { err } => {
            Some(io_kind_in_sources(err).unwrap_or_else(|| err.kind()))
        }
        other => io_kind_in_sources(other),
    }
}

/// Classify a `Bollard` connection error for the endpoint `socket_uri`.
pub(super) fn classify_connection_error(
    error: &BollardError,
    socket_uri: &str,
) -> ContainerError {
    match (io_kind(error), socket_path(socket_uri)) {
        (Some(ErrorKind::NotFound), Some(path)) => ContainerError::SocketNotFound { path },
        (Some(ErrorKind::PermissionDenied), Some(path)) => {
            ContainerError::PermissionDenied { path }
        }
        _ => ContainerError::ConnectionFailed {
            message: error.to_string(),
        },
    }
}

/// Return `true` when the engine answered with HTTP 404 Not Found.
///
/// Only this response counts as "no such container"; every other failure
/// stays an error.
pub(crate) const fn is_not_found(error: &bollard::errors::Error) -> bool {
    matches!(
        error,
        bollard::errors::Error::DockerResponseServerError {
            status_code: 404,
            ..
        }
    )
}

/// Return `true` when the engine answered with HTTP 304 Not Modified.
///
/// Stopping a container that is already stopped yields this response.
pub(crate) const fn is_not_modified(error: &bollard::errors::Error) -> bool {
    matches!(
        error,
        bollard::errors::Error::DockerResponseServerError {
            status_code: 304,
            ..
        }
    )
}
