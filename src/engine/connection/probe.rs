//! Engine liveness probe via the version endpoint.
//!
//! A freshly opened client has not talked to the engine yet. The version
//! query proves the engine answers and yields the version string shown to
//! the user.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use bollard::Docker;
use bollard::models::SystemVersion;
use tracing::{debug, instrument};

use super::{EngineConnector, VERSION_QUERY_TIMEOUT_SECS};
use crate::error::{ContainerError, RelaunchError};

/// Version string reported when the engine omits one.
const UNKNOWN_VERSION: &str = "unknown";

/// Boxed future type returned by [`EngineProbe`] implementors.
pub type VersionFuture<'a> =
    Pin<Box<dyn Future<Output = Result<SystemVersion, bollard::errors::Error>> + Send + 'a>>;

/// Behaviour required to query the engine version.
pub trait EngineProbe {
    /// Query the engine's version information.
    fn version(&self) -> VersionFuture<'_>;
}

impl EngineProbe for Docker {
    fn version(&self) -> VersionFuture<'_> {
        Box::pin(async move { Self::version(self).await })
    }
}

impl EngineConnector {
    /// Query the engine version, bounded by a ten second timeout.
    ///
    /// # Errors
    ///
    /// Returns `ContainerError::VersionQueryTimeout` if the engine does not
    /// answer in time, or `ContainerError::VersionQueryFailed` if it answers
    /// with an error.
    #[instrument(skip_all)]
    pub async fn probe_version_async<P: EngineProbe + ?Sized>(
        probe: &P,
    ) -> Result<String, RelaunchError> {
        let timeout = Duration::from_secs(VERSION_QUERY_TIMEOUT_SECS);

        let version = tokio::time::timeout(timeout, probe.version())
            .await
            .map_err(|_| {
                RelaunchError::from(ContainerError::VersionQueryTimeout {
                    seconds: VERSION_QUERY_TIMEOUT_SECS,
                })
            })?
            .map_err(|e| {
                RelaunchError::from(ContainerError::VersionQueryFailed {
                    message: e.to_string(),
                })
            })?;

        let version_string = version
            .version
            .unwrap_or_else(|| String::from(UNKNOWN_VERSION));
        debug!(version = %version_string, api = ?version.api_version, "engine answered");
        Ok(version_string)
    }

    /// Query the engine version from synchronous code.
    ///
    /// Blocks on [`Self::probe_version_async`] using the caller's runtime.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`Self::probe_version_async`].
    pub fn probe_version<P: EngineProbe + ?Sized>(
        runtime: &tokio::runtime::Handle,
        probe: &P,
    ) -> Result<String, RelaunchError> {
        runtime.block_on(Self::probe_version_async(probe))
    }
}
