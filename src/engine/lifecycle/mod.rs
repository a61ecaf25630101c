//! Lookup, replacement, and launch of the managed container.
//!
//! A missing container is an expected state, so lookups return `Option`.
//! Only an HTTP 404 from the engine counts as missing; every other failure
//! is surfaced as a `ContainerError`.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use bollard::Docker;
use bollard::models::{
    ContainerCreateBody, ContainerCreateResponse, ContainerInspectResponse, HostConfig, PortBinding,
};
use bollard::query_parameters::{
    CreateContainerOptions, CreateContainerOptionsBuilder, InspectContainerOptions,
    RemoveContainerOptions, StartContainerOptions, StopContainerOptions,
};
use tracing::{debug, info, instrument};

use super::EngineConnector;
use super::connection::{is_not_found, is_not_modified};
use crate::config::{APP_PORT, CONTAINER_NAME, IMAGE_TAG};
use crate::error::{ContainerError, RelaunchError};

/// Status label used when the engine omits the container state.
const UNKNOWN_STATUS: &str = "unknown";

/// Boxed future type returned by [`ContainerInspector`] implementors.
pub type InspectContainerFuture<'a> = Pin<
    Box<dyn Future<Output = Result<ContainerInspectResponse, bollard::errors::Error>> + Send + 'a>,
>;

/// Boxed future type for engine calls without a response body.
pub type ContainerActionFuture<'a> =
    Pin<Box<dyn Future<Output = Result<(), bollard::errors::Error>> + Send + 'a>>;

/// Boxed future type returned by [`ContainerLauncher::create_container`].
pub type CreateContainerFuture<'a> = Pin<
    Box<dyn Future<Output = Result<ContainerCreateResponse, bollard::errors::Error>> + Send + 'a>,
>;

/// Behaviour required to look up a container by name.
pub trait ContainerInspector {
    /// Inspect the container called `name`.
    fn inspect_container(
        &self,
        name: &str,
        options: Option<InspectContainerOptions>,
    ) -> InspectContainerFuture<'_>;
}

/// Behaviour required to stop and remove a container.
pub trait ContainerRemover {
    /// Stop the container called `name`.
    fn stop_container(
        &self,
        name: &str,
        options: Option<StopContainerOptions>,
    ) -> ContainerActionFuture<'_>;

    /// Remove the container called `name`.
    fn remove_container(
        &self,
        name: &str,
        options: Option<RemoveContainerOptions>,
    ) -> ContainerActionFuture<'_>;
}

/// Behaviour required to create and start a container.
pub trait ContainerLauncher {
    /// Create a container from `Bollard` options and body payload.
    fn create_container(
        &self,
        options: Option<CreateContainerOptions>,
        config: ContainerCreateBody,
    ) -> CreateContainerFuture<'_>;

    /// Start the created container called `name`.
    fn start_container(
        &self,
        name: &str,
        options: Option<StartContainerOptions>,
    ) -> ContainerActionFuture<'_>;
}

impl ContainerInspector for Docker {
    fn inspect_container(
        &self,
        name: &str,
        options: Option<InspectContainerOptions>,
    ) -> InspectContainerFuture<'_> {
        let name_owned = String::from(name);
        Box::pin(async move { Self::inspect_container(self, &name_owned, options).await })
    }
}

impl ContainerRemover for Docker {
    fn stop_container(
        &self,
        name: &str,
        options: Option<StopContainerOptions>,
    ) -> ContainerActionFuture<'_> {
        let name_owned = String::from(name);
        Box::pin(async move { Self::stop_container(self, &name_owned, options).await })
    }

    fn remove_container(
        &self,
        name: &str,
        options: Option<RemoveContainerOptions>,
    ) -> ContainerActionFuture<'_> {
        let name_owned = String::from(name);
        Box::pin(async move { Self::remove_container(self, &name_owned, options).await })
    }
}

impl ContainerLauncher for Docker {
    fn create_container(
        &self,
        options: Option<CreateContainerOptions>,
        config: ContainerCreateBody,
    ) -> CreateContainerFuture<'_> {
        Box::pin(async move { Self::create_container(self, options, config).await })
    }

    fn start_container(
        &self,
        name: &str,
        options: Option<StartContainerOptions>,
    ) -> ContainerActionFuture<'_> {
        let name_owned = String::from(name);
        Box::pin(async move { Self::start_container(self, &name_owned, options).await })
    }
}

/// Parameters for starting the managed container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchRequest {
    image: String,
    name: String,
    port: u16,
}

impl LaunchRequest {
    /// Create a request running `image` as `name`, publishing `port` on the
    /// same host port.
    #[must_use]
    pub fn new(image: impl Into<String>, name: impl Into<String>, port: u16) -> Self {
        Self {
            image: image.into(),
            name: name.into(),
            port,
        }
    }

    /// Return the image to run.
    #[must_use]
    pub fn image(&self) -> &str {
        &self.image
    }

    /// Return the container name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return the published port.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Return the URL the published app answers on.
    #[must_use]
    pub fn access_url(&self) -> String {
        format!("http://localhost:{}", self.port)
    }
}

impl Default for LaunchRequest {
    fn default() -> Self {
        Self::new(IMAGE_TAG, CONTAINER_NAME, APP_PORT)
    }
}

impl EngineConnector {
    /// Look up the container called `name` and return its status label.
    ///
    /// Returns `Ok(None)` when the engine reports the container missing.
    ///
    /// # Errors
    ///
    /// Returns `ContainerError::InspectFailed` for any other engine failure.
    #[instrument(skip(inspector))]
    pub async fn find_container_async<I: ContainerInspector + ?Sized>(
        inspector: &I,
        name: &str,
    ) -> Result<Option<String>, RelaunchError> {
        match inspector.inspect_container(name, None).await {
            Ok(response) => {
                let status = response
                    .state
                    .and_then(|state| state.status)
                    .map_or_else(|| String::from(UNKNOWN_STATUS), |status| status.to_string());
                debug!(status = %status, "container found");
                Ok(Some(status))
            }
            Err(error) if is_not_found(&error) => {
                debug!("container not found");
                Ok(None)
            }
            Err(error) => Err(ContainerError::InspectFailed {
                container: String::from(name),
                message: error.to_string(),
            }
            .into()),
        }
    }

    /// Stop and remove the container called `name` if it exists.
    ///
    /// Returns `true` when a container was removed and `false` when there
    /// was nothing to remove. A container that disappears between lookup and
    /// removal also counts as nothing removed.
    ///
    /// # Errors
    ///
    /// Returns `ContainerError::InspectFailed`, `StopFailed`, or
    /// `RemoveFailed` for engine failures other than absence.
    #[instrument(skip(client))]
    pub async fn remove_existing_async<C>(client: &C, name: &str) -> Result<bool, RelaunchError>
    where
        C: ContainerInspector + ContainerRemover + ?Sized,
    {
        if Self::find_container_async(client, name).await?.is_none() {
            return Ok(false);
        }

        match client.stop_container(name, None).await {
            Ok(()) => {}
            Err(error) if is_not_modified(&error) => debug!("container already stopped"),
            Err(error) if is_not_found(&error) => return Ok(false),
            Err(error) => {
                return Err(ContainerError::StopFailed {
                    container: String::from(name),
                    message: error.to_string(),
                }
                .into());
            }
        }

        match client.remove_container(name, None).await {
            Ok(()) => {
                info!("removed existing container");
                Ok(true)
            }
            Err(error) if is_not_found(&error) => Ok(false),
            Err(error) => Err(ContainerError::RemoveFailed {
                container: String::from(name),
                message: error.to_string(),
            }
            .into()),
        }
    }

    /// Create and start a detached container with its port published.
    ///
    /// Returns the engine-assigned container ID.
    ///
    /// # Errors
    ///
    /// Returns `ContainerError::CreateFailed` or `ContainerError::StartFailed`
    /// when the engine rejects the request.
    #[instrument(skip_all, fields(name = request.name(), image = request.image()))]
    pub async fn launch_container_async<L: ContainerLauncher + ?Sized>(
        launcher: &L,
        request: &LaunchRequest,
    ) -> Result<String, RelaunchError> {
        let response = launcher
            .create_container(Some(build_create_options(request)), build_create_body(request))
            .await
            .map_err(|error| {
                RelaunchError::from(ContainerError::CreateFailed {
                    message: error.to_string(),
                })
            })?;
        for warning in &response.warnings {
            debug!(warning = %warning, "engine create warning");
        }

        launcher
            .start_container(request.name(), None)
            .await
            .map_err(|error| {
                RelaunchError::from(ContainerError::StartFailed {
                    container: String::from(request.name()),
                    message: error.to_string(),
                })
            })?;

        info!(id = %response.id, "container started");
        Ok(response.id)
    }

    /// Look up a container from synchronous code.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`Self::find_container_async`].
    pub fn find_container<I: ContainerInspector + ?Sized>(
        runtime: &tokio::runtime::Handle,
        inspector: &I,
        name: &str,
    ) -> Result<Option<String>, RelaunchError> {
        runtime.block_on(Self::find_container_async(inspector, name))
    }

    /// Stop and remove a container from synchronous code.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`Self::remove_existing_async`].
    pub fn remove_existing<C>(
        runtime: &tokio::runtime::Handle,
        client: &C,
        name: &str,
    ) -> Result<bool, RelaunchError>
    where
        C: ContainerInspector + ContainerRemover + ?Sized,
    {
        runtime.block_on(Self::remove_existing_async(client, name))
    }

    /// Launch a container from synchronous code.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`Self::launch_container_async`].
    pub fn launch_container<L: ContainerLauncher + ?Sized>(
        runtime: &tokio::runtime::Handle,
        launcher: &L,
        request: &LaunchRequest,
    ) -> Result<String, RelaunchError> {
        runtime.block_on(Self::launch_container_async(launcher, request))
    }
}

fn build_create_options(request: &LaunchRequest) -> CreateContainerOptions {
    CreateContainerOptionsBuilder::new()
        .name(request.name())
        .build()
}

fn build_create_body(request: &LaunchRequest) -> ContainerCreateBody {
    ContainerCreateBody {
        image: Some(String::from(request.image())),
        host_config: Some(build_host_config(request.port())),
        ..ContainerCreateBody::default()
    }
}

fn build_host_config(port: u16) -> HostConfig {
    let binding = PortBinding {
        host_ip: None,
        host_port: Some(port.to_string()),
    };

    HostConfig {
        port_bindings: Some(HashMap::from([(
            container_port_key(port),
            Some(vec![binding]),
        )])),
        ..HostConfig::default()
    }
}

fn container_port_key(port: u16) -> String {
    format!("{port}/tcp")
}
