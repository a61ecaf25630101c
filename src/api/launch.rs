//! The launch sequence: connect, build, replace, run, and report status.
//!
//! Failures are split three ways. A failed precondition (missing socket,
//! unreachable engine) halts the invocation. A missing container is a normal
//! branch. Any other failure during build or run is shown once, skips the
//! remaining build and run steps, and still lets the status display run.

use std::fmt;
use std::time::Duration;

use bollard::Docker;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use super::display::Surface;
use crate::config::{AppConfig, CONTAINER_NAME};
use crate::engine::{
    BuildRequest, BuiltImage, ContainerInspector, EngineClient, EngineConnector, LaunchRequest,
    SocketResolver,
};
use crate::error::RelaunchError;

/// Pause between a finished build and the run step.
pub const SETTLE_DELAY: Duration = Duration::from_secs(2);

const PAGE_TITLE: &str = "Docker Container Launcher";
const INTRO: &str = "This app automatically builds and runs a Docker container using the existing Dockerfile when it starts.";
const BUILDING: &str = "Building Docker image from the existing Dockerfile...";
const BUILT: &str = "Docker image built successfully!";
const STARTING: &str = "Starting Docker container...";
const REMOVED: &str = "Removed existing container.";
const NOT_FOUND: &str = "Container not found or failed to start.";

/// Opens engine clients for a resolved endpoint.
///
/// [`BollardConnector`] is the real implementation. Other implementations let
/// callers observe that no engine call happens when a precondition fails.
pub trait Connector {
    /// Client type returned by [`Self::connect`].
    type Client: EngineClient;

    /// Check the endpoint exists before connecting.
    ///
    /// # Errors
    ///
    /// Returns `ContainerError::SocketNotFound` when a Unix socket endpoint
    /// is absent.
    fn ensure_present(&self, socket: &str) -> Result<(), RelaunchError> {
        EngineConnector::ensure_socket_present(socket)
    }

    /// Open a client for `socket`.
    ///
    /// # Errors
    ///
    /// Returns a `ContainerError` when the client cannot be created.
    fn connect(&self, socket: &str) -> Result<Self::Client, RelaunchError>;
}

/// Connects through `Bollard`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BollardConnector;

impl Connector for BollardConnector {
    type Client = Docker;

    fn connect(&self, socket: &str) -> Result<Docker, RelaunchError> {
        EngineConnector::connect(socket)
    }
}

/// Step of the build and run block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchStep {
    /// Building the image.
    Build,
    /// Stopping and removing the previous container.
    RemoveExisting,
    /// Creating and starting the new container.
    Run,
}

impl fmt::Display for LaunchStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Build => "build",
            Self::RemoveExisting => "remove existing container",
            Self::Run => "run",
        };
        f.write_str(label)
    }
}

/// Why an invocation did not complete.
#[derive(Debug, Error)]
pub enum LaunchFailure {
    /// The engine could not be reached. Nothing else ran.
    #[error(transparent)]
    Precondition(RelaunchError),

    /// A build or run step failed. Later steps were skipped.
    #[error("{step} step failed: {error}")]
    Step {
        /// The step that failed.
        step: LaunchStep,
        /// The underlying error.
        #[source]
        error: RelaunchError,
    },
}

impl LaunchFailure {
    /// Return the underlying error.
    #[must_use]
    pub const fn error(&self) -> &RelaunchError {
        match self {
            Self::Precondition(error) | Self::Step { error, .. } => error,
        }
    }

    /// Return the failed step, if the failure happened after connecting.
    #[must_use]
    pub const fn step(&self) -> Option<LaunchStep> {
        match self {
            Self::Precondition(_) => None,
            Self::Step { step, .. } => Some(*step),
        }
    }
}

/// What the final status lookup found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ContainerStatus {
    /// The container exists with this engine state label.
    Found(String),
    /// No container has the managed name.
    NotFound,
    /// The lookup failed for a reason other than absence.
    Unavailable(String),
    /// The lookup did not run.
    #[default]
    NotChecked,
}

/// Structured outcome of one invocation.
#[derive(Debug, Default)]
pub struct LaunchReport {
    /// Engine version, once connected.
    pub engine_version: Option<String>,
    /// The image built in this invocation.
    pub built_image: Option<BuiltImage>,
    /// Whether a previous container was stopped and removed.
    pub removed_existing: bool,
    /// ID of the container started in this invocation.
    pub container_id: Option<String>,
    /// The failure that cut the sequence short.
    pub failure: Option<LaunchFailure>,
    /// Result of the final status lookup.
    pub status: ContainerStatus,
}

impl LaunchReport {
    /// Return `true` when nothing failed, including the status lookup.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.failure.is_none() && !matches!(self.status, ContainerStatus::Unavailable(_))
    }

    fn halted(failure: LaunchFailure) -> Self {
        Self {
            failure: Some(failure),
            ..Self::default()
        }
    }
}

/// Runs the launch sequence.
///
/// The settle delay defaults to [`SETTLE_DELAY`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchDriver {
    settle_delay: Duration,
}

impl Default for LaunchDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl LaunchDriver {
    /// Create a driver with the standard settle delay.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            settle_delay: SETTLE_DELAY,
        }
    }

    /// Replace the pause between build and run.
    #[must_use]
    pub const fn with_settle_delay(mut self, settle_delay: Duration) -> Self {
        self.settle_delay = settle_delay;
        self
    }

    /// Return the pause between build and run.
    #[must_use]
    pub const fn settle_delay(&self) -> Duration {
        self.settle_delay
    }

    /// Connect through `connector` and run the full sequence.
    #[instrument(skip_all)]
    pub async fn launch<E, S, C>(
        &self,
        config: &AppConfig,
        env: &E,
        surface: &mut S,
        connector: &C,
    ) -> LaunchReport
    where
        E: mockable::Env,
        S: Surface,
        C: Connector,
    {
        let (client, version) = match open_engine(config, env, surface, connector).await {
            Ok(opened) => opened,
            Err(failure) => return LaunchReport::halted(failure),
        };

        let mut report = self.launch_with_client(&client, config, surface).await;
        report.engine_version = Some(version);
        report
    }

    /// Run the sequence after connecting: build, settle, replace, run, and
    /// show status.
    #[instrument(skip_all)]
    pub async fn launch_with_client<C, S>(
        &self,
        client: &C,
        config: &AppConfig,
        surface: &mut S,
    ) -> LaunchReport
    where
        C: EngineClient + ?Sized,
        S: Surface,
    {
        surface.title(PAGE_TITLE);
        surface.text(INTRO);

        let mut report = LaunchReport::default();
        if let Err(failure) = self.build_and_run(client, config, surface, &mut report).await {
            warn!(error = %failure, "launch step failed");
            surface.error(format!("An error occurred: {}", failure.error()));
            report.failure = Some(failure);
        }

        report.status = display_status(client, surface).await;
        report
    }

    /// Connect through `connector` and show the container status only.
    #[instrument(skip_all)]
    pub async fn status<E, S, C>(
        &self,
        config: &AppConfig,
        env: &E,
        surface: &mut S,
        connector: &C,
    ) -> LaunchReport
    where
        E: mockable::Env,
        S: Surface,
        C: Connector,
    {
        let (client, version) = match open_engine(config, env, surface, connector).await {
            Ok(opened) => opened,
            Err(failure) => return LaunchReport::halted(failure),
        };

        LaunchReport {
            engine_version: Some(version),
            status: display_status(&client, surface).await,
            ..LaunchReport::default()
        }
    }

    /// Connect through `connector` and stop and remove the managed container.
    #[instrument(skip_all)]
    pub async fn tear_down<E, S, C>(
        &self,
        config: &AppConfig,
        env: &E,
        surface: &mut S,
        connector: &C,
    ) -> LaunchReport
    where
        E: mockable::Env,
        S: Surface,
        C: Connector,
    {
        let (client, version) = match open_engine(config, env, surface, connector).await {
            Ok(opened) => opened,
            Err(failure) => return LaunchReport::halted(failure),
        };

        let mut report = LaunchReport {
            engine_version: Some(version),
            ..LaunchReport::default()
        };
        match EngineConnector::remove_existing_async(&client, CONTAINER_NAME).await {
            Ok(true) => {
                surface.text(REMOVED);
                report.removed_existing = true;
            }
            Ok(false) => surface.text(format!("No container named {CONTAINER_NAME} to remove.")),
            Err(error) => {
                surface.error(format!("An error occurred: {error}"));
                report.failure = Some(LaunchFailure::Step {
                    step: LaunchStep::RemoveExisting,
                    error,
                });
            }
        }
        report
    }

    async fn build_and_run<C, S>(
        &self,
        client: &C,
        config: &AppConfig,
        surface: &mut S,
        report: &mut LaunchReport,
    ) -> Result<(), LaunchFailure>
    where
        C: EngineClient + ?Sized,
        S: Surface,
    {
        surface.text(BUILDING);
        let build_request = BuildRequest::from_app_config(config);
        let built = EngineConnector::build_image_async(client, &build_request, |line| {
            surface.text(line);
        })
        .await
        .map_err(|error| LaunchFailure::Step {
            step: LaunchStep::Build,
            error,
        })?;
        surface.success(BUILT);
        report.built_image = Some(built);

        debug!(delay_ms = self.settle_delay.as_millis(), "waiting for engine to settle");
        tokio::time::sleep(self.settle_delay).await;

        surface.text(STARTING);
        let removed = EngineConnector::remove_existing_async(client, CONTAINER_NAME)
            .await
            .map_err(|error| LaunchFailure::Step {
                step: LaunchStep::RemoveExisting,
                error,
            })?;
        if removed {
            surface.text(REMOVED);
        }
        report.removed_existing = removed;

        let launch_request = LaunchRequest::default();
        let container_id = EngineConnector::launch_container_async(client, &launch_request)
            .await
            .map_err(|error| LaunchFailure::Step {
                step: LaunchStep::Run,
                error,
            })?;
        surface.success(format!(
            "Container {} started successfully! Access it at {}",
            launch_request.name(),
            launch_request.access_url()
        ));
        report.container_id = Some(container_id);
        Ok(())
    }
}

/// Resolve the endpoint, check it, connect, and confirm the engine answers.
async fn open_engine<E, S, C>(
    config: &AppConfig,
    env: &E,
    surface: &mut S,
    connector: &C,
) -> Result<(C::Client, String), LaunchFailure>
where
    E: mockable::Env,
    S: Surface,
    C: Connector,
{
    let resolver = SocketResolver::new(env);
    let socket = EngineConnector::resolve_socket(config.engine_socket.as_deref(), &resolver);
    info!(socket = %socket, "connecting to container engine");

    if let Err(error) = connector.ensure_present(&socket) {
        surface.error(error.to_string());
        return Err(LaunchFailure::Precondition(error));
    }

    let connected = match connector.connect(&socket) {
        Ok(client) => EngineConnector::probe_version_async(&client)
            .await
            .map(|version| (client, version)),
        Err(error) => Err(error),
    };

    match connected {
        Ok((client, version)) => {
            surface.text(format!(
                "Connected to Docker daemon. Docker version: {version}"
            ));
            Ok((client, version))
        }
        Err(error) => {
            surface.error(format!("Failed to connect to Docker: {error}"));
            Err(LaunchFailure::Precondition(error))
        }
    }
}

async fn display_status<C, S>(client: &C, surface: &mut S) -> ContainerStatus
where
    C: ContainerInspector + ?Sized,
    S: Surface,
{
    match EngineConnector::find_container_async(client, CONTAINER_NAME).await {
        Ok(Some(status)) => {
            surface.text(format!("Container Status: {status}"));
            ContainerStatus::Found(status)
        }
        Ok(None) => {
            surface.text(NOT_FOUND);
            ContainerStatus::NotFound
        }
        Err(error) => {
            let message = error.to_string();
            surface.error(format!("Failed to read container status: {message}"));
            ContainerStatus::Unavailable(message)
        }
    }
}

/// Run the full sequence against the engine named by configuration and
/// environment.
pub async fn launch<E, S>(config: &AppConfig, env: &E, surface: &mut S) -> LaunchReport
where
    E: mockable::Env,
    S: Surface,
{
    launch_with_connector(config, env, surface, &BollardConnector).await
}

/// Run the full sequence, opening the engine through `connector`.
pub async fn launch_with_connector<E, S, C>(
    config: &AppConfig,
    env: &E,
    surface: &mut S,
    connector: &C,
) -> LaunchReport
where
    E: mockable::Env,
    S: Surface,
    C: Connector,
{
    LaunchDriver::new()
        .launch(config, env, surface, connector)
        .await
}

/// Run the post-connect sequence against an already opened client.
pub async fn launch_with_client<C, S>(client: &C, config: &AppConfig, surface: &mut S) -> LaunchReport
where
    C: EngineClient + ?Sized,
    S: Surface,
{
    LaunchDriver::new()
        .launch_with_client(client, config, surface)
        .await
}

/// Connect and show the managed container's status.
pub async fn show_status<E, S>(config: &AppConfig, env: &E, surface: &mut S) -> LaunchReport
where
    E: mockable::Env,
    S: Surface,
{
    LaunchDriver::new()
        .status(config, env, surface, &BollardConnector)
        .await
}

/// Connect and stop and remove the managed container.
pub async fn tear_down<E, S>(config: &AppConfig, env: &E, surface: &mut S) -> LaunchReport
where
    E: mockable::Env,
    S: Surface,
{
    LaunchDriver::new()
        .tear_down(config, env, surface, &BollardConnector)
        .await
}
