//! Container engine connection and management.
//!
//! This module provides the interface for connecting to Docker or Podman
//! container engines and driving the build and run lifecycle of the managed
//! container. The socket endpoint is resolved through a priority-based
//! fallback chain:
//!
//! 1. CLI argument (`--engine-socket`)
//! 2. Config file (`engine_socket` in TOML)
//! 3. `RELAUNCH_ENGINE_SOCKET` environment variable
//! 4. `DOCKER_HOST` environment variable
//! 5. `CONTAINER_HOST` environment variable
//! 6. `PODMAN_HOST` environment variable
//! 7. Platform default (`/var/run/docker.sock` on Unix)
//!
//! Each engine call sits behind a narrow capability trait implemented for
//! [`bollard::Docker`], so orchestration code can run against test doubles.

mod build;
mod connection;
mod lifecycle;

pub use build::{BuildRequest, BuildStream, BuiltImage, ImageBuilder, pack_build_context};
pub use connection::{EngineConnector, EngineProbe, SocketResolver, VersionFuture};
pub use lifecycle::{
    ContainerActionFuture, ContainerInspector, ContainerLauncher, ContainerRemover,
    CreateContainerFuture, InspectContainerFuture, LaunchRequest,
};

/// Every engine capability the launch sequence needs.
///
/// Implemented automatically for any type providing all of them, including
/// [`bollard::Docker`].
pub trait EngineClient:
    EngineProbe + ImageBuilder + ContainerInspector + ContainerRemover + ContainerLauncher
{
}

impl<T> EngineClient for T where
    T: EngineProbe + ImageBuilder + ContainerInspector + ContainerRemover + ContainerLauncher + ?Sized
{
}
