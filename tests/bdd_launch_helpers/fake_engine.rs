//! In-memory container engine for launch scenarios.
//!
//! Holds a single container slot and records every call so scenarios can
//! assert the exact identifiers the driver sends.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bollard::models::{
    BuildInfo, ContainerCreateBody, ContainerCreateResponse, ContainerInspectResponse,
    ContainerState, ContainerStateStatusEnum, ErrorDetail, SystemVersion,
};
use bollard::query_parameters::{
    BuildImageOptions, CreateContainerOptions, InspectContainerOptions, RemoveContainerOptions,
    StartContainerOptions, StopContainerOptions,
};
use relaunch::api::Connector;
use relaunch::engine::{
    BuildStream, ContainerActionFuture, ContainerInspector, ContainerLauncher, ContainerRemover,
    CreateContainerFuture, EngineProbe, ImageBuilder, InspectContainerFuture, VersionFuture,
};
use relaunch::error::RelaunchError;

/// One call received by the fake engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum EngineCall {
    Version,
    Build {
        tag: Option<String>,
        dockerfile: String,
        rm: bool,
    },
    Inspect(String),
    Stop(String),
    Remove(String),
    Create {
        name: Option<String>,
        image: Option<String>,
        published: Vec<(String, Option<String>)>,
    },
    Start(String),
}

/// Scripted engine behaviour.
#[derive(Debug, Default)]
pub(crate) struct EngineScript {
    pub(crate) answers_version: bool,
    pub(crate) build_entries: Vec<BuildInfo>,
    pub(crate) build_error: Option<String>,
    pub(crate) start_error: Option<String>,
    pub(crate) container: Option<ContainerStateStatusEnum>,
    pub(crate) calls: Vec<EngineCall>,
}

/// Cloneable handle to a shared scripted engine.
#[derive(Debug, Clone)]
pub(crate) struct FakeEngine {
    script: Arc<Mutex<EngineScript>>,
}

impl Default for FakeEngine {
    fn default() -> Self {
        Self {
            script: Arc::new(Mutex::new(EngineScript {
                answers_version: true,
                ..EngineScript::default()
            })),
        }
    }
}

fn server_error(status_code: u16, message: &str) -> bollard::errors::Error {
    bollard::errors::Error::DockerResponseServerError {
        status_code,
        message: String::from(message),
    }
}

impl FakeEngine {
    pub(crate) fn script(&self) -> MutexGuard<'_, EngineScript> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn calls(&self) -> Vec<EngineCall> {
        self.script().calls.clone()
    }

    fn record(&self, call: EngineCall) {
        self.script().calls.push(call);
    }
}

impl EngineProbe for FakeEngine {
    fn version(&self) -> VersionFuture<'_> {
        self.record(EngineCall::Version);
        let result = if self.script().answers_version {
            Ok(SystemVersion {
                version: Some(String::from("27.3.1")),
                ..SystemVersion::default()
            })
        } else {
            Err(bollard::errors::Error::IOError {
                err: std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused"),
            })
        };
        Box::pin(async move { result })
    }
}

impl ImageBuilder for FakeEngine {
    fn build_image(&self, options: BuildImageOptions, _context_tar: Vec<u8>) -> BuildStream<'_> {
        self.record(EngineCall::Build {
            tag: options.t,
            dockerfile: options.dockerfile,
            rm: options.rm,
        });
        let script = self.script();
        let mut entries: Vec<Result<BuildInfo, bollard::errors::Error>> =
            script.build_entries.iter().cloned().map(Ok).collect();
        if let Some(message) = &script.build_error {
            entries.push(Ok(BuildInfo {
                error_detail: Some(ErrorDetail {
                    code: None,
                    message: Some(message.clone()),
                }),
                ..BuildInfo::default()
            }));
        }
        Box::pin(futures_util::stream::iter(entries))
    }
}

impl ContainerInspector for FakeEngine {
    fn inspect_container(
        &self,
        name: &str,
        _options: Option<InspectContainerOptions>,
    ) -> InspectContainerFuture<'_> {
        self.record(EngineCall::Inspect(String::from(name)));
        let result = self.script().container.clone().map_or_else(
            || Err(server_error(404, "No such container")),
            |status| {
                Ok(ContainerInspectResponse {
                    state: Some(ContainerState {
                        status: Some(status),
                        ..ContainerState::default()
                    }),
                    ..ContainerInspectResponse::default()
                })
            },
        );
        Box::pin(async move { result })
    }
}

impl ContainerRemover for FakeEngine {
    fn stop_container(
        &self,
        name: &str,
        _options: Option<StopContainerOptions>,
    ) -> ContainerActionFuture<'_> {
        self.record(EngineCall::Stop(String::from(name)));
        self.script().container = Some(ContainerStateStatusEnum::EXITED);
        Box::pin(async { Ok(()) })
    }

    fn remove_container(
        &self,
        name: &str,
        _options: Option<RemoveContainerOptions>,
    ) -> ContainerActionFuture<'_> {
        self.record(EngineCall::Remove(String::from(name)));
        self.script().container = None;
        Box::pin(async { Ok(()) })
    }
}

impl ContainerLauncher for FakeEngine {
    fn create_container(
        &self,
        options: Option<CreateContainerOptions>,
        config: ContainerCreateBody,
    ) -> CreateContainerFuture<'_> {
        let published = config
            .host_config
            .and_then(|host| host.port_bindings)
            .map(|bindings| {
                bindings
                    .into_iter()
                    .flat_map(|(container_port, host_bindings)| {
                        host_bindings
                            .unwrap_or_default()
                            .into_iter()
                            .map(move |binding| (container_port.clone(), binding.host_port))
                    })
                    .collect()
            })
            .unwrap_or_default();
        self.record(EngineCall::Create {
            name: options.and_then(|opts| opts.name),
            image: config.image,
            published,
        });
        self.script().container = Some(ContainerStateStatusEnum::CREATED);
        Box::pin(async {
            Ok(ContainerCreateResponse {
                id: String::from("f00dcafe"),
                warnings: vec![],
            })
        })
    }

    fn start_container(
        &self,
        name: &str,
        _options: Option<StartContainerOptions>,
    ) -> ContainerActionFuture<'_> {
        self.record(EngineCall::Start(String::from(name)));
        let mut script = self.script();
        let result = match script.start_error.clone() {
            Some(message) => Err(server_error(500, &message)),
            None => {
                script.container = Some(ContainerStateStatusEnum::RUNNING);
                Ok(())
            }
        };
        Box::pin(async move { result })
    }
}

/// Connector handing out the shared fake engine and counting connections.
#[derive(Debug, Clone, Default)]
pub(crate) struct FakeConnector {
    pub(crate) engine: FakeEngine,
    connects: Arc<Mutex<usize>>,
}

impl FakeConnector {
    pub(crate) fn connects(&self) -> usize {
        *self.connects.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Connector for FakeConnector {
    type Client = FakeEngine;

    fn connect(&self, _socket: &str) -> Result<FakeEngine, RelaunchError> {
        *self.connects.lock().unwrap_or_else(PoisonError::into_inner) += 1;
        Ok(self.engine.clone())
    }
}
