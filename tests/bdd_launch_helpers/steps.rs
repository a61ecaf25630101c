//! Given/when steps for launch scenarios.

use std::sync::Arc;
use std::time::Duration;

use bollard::models::{BuildInfo, ContainerStateStatusEnum};
use camino::Utf8PathBuf;
use mockable::MockEnv;
use relaunch::api::{LaunchDriver, RecordingSurface};
use relaunch::config::AppConfig;
use rstest_bdd_macros::{given, when};

use super::StepResult;
use super::fake_engine::FakeConnector;
use super::state::{LaunchOutcome, LaunchState};

fn connector(launch_state: &LaunchState) -> StepResult<FakeConnector> {
    launch_state
        .connector
        .get()
        .ok_or_else(|| String::from("connector should be configured"))
}

fn parse_status(status: &str) -> StepResult<ContainerStateStatusEnum> {
    match status {
        "running" => Ok(ContainerStateStatusEnum::RUNNING),
        "exited" => Ok(ContainerStateStatusEnum::EXITED),
        "created" => Ok(ContainerStateStatusEnum::CREATED),
        "paused" => Ok(ContainerStateStatusEnum::PAUSED),
        other => Err(format!("unsupported container status in scenario: {other}")),
    }
}

#[given("a build context with a Dockerfile")]
fn given_build_context(launch_state: &LaunchState) -> StepResult<()> {
    let dir = tempfile::tempdir().map_err(|e| format!("failed to create context: {e}"))?;
    std::fs::write(dir.path().join("Dockerfile"), "FROM python:3.12-slim\nEXPOSE 7860\n")
        .map_err(|e| format!("failed to write Dockerfile: {e}"))?;
    launch_state.context.set(Arc::new(dir));
    Ok(())
}

#[given("the engine socket path does not exist")]
fn given_missing_socket(launch_state: &LaunchState) -> StepResult<()> {
    let dir = tempfile::tempdir().map_err(|e| format!("failed to create dir: {e}"))?;
    let socket = format!("unix://{}", dir.path().join("docker.sock").display());
    launch_state.socket.set(socket);
    launch_state.socket_dir.set(Arc::new(dir));
    Ok(())
}

#[given("the engine socket exists but the engine does not answer")]
fn given_unresponsive_engine(launch_state: &LaunchState) -> StepResult<()> {
    let dir = tempfile::tempdir().map_err(|e| format!("failed to create dir: {e}"))?;
    let socket_path = dir.path().join("docker.sock");
    std::fs::write(&socket_path, b"").map_err(|e| format!("failed to create socket: {e}"))?;
    launch_state
        .socket
        .set(format!("unix://{}", socket_path.display()));
    launch_state.socket_dir.set(Arc::new(dir));
    connector(launch_state)?.engine.script().answers_version = false;
    Ok(())
}

#[given("the build emits {count} padded log lines and {progress} progress entries")]
fn given_build_output(launch_state: &LaunchState, count: usize, progress: usize) -> StepResult<()> {
    let engine = connector(launch_state)?.engine;
    let mut expected = vec![];
    let mut entries = vec![];

    for index in 0..count.max(progress) {
        if index < count {
            let line = format!("Step {}/{count} : RUN echo {index}", index + 1);
            entries.push(BuildInfo {
                stream: Some(format!("  {line} \n")),
                ..BuildInfo::default()
            });
            expected.push(line);
        }
        if index < progress {
            entries.push(BuildInfo {
                status: Some(String::from("Downloading")),
                ..BuildInfo::default()
            });
        }
    }

    engine.script().build_entries = entries;
    launch_state.expected_log_lines.set(expected);
    Ok(())
}

#[given("the build fails with {message}")]
fn given_build_fails(launch_state: &LaunchState, message: String) -> StepResult<()> {
    connector(launch_state)?.engine.script().build_error = Some(message);
    Ok(())
}

#[given("starting the container fails with {message}")]
fn given_start_fails(launch_state: &LaunchState, message: String) -> StepResult<()> {
    connector(launch_state)?.engine.script().start_error = Some(message);
    Ok(())
}

#[given("a container named unhided-app-container already exists with status {status}")]
fn given_existing_container(launch_state: &LaunchState, status: String) -> StepResult<()> {
    let parsed = parse_status(&status)?;
    connector(launch_state)?.engine.script().container = Some(parsed);
    Ok(())
}

#[given("no container named unhided-app-container exists")]
fn given_no_container(launch_state: &LaunchState) -> StepResult<()> {
    connector(launch_state)?.engine.script().container = None;
    Ok(())
}

#[derive(Debug, Clone, Copy)]
enum Command {
    Launch,
    Status,
    TearDown,
}

fn run_command(launch_state: &LaunchState, command: Command) -> StepResult<()> {
    let connector = connector(launch_state)?;
    let mut config = AppConfig::default();
    config.engine_socket = launch_state.socket.get();
    if let Some(context) = launch_state.context.get() {
        config.build.context_dir = Utf8PathBuf::try_from(context.path().to_path_buf())
            .map_err(|e| format!("context path is not UTF-8: {e}"))?;
    }

    let mut env = MockEnv::new();
    env.expect_string().returning(|_| None);
    let mut surface = RecordingSurface::new();
    let driver = LaunchDriver::new().with_settle_delay(Duration::ZERO);

    let runtime =
        tokio::runtime::Runtime::new().map_err(|e| format!("failed to create runtime: {e}"))?;
    let report = runtime.block_on(async {
        match command {
            Command::Launch => driver.launch(&config, &env, &mut surface, &connector).await,
            Command::Status => driver.status(&config, &env, &mut surface, &connector).await,
            Command::TearDown => driver.tear_down(&config, &env, &mut surface, &connector).await,
        }
    });

    launch_state
        .outcome
        .set(LaunchOutcome::new(&report, surface.messages().to_vec()));
    Ok(())
}

#[when("the launch sequence runs")]
fn when_launch_runs(launch_state: &LaunchState) -> StepResult<()> {
    run_command(launch_state, Command::Launch)
}

#[when("the status command runs")]
fn when_status_runs(launch_state: &LaunchState) -> StepResult<()> {
    run_command(launch_state, Command::Status)
}

#[when("the tear-down command runs")]
fn when_tear_down_runs(launch_state: &LaunchState) -> StepResult<()> {
    run_command(launch_state, Command::TearDown)
}
