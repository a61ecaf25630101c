//! Orchestration API for relaunch commands.
//!
//! This module provides the library-facing entry points for each command:
//! [`launch`] runs the full build and run sequence, [`show_status`] reports
//! the managed container's state, and [`tear_down`] stops and removes it.
//! [`launch_with_connector`] and [`launch_with_client`] accept injected
//! engine access for embedders and tests.
//!
//! None of these functions print or exit the process. Progress goes to a
//! caller-supplied [`Surface`], and the structured outcome comes back as a
//! [`LaunchReport`]. Each call is self-contained and keeps no state between
//! invocations.

mod display;
mod launch;

pub use display::{Message, RecordingSurface, Surface, TerminalSurface};
pub use launch::{
    BollardConnector, Connector, ContainerStatus, LaunchDriver, LaunchFailure, LaunchReport,
    LaunchStep, SETTLE_DELAY, launch, launch_with_client, launch_with_connector, show_status,
    tear_down,
};
