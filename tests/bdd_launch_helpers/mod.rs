//! Behavioural step helpers for launch scenarios.

mod fake_engine;
mod steps;

pub use state::{LaunchState, launch_state};

pub(crate) type StepResult<T> = Result<T, String>;
