//! Rebuild and relaunch a single containerised app.
//!
//! `relaunch` drives a local Docker-compatible container engine through one
//! fixed lifecycle: build the image `unhided-app-image` from the local
//! `Dockerfile`, replace any container named `unhided-app-container`, start a
//! fresh one publishing port 7860, and report its status.
//!
//! # Architecture
//!
//! The orchestration layer never prints. It emits progress messages to a
//! display surface and returns a structured report, so the same sequence can
//! sit behind the CLI, a web shell, or a test harness. Engine access goes
//! through narrow capability traits implemented for `bollard::Docker`.
//!
//! # Modules
//!
//! - [`api`]: Launch, status, and tear-down orchestration with display surfaces
//! - [`config`]: Configuration system with layered precedence (CLI > env > file > defaults)
//! - [`engine`]: Container engine connection, image builds, and container lifecycle
//! - [`error`]: Semantic error types for the application

pub mod api;
pub mod config;
pub mod engine;
pub mod error;
