//! Unit tests for relaunch configuration types.
//!
//! - [`helpers`] - Shared fixtures and helper functions
//! - [`types_tests`] - Defaults, constants, and TOML parsing
//! - [`layer_precedence_tests`] - `MergeComposer` layer precedence tests

mod helpers;
