#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
//! Postprocess WebAssembly bindings into a dual ESM/CommonJS package.
//!
//! [`Pipeline`] drives the passes of the `wasmglue-transform`,
//! `wasmglue-resolver` and `wasmglue-package` crates over every build target
//! of a project file.

/// Conversions from configuration sections to pass inputs.
pub mod config_bridge;
/// Error types.
pub mod error;
/// Pipeline orchestration.
pub mod pipeline;

pub use error::{BuildError, BuildResult};
pub use pipeline::{BuildReport, Pipeline, TargetReport};
