//! Logging setup for wasmglue.
//!
//! # Example
//!
//! ```rust,no_run
//! use wasmglue_telemetry::{LogConfig, LogFormat, setup_logging};
//!
//! # fn main() -> Result<(), wasmglue_telemetry::TelemetryError> {
//! let config = LogConfig::new("info")
//!     .with_format(LogFormat::Compact)
//!     .with_directive("wasmglue_transform=debug");
//!
//! setup_logging(&config)?;
//! tracing::info!("postprocessing bindings");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod error;
mod logging;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{LogConfig, LogFormat, LogTarget, setup_logging};
