#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
//! Project configuration for the wasmglue postprocessor.
//!
//! A project describes which generated binding module to postprocess, the
//! build targets it was generated for, the declaration members to retype,
//! the companion entry-point modules to dualize and, optionally, how to
//! assemble the final package manifest.
//!
//! # Usage
//!
//! ```rust,no_run
//! use wasmglue_config::Config;
//!
//! let config = Config::load(std::path::Path::new("wasmglue.toml")).unwrap();
//! for target in &config.targets {
//!     println!("{} -> {}", target.name, config.target_dir(target).display());
//! }
//! ```
//!
//! # Precedence
//!
//! From highest to lowest priority:
//!
//! 1. `WASMGLUE_LOG_LEVEL` (logging level only)
//! 2. The project file (`wasmglue.toml` or `--config <path>`)
//! 3. Embedded defaults (`defaults.toml` compiled into the binary)

/// Configuration error types.
pub mod error;
/// Project file loading and layering.
pub mod loader;
/// Recursive TOML table merging.
pub mod merge;
/// Configuration struct definitions.
pub mod types;
/// Post-merge validation rules.
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use types::*;

impl Config {
    /// Load the project file at `path` layered over the embedded defaults.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file cannot be read or parsed, or if
    /// the merged configuration fails validation.
    pub fn load(path: &std::path::Path) -> ConfigResult<Self> {
        loader::load(path)
    }

    /// Load a configuration from an in-memory TOML document layered over the
    /// embedded defaults.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the document cannot be parsed or fails
    /// validation.
    pub fn from_toml_str(source: &str) -> ConfigResult<Self> {
        loader::load_str(source, "<inline>")
    }
}
