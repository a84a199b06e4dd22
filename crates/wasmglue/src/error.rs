//! Error types for a postprocessing run.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can stop a run.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The project file could not be loaded.
    #[error(transparent)]
    Config(#[from] wasmglue_config::ConfigError),

    /// A glue, declaration or companion module could not be rewritten.
    #[error(transparent)]
    Transform(#[from] wasmglue_transform::TransformError),

    /// The binary could not be found from a loader directory.
    #[error(transparent)]
    Resolve(#[from] wasmglue_resolver::ResolveError),

    /// The package manifest could not be assembled.
    #[error(transparent)]
    Package(#[from] wasmglue_package::PackageError),

    /// A generated file could not be read or written.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// File being read or written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Result type for postprocessing runs.
pub type BuildResult<T> = Result<T, BuildError>;
