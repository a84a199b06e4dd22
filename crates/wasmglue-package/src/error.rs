//! Package assembly errors.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while assembling the package.
#[derive(Debug, Error)]
pub enum PackageError {
    /// A file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Read {
        /// File path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// A file could not be written or copied.
    #[error("failed to write {}: {source}", path.display())]
    Write {
        /// Destination path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// A JSON document could not be parsed or serialized.
    #[error("invalid JSON in {}: {source}", path.display())]
    Json {
        /// File path.
        path: PathBuf,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// A JSON document has the wrong shape.
    #[error("{}: {message}", path.display())]
    Shape {
        /// File path.
        path: PathBuf,
        /// What was expected.
        message: String,
    },
}

/// Result type for package assembly.
pub type PackageResult<T> = Result<T, PackageError>;
