//! Binary lookup errors.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while locating the compiled binary.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// No candidate path could be read.
    #[error("Missing {binary} (tried {} candidate paths)", tried.len())]
    MissingAsset {
        /// Binary file name.
        binary: String,
        /// Every probed path, in probe order.
        tried: Vec<PathBuf>,
    },
}

/// Result type for binary lookup.
pub type ResolveResult<T> = Result<T, ResolveError>;
