#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
//! Locating the compiled binary at load time.
//!
//! The generated CommonJS loader does not know where the package manager
//! put it. It probes a fixed list of candidate paths: the binary next to
//! the loader first, then the expected scoped-package install location
//! below every ancestor directory, deepest ancestor first.
//!
//! [`candidate_paths`] builds that list as a pure function and
//! [`locate_binary`] probes it; [`render_loader`] emits the JavaScript
//! loader that runs the same search under Node.

pub mod error;
pub mod loader;
pub mod search;

pub use error::{ResolveError, ResolveResult};
pub use loader::{LOADER_TEMPLATE, LoaderSpec, render_loader};
pub use search::{InstallLocation, candidate_paths, locate_binary};
