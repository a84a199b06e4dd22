#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
//! Publishable package assembly.
//!
//! Rewrites the source `package.json` for the distribution directory and
//! wires every target, companion and auxiliary file into an ordered
//! `exports` map with per-runtime conditions.

pub mod error;
pub mod exports;
pub mod manifest;

pub use error::{PackageError, PackageResult};
pub use exports::{ExportMap, export_map};
pub use manifest::{assemble, rewrite_manifest};
