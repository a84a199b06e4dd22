//! Structural rewriting of generated WebAssembly binding modules.
//!
//! Every pass parses its input with OXC, computes a set of span-anchored
//! edits or an item-level description of the module, and serializes the
//! result back to source text:
//!
//! - [`enrich`]: replaces loose declaration types and extracts the public
//!   [`ExportSymbol`] list.
//! - [`guard`]: prepends an initialization check to every exported entry
//!   point that touches the binary handle.
//! - [`module`] + [`dualize`]: one item-level description of an ESM module,
//!   rendered either as ESM or as CommonJS.
//! - [`companion`]: transpiles hand-written TypeScript entry points and
//!   dualizes them against the glue module.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod companion;
pub mod dualize;
pub mod enrich;
pub mod error;
pub mod guard;
pub mod module;
pub mod symbols;

mod edit;
mod parse;

pub use companion::{
    CompanionOutput, CompanionSpec, build_companion, emit_declarations, transpile_to_esm,
};
pub use dualize::{Forwarding, ModuleDualizer, commonjs_export_names, ensure_commonjs_exports};
pub use enrich::{Enriched, Retype, RetypeSlot, SignatureEnricher};
pub use error::{TransformError, TransformResult};
pub use guard::{GuardInjector, GuardReport, Guarded};
pub use module::SourceModule;
pub use symbols::{ExportSymbol, SymbolKind};
