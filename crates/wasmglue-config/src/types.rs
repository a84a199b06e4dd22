//! Configuration types for a wasmglue project.
//!
//! Every section implements [`Default`] so that a bare `[section]` header
//! produces a usable configuration once layered over `defaults.toml`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root configuration for one postprocessing run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Distribution root holding the generated bindings of every target.
    pub dist_dir: PathBuf,
    /// Naming conventions of the generated glue module.
    pub glue: GlueSection,
    /// Scoped-package install location searched by the runtime loader.
    pub install: InstallSection,
    /// Build targets, each a subdirectory of `dist_dir`.
    pub targets: Vec<TargetSection>,
    /// Declaration members whose loose types are replaced.
    pub retype: Vec<RetypeRule>,
    /// Hand-written entry-point modules compiled to ESM and CommonJS.
    pub companions: Vec<CompanionSection>,
    /// Package manifest assembly. Skipped when absent.
    pub package: Option<PackageSection>,
    /// Logging level, format, and per-crate directives.
    pub logging: LoggingSection,
    /// Directory relative paths are resolved against (the project file's
    /// parent directory).
    #[serde(skip)]
    pub root: PathBuf,
}

impl Config {
    /// Resolve a configured path against the project root.
    #[must_use]
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    /// Absolute distribution root.
    #[must_use]
    pub fn dist_root(&self) -> PathBuf {
        self.resolve(&self.dist_dir)
    }

    /// Output directory of a build target.
    #[must_use]
    pub fn target_dir(&self, target: &TargetSection) -> PathBuf {
        if target.dir.is_empty() {
            self.dist_root()
        } else {
            self.dist_root().join(&target.dir)
        }
    }
}

// ---------------------------------------------------------------------------
// Glue
// ---------------------------------------------------------------------------

/// Naming conventions of the code generator's output.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GlueSection {
    /// Base name of the generated module (`tiktoken` for `tiktoken.d.ts`,
    /// `tiktoken_bg.js` and `tiktoken_bg.wasm`).
    pub module: String,
    /// Identifier of the lazily-bound binary handle inside the glue code.
    pub handle: String,
    /// Exported function that binds the handle.
    pub setter: String,
    /// Message of the error thrown by a guarded entry point before binding.
    pub guard_message: String,
}

impl GlueSection {
    /// Declaration file name, e.g. `tiktoken.d.ts`.
    #[must_use]
    pub fn declarations_file(&self) -> String {
        format!("{}.d.ts", self.module)
    }

    /// ESM glue file name, e.g. `tiktoken_bg.js`.
    #[must_use]
    pub fn esm_glue_file(&self) -> String {
        format!("{}_bg.js", self.module)
    }

    /// CommonJS glue file name, e.g. `tiktoken_bg.cjs`.
    #[must_use]
    pub fn cjs_glue_file(&self) -> String {
        format!("{}_bg.cjs", self.module)
    }

    /// Compiled binary file name, e.g. `tiktoken_bg.wasm`.
    #[must_use]
    pub fn binary_file(&self) -> String {
        format!("{}_bg.wasm", self.module)
    }

    /// CommonJS loader file name, e.g. `tiktoken.cjs`.
    #[must_use]
    pub fn loader_file(&self) -> String {
        format!("{}.cjs", self.module)
    }
}

// ---------------------------------------------------------------------------
// Install location
// ---------------------------------------------------------------------------

/// Where the published package lands inside a `node_modules` tree.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallSection {
    /// Package scope including the `@` (e.g. `"@zerfl"`). Empty for an
    /// unscoped package.
    pub scope: String,
    /// Package name without scope (e.g. `"tiktoken"`).
    pub package: String,
}

// ---------------------------------------------------------------------------
// Targets
// ---------------------------------------------------------------------------

/// One distributable variant of the library.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetSection {
    /// Human-readable target name (e.g. `"full"`, `"lite"`).
    pub name: String,
    /// Output directory relative to `dist_dir`, also the relative install
    /// path fragment. Empty for the distribution root.
    pub dir: String,
}

// ---------------------------------------------------------------------------
// Retype rules
// ---------------------------------------------------------------------------

/// Replacement of one loosely-typed declaration slot.
///
/// With `param` set, the parameter's type is replaced with `type`. With
/// `returns` set, the member's return type is replaced.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RetypeRule {
    /// Class declaring the member. The first class of the declaration file
    /// when absent.
    pub class: Option<String>,
    /// Member name; `"constructor"` addresses the constructor.
    pub member: String,
    /// Parameter to retype.
    pub param: Option<String>,
    /// Replacement parameter type.
    #[serde(rename = "type")]
    pub ty: Option<String>,
    /// Replacement return type.
    pub returns: Option<String>,
    /// Mark the parameter optional (`name?: T`).
    pub optional: bool,
}

// ---------------------------------------------------------------------------
// Companions
// ---------------------------------------------------------------------------

/// A hand-written TypeScript entry-point module wrapping the glue module.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CompanionSection {
    /// Output base name (`init` produces `init.js`, `init.cjs`, `init.d.ts`).
    pub name: String,
    /// TypeScript source path, relative to the project root.
    pub source: PathBuf,
    /// Forward every public export of the glue module from the CommonJS
    /// variant.
    pub forward_exports: bool,
    /// Local name of the glue namespace binding to forward from. Detected
    /// from `import * as <name>` when absent.
    pub binding_table: Option<String>,
}

// ---------------------------------------------------------------------------
// Package
// ---------------------------------------------------------------------------

/// Package manifest assembly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageSection {
    /// Source `package.json`, relative to the project root.
    pub manifest: PathBuf,
    /// Top-level manifest keys removed from the published manifest.
    #[serde(default = "default_strip")]
    pub strip: Vec<String>,
    /// Export condition used for edge runtimes without a filesystem.
    #[serde(default = "default_edge_condition")]
    pub edge_condition: String,
    /// Registry JSON whose keys name the published encoder files.
    #[serde(default)]
    pub registry: Option<PathBuf>,
    /// Directory holding `<key>.json`, `<key>.js`, `<key>.cjs`, `<key>.d.ts`.
    #[serde(default)]
    pub ranks_dir: Option<PathBuf>,
    /// Static files copied into the distribution root.
    #[serde(default)]
    pub copy: Vec<CopySection>,
}

fn default_strip() -> Vec<String> {
    vec!["devDependencies".to_owned(), "scripts".to_owned()]
}

fn default_edge_condition() -> String {
    "edge-light".to_owned()
}

impl Default for PackageSection {
    fn default() -> Self {
        Self {
            manifest: PathBuf::from("package.json"),
            strip: default_strip(),
            edge_condition: default_edge_condition(),
            registry: None,
            ranks_dir: None,
            copy: Vec::new(),
        }
    }
}

/// A static file copied verbatim into the distribution.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CopySection {
    /// Source path, relative to the project root.
    pub from: PathBuf,
    /// Destination path, relative to `dist_dir`.
    pub to: String,
    /// Add a `./<to>` entry to the export map.
    pub export: bool,
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

/// Logging configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Level filter (e.g. `"info"`, `"debug"`).
    pub level: String,
    /// Output format: `pretty`, `compact`, `json` or `full`.
    pub format: String,
    /// Output stream: `stderr` or `stdout`.
    pub target: String,
    /// Prefix each line with a timestamp.
    pub timestamps: bool,
    /// Extra filter directives (e.g. `"wasmglue_transform=trace"`).
    pub directives: Vec<String>,
}
