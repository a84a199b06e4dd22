//! Error types for the transformation passes.
//!
//! Every variant is a build-time failure: the generated code drifted away
//! from what the project configuration expects and a human has to fix it.

/// All errors that can occur while transforming a generated module.
#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    /// OXC could not parse the input.
    #[error("failed to parse {file}:\n{message}")]
    Parse {
        /// File the source came from.
        file: String,
        /// Joined parser diagnostics.
        message: String,
    },

    /// OXC could not transform or emit the input.
    #[error("failed to transpile {file}:\n{message}")]
    Transpile {
        /// File the source came from.
        file: String,
        /// Joined transformer diagnostics.
        message: String,
    },

    /// A retype rule names a class the declaration file does not contain.
    #[error("{file}: class {class} not found")]
    MissingClass {
        /// Declaration file.
        file: String,
        /// Requested class, or `<first class>` when none was named.
        class: String,
    },

    /// A retype rule names a member the class does not declare.
    #[error("{file}: member {class}.{member} not found")]
    MissingMember {
        /// Declaration file.
        file: String,
        /// Owning class.
        class: String,
        /// Requested member.
        member: String,
    },

    /// A retype rule names a parameter the member does not declare.
    #[error("{file}: parameter '{param}' of {class}.{member} not found")]
    MissingParameter {
        /// Declaration file.
        file: String,
        /// Owning class.
        class: String,
        /// Member declaring the parameter.
        member: String,
        /// Requested parameter.
        param: String,
    },

    /// An export form that cannot be expressed as a CommonJS assignment.
    #[error("{file}: unsupported export: {detail}")]
    UnsupportedExport {
        /// File the source came from.
        file: String,
        /// Offending source text.
        detail: String,
    },

    /// A public symbol is not exported by a derived artifact.
    #[error("{artifact} does not export public symbol '{name}'")]
    MissingExport {
        /// Artifact that should export the symbol.
        artifact: String,
        /// Symbol name.
        name: String,
    },

    /// A companion asked for export forwarding but has no glue namespace
    /// binding to forward from.
    #[error("companion {companion}: no `import * as <name>` of {specifier} to forward exports from")]
    MissingBindingTable {
        /// Companion name.
        companion: String,
        /// Glue module specifier that was looked for.
        specifier: String,
    },
}

/// Result type for transformation passes.
pub type TransformResult<T> = Result<T, TransformError>;
