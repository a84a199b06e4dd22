//! The canonical public surface of a generated module.

use std::fmt;

/// What kind of declaration an export symbol names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    /// A function.
    Callable,
    /// A class.
    Class,
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Callable => write!(f, "function"),
            Self::Class => write!(f, "class"),
        }
    }
}

/// A name on the public surface of the generated module.
///
/// The list is computed once per build target from the declaration file and
/// is read-only input to every downstream emitter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExportSymbol {
    /// Exported name.
    pub name: String,
    /// Declaration kind.
    pub kind: SymbolKind,
}

impl ExportSymbol {
    /// Create a symbol.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: SymbolKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Names of `symbols`, in order.
#[must_use]
pub fn names(symbols: &[ExportSymbol]) -> Vec<String> {
    symbols.iter().map(|s| s.name.clone()).collect()
}
