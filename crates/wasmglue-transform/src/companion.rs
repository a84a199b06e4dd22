//! Hand-written entry-point modules shipped next to the glue.
//!
//! A companion is a `TypeScript` source (an initializer taking caller
//! supplied bytes, a loader wrapper, ...) that imports the glue module.
//! It is compiled to:
//! 1. ESM `JavaScript` via the OXC transformer
//! 2. isolated `.d.ts` declarations
//! 3. CommonJS via [`ModuleDualizer`], with glue specifiers pointing at the
//!    CommonJS glue and, optionally, every public symbol forwarded from the
//!    glue namespace binding

use std::path::Path;

use oxc::codegen::Codegen;
use oxc::isolated_declarations::{IsolatedDeclarations, IsolatedDeclarationsOptions};
use oxc::semantic::SemanticBuilder;
use oxc::span::SourceType;
use oxc::transformer::{TransformOptions, Transformer};
use oxc_allocator::Allocator;
use tracing::{debug, warn};

use crate::dualize::{Forwarding, ModuleDualizer};
use crate::error::{TransformError, TransformResult};
use crate::module::SourceModule;
use crate::parse::parse_program;
use crate::symbols::{ExportSymbol, names};

/// Everything needed to build one companion.
#[derive(Debug, Clone)]
pub struct CompanionSpec<'s> {
    /// Output base name (`init` for `init.js`, `init.cjs`, `init.d.ts`).
    pub name: &'s str,
    /// `TypeScript` source text.
    pub source: &'s str,
    /// File name of the source, used for the source type and diagnostics.
    pub origin: &'s str,
    /// Specifiers under which the source imports the glue module.
    pub glue_specifiers: &'s [String],
    /// `(from, to)` specifier rewrites applied to the CommonJS output.
    pub rewrites: &'s [(String, String)],
    /// Forward every public symbol from the glue namespace binding.
    pub forward: bool,
    /// Binding to forward from. Defaults to the glue namespace import.
    pub binding_table: Option<&'s str>,
    /// Canonical public surface.
    pub symbols: &'s [ExportSymbol],
}

/// The three artifacts of one companion.
#[derive(Debug, Clone)]
pub struct CompanionOutput {
    /// ESM `JavaScript`.
    pub esm: String,
    /// CommonJS `JavaScript`.
    pub cjs: String,
    /// `.d.ts` declarations.
    pub declarations: String,
}

/// Transpile a JS or TS source string to ESM `JavaScript`.
///
/// `filename` determines the source type (`.ts`, `.mts`, `.js`, ...).
///
/// # Errors
///
/// Returns [`TransformError::Parse`] or [`TransformError::Transpile`].
pub fn transpile_to_esm(source: &str, filename: &str) -> TransformResult<String> {
    let allocator = Allocator::default();
    let source_type = SourceType::from_path(filename).unwrap_or_else(|_| SourceType::mjs());

    let mut program = parse_program(&allocator, source, source_type, filename)?;

    // Semantic analysis (required for transformer)
    let sem_ret = SemanticBuilder::new()
        .with_excess_capacity(2.0)
        .build(&program);
    let scoping = sem_ret.semantic.into_scoping();

    let transform_options = TransformOptions::default();
    let transform_ret = Transformer::new(&allocator, Path::new(filename), &transform_options)
        .build_with_scoping(scoping, &mut program);

    if !transform_ret.errors.is_empty() {
        let errors: Vec<String> = transform_ret
            .errors
            .iter()
            .map(|e| format!("{e}"))
            .collect();
        return Err(TransformError::Transpile {
            file: filename.to_owned(),
            message: errors.join("\n"),
        });
    }

    Ok(Codegen::new().build(&program).code)
}

/// Emit `.d.ts` declarations for a `TypeScript` source.
///
/// Declarations that cannot be inferred in isolation are logged and emitted
/// as far as OXC gets.
///
/// # Errors
///
/// Returns [`TransformError::Parse`] if the source does not parse.
pub fn emit_declarations(source: &str, filename: &str) -> TransformResult<String> {
    let allocator = Allocator::default();
    let source_type = SourceType::from_path(filename).unwrap_or_else(|_| SourceType::ts());
    let program = parse_program(&allocator, source, source_type, filename)?;

    let ret = IsolatedDeclarations::new(
        &allocator,
        IsolatedDeclarationsOptions {
            strip_internal: false,
        },
    )
    .build(&program);

    for error in &ret.errors {
        warn!(file = %filename, "declaration emit: {error}");
    }

    Ok(Codegen::new().build(&ret.program).code)
}

/// Compile a companion to ESM, CommonJS and declarations.
///
/// # Errors
///
/// Returns transpile errors, or [`TransformError::MissingBindingTable`]
/// when forwarding is requested but the source has no namespace import of
/// the glue module.
pub fn build_companion(spec: &CompanionSpec<'_>) -> TransformResult<CompanionOutput> {
    let esm = transpile_to_esm(spec.source, spec.origin)?;
    let declarations = emit_declarations(spec.source, spec.origin)?;

    let module = SourceModule::parse(&esm, &format!("{}.js", spec.name))?;

    let mut dualizer = spec
        .rewrites
        .iter()
        .fold(ModuleDualizer::new(), |dualizer, (from, to)| {
            dualizer.rewrite_specifier(from.clone(), to.clone())
        });

    if spec.forward {
        let specifiers: Vec<&str> = spec.glue_specifiers.iter().map(String::as_str).collect();
        let table = spec
            .binding_table
            .or_else(|| module.namespace_binding(&specifiers))
            .ok_or_else(|| TransformError::MissingBindingTable {
                companion: spec.name.to_owned(),
                specifier: specifiers.join(" | "),
            })?;
        debug!(companion = %spec.name, table = %table, count = spec.symbols.len(), "forwarding exports");
        dualizer = dualizer.forward(Forwarding {
            table: table.to_owned(),
            names: names(spec.symbols),
        });
    }

    Ok(CompanionOutput {
        cjs: dualizer.dualize(&module),
        esm,
        declarations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::SymbolKind;

    const INIT: &str = r#"// @ts-expect-error
import * as imports from "./tiktoken_bg";

let isInitialized = false;
export async function init(
  callback: (imports: WebAssembly.Imports) => Promise<WebAssembly.Instance>
): Promise<void> {
  if (isInitialized) return imports;
  const instance = await callback({ "./tiktoken_bg.js": imports });
  imports.__wbg_set_wasm(instance.exports);
  isInitialized = true;
  return imports;
}
"#;

    fn glue_specifiers() -> Vec<String> {
        vec!["./tiktoken_bg".into(), "./tiktoken_bg.js".into()]
    }

    fn rewrites() -> Vec<(String, String)> {
        glue_specifiers()
            .into_iter()
            .map(|from| (from, "./tiktoken_bg.cjs".to_owned()))
            .collect()
    }

    #[test]
    fn transpile_strips_types_and_keeps_exports() {
        let esm = transpile_to_esm(INIT, "init.ts").unwrap();
        assert!(esm.contains("export async function init(callback)"));
        assert!(!esm.contains("WebAssembly.Imports"));
    }

    #[test]
    fn companion_cjs_forwards_symbols() {
        let specifiers = glue_specifiers();
        let rewrites = rewrites();
        let symbols = vec![
            ExportSymbol::new("get_encoding", SymbolKind::Callable),
            ExportSymbol::new("Tiktoken", SymbolKind::Class),
        ];
        let out = build_companion(&CompanionSpec {
            name: "init",
            source: INIT,
            origin: "init.ts",
            glue_specifiers: &specifiers,
            rewrites: &rewrites,
            forward: true,
            binding_table: None,
            symbols: &symbols,
        })
        .unwrap();

        assert!(out.cjs.contains("const imports = require(\"./tiktoken_bg.cjs\");"));
        assert!(out.cjs.contains("module.exports.init = async function (callback)"));
        assert!(out.cjs.contains("module.exports[\"get_encoding\"] = imports[\"get_encoding\"];"));
        assert!(out.cjs.contains("module.exports[\"Tiktoken\"] = imports[\"Tiktoken\"];"));
        assert!(out.esm.contains("from \"./tiktoken_bg\""));
        assert!(out.declarations.contains("init"));
    }

    #[test]
    fn forwarding_without_namespace_import_fails() {
        let specifiers = glue_specifiers();
        let err = build_companion(&CompanionSpec {
            name: "load",
            source: "export const ready: boolean = true;\n",
            origin: "load.ts",
            glue_specifiers: &specifiers,
            rewrites: &[],
            forward: true,
            binding_table: None,
            symbols: &[],
        })
        .unwrap_err();
        assert!(matches!(err, TransformError::MissingBindingTable { ref companion, .. } if companion == "load"));
    }

    #[test]
    fn explicit_binding_table_wins() {
        let specifiers = glue_specifiers();
        let symbols = vec![ExportSymbol::new("f", SymbolKind::Callable)];
        let out = build_companion(&CompanionSpec {
            name: "load",
            source: "const table: Record<string, unknown> = {};\nexport { table };\n",
            origin: "load.ts",
            glue_specifiers: &specifiers,
            rewrites: &[],
            forward: true,
            binding_table: Some("table"),
            symbols: &symbols,
        })
        .unwrap();
        assert!(out.cjs.contains("module.exports[\"f\"] = table[\"f\"];"));
    }
}
