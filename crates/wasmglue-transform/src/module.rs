//! Item-level description of an ES module.
//!
//! [`SourceModule::parse`] splits a module into its top-level statements,
//! keeping each statement's leading trivia and byte range, and classifies
//! the import/export forms. The ESM renderer reassembles the original text
//! byte for byte; the CommonJS renderer in [`crate::dualize`] rewrites only
//! the import and export mechanics of the same items.

use std::collections::HashSet;
use std::ops::Range;

use oxc::ast::ast::{
    BindingIdentifier, Declaration, ExportDefaultDeclarationKind, ImportDeclarationSpecifier,
    Statement,
};
use oxc::ast_visit::Visit;
use oxc::semantic::{Scoping, SemanticBuilder};
use oxc::span::GetSpan;
use oxc_allocator::Allocator;

use crate::error::{TransformError, TransformResult};
use crate::parse::{module_source_type, parse_program, range, slice, unquote};
use crate::symbols::ExportSymbol;

/// What an inline `export <declaration>` binds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Binding {
    /// `export function name() {}`; `name_span` covers the identifier.
    /// `referenced` is set when any reference in the module resolves to it.
    Function {
        name: String,
        name_span: Range<usize>,
        referenced: bool,
    },
    /// `export class Name {}`.
    Class { name: String },
    /// `export const a = 1, b = 2;`.
    Variables { names: Vec<String> },
}

/// Bindings of an `import ... from` clause.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct ImportClause {
    pub(crate) default: Option<String>,
    pub(crate) namespace: Option<String>,
    /// `(imported, local)` pairs.
    pub(crate) named: Vec<(String, String)>,
}

/// Classification of one top-level statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ItemKind {
    /// `export <declaration>`; `decl` spans the declaration alone.
    ExportDecl { decl: Range<usize>, binding: Binding },
    /// `export default <value>`; `name` is set for named declarations.
    ExportDefault {
        value: Range<usize>,
        name: Option<String>,
        declaration: bool,
    },
    /// `export { local as exported } [from "m"]`.
    ExportList {
        specifiers: Vec<(String, String)>,
        from: Option<String>,
    },
    /// `export * [as alias] from "m"`.
    ExportAll { from: String, alias: Option<String> },
    /// `import ... from "m"`. `None` for a side-effect import.
    Import {
        from: String,
        clause: Option<ImportClause>,
    },
    /// Type-only import or export, erased from CommonJS output.
    TypeOnly,
    /// Anything else, kept verbatim.
    Statement,
}

/// One top-level statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Item {
    /// Whitespace and comments since the previous item.
    pub(crate) leading: Range<usize>,
    pub(crate) span: Range<usize>,
    pub(crate) kind: ItemKind,
}

/// A parsed ES module: the original text plus its top-level items.
#[derive(Debug, Clone)]
pub struct SourceModule {
    origin: String,
    text: String,
    items: Vec<Item>,
    trailer: Range<usize>,
}

impl SourceModule {
    /// Parse `source` as an ES module.
    ///
    /// # Errors
    ///
    /// Returns a parse error, or [`TransformError::UnsupportedExport`] for
    /// exported declarations that have no runtime binding.
    pub fn parse(source: &str, origin: &str) -> TransformResult<Self> {
        let allocator = Allocator::default();
        let program = parse_program(&allocator, source, module_source_type(), origin)?;
        let semantic = SemanticBuilder::new().build(&program).semantic;
        let scoping = semantic.scoping();

        let mut items = Vec::with_capacity(program.body.len());
        let mut cursor = 0;
        for stmt in &program.body {
            let span = range(stmt.span());
            let kind = classify(stmt, scoping, source, origin)?;
            items.push(Item {
                leading: cursor..span.start,
                span: span.clone(),
                kind,
            });
            cursor = span.end;
        }

        Ok(Self {
            origin: origin.to_owned(),
            text: source.to_owned(),
            items,
            trailer: cursor..source.len(),
        })
    }

    /// File the module was parsed from.
    #[must_use]
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Render the module as ESM. Reproduces the parsed text exactly.
    #[must_use]
    pub fn render_esm(&self) -> String {
        let mut out = String::with_capacity(self.text.len());
        for item in &self.items {
            out.push_str(self.text_of(&item.leading));
            out.push_str(self.text_of(&item.span));
        }
        out.push_str(self.text_of(&self.trailer));
        out
    }

    /// Every name this module exports, in source order. Names re-exported
    /// through `export *` are not knowable here and are skipped.
    #[must_use]
    pub fn exported_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        for item in &self.items {
            match &item.kind {
                ItemKind::ExportDecl { binding, .. } => match binding {
                    Binding::Function { name, .. } | Binding::Class { name } => {
                        names.push(name.clone());
                    },
                    Binding::Variables { names: vars } => names.extend(vars.iter().cloned()),
                },
                ItemKind::ExportDefault { .. } => names.push("default".to_owned()),
                ItemKind::ExportList { specifiers, .. } => {
                    names.extend(specifiers.iter().map(|(_, exported)| exported.clone()));
                },
                ItemKind::ExportAll {
                    alias: Some(alias), ..
                } => names.push(alias.clone()),
                _ => {},
            }
        }
        names
    }

    /// Local name of the first `import * as <name>` of any of `specifiers`.
    #[must_use]
    pub fn namespace_binding(&self, specifiers: &[&str]) -> Option<&str> {
        self.items.iter().find_map(|item| match &item.kind {
            ItemKind::Import {
                from,
                clause: Some(clause),
            } if specifiers.contains(&from.as_str()) => clause.namespace.as_deref(),
            _ => None,
        })
    }

    /// Fail unless every symbol is among this module's exports.
    ///
    /// # Errors
    ///
    /// Returns [`TransformError::MissingExport`] naming the first symbol
    /// that is not exported.
    pub fn ensure_exports(&self, symbols: &[ExportSymbol], artifact: &str) -> TransformResult<()> {
        let names = self.exported_names();
        let exported: HashSet<&str> = names.iter().map(String::as_str).collect();
        ensure_names(&exported, symbols, artifact)
    }

    pub(crate) fn items(&self) -> &[Item] {
        &self.items
    }

    pub(crate) fn text_of(&self, range: &Range<usize>) -> &str {
        &self.text[range.clone()]
    }

    pub(crate) fn trailer(&self) -> &str {
        self.text_of(&self.trailer)
    }
}

pub(crate) fn ensure_names(
    exported: &HashSet<&str>,
    symbols: &[ExportSymbol],
    artifact: &str,
) -> TransformResult<()> {
    match symbols.iter().find(|s| !exported.contains(s.name.as_str())) {
        Some(missing) => Err(TransformError::MissingExport {
            artifact: artifact.to_owned(),
            name: missing.name.clone(),
        }),
        None => Ok(()),
    }
}

fn classify(
    stmt: &Statement<'_>,
    scoping: &Scoping,
    source: &str,
    origin: &str,
) -> TransformResult<ItemKind> {
    let kind = match stmt {
        Statement::ImportDeclaration(import) => {
            if import.import_kind.is_type() {
                return Ok(ItemKind::TypeOnly);
            }
            let clause = import.specifiers.as_ref().map(|specifiers| {
                let mut clause = ImportClause::default();
                for specifier in specifiers {
                    match specifier {
                        ImportDeclarationSpecifier::ImportSpecifier(s) => {
                            if s.import_kind.is_type() {
                                continue;
                            }
                            clause.named.push((
                                unquote(slice(source, s.imported.span())).to_owned(),
                                s.local.name.to_string(),
                            ));
                        },
                        ImportDeclarationSpecifier::ImportDefaultSpecifier(s) => {
                            clause.default = Some(s.local.name.to_string());
                        },
                        ImportDeclarationSpecifier::ImportNamespaceSpecifier(s) => {
                            clause.namespace = Some(s.local.name.to_string());
                        },
                    }
                }
                clause
            });
            ItemKind::Import {
                from: import.source.value.to_string(),
                clause,
            }
        },
        Statement::ExportNamedDeclaration(export) => {
            if export.export_kind.is_type() {
                return Ok(ItemKind::TypeOnly);
            }
            match &export.declaration {
                Some(decl) => ItemKind::ExportDecl {
                    decl: range(decl.span()),
                    binding: declaration_binding(decl, scoping, source, origin)?,
                },
                None => ItemKind::ExportList {
                    specifiers: export
                        .specifiers
                        .iter()
                        .filter(|spec| !spec.export_kind.is_type())
                        .map(|spec| {
                            (
                                unquote(slice(source, spec.local.span())).to_owned(),
                                unquote(slice(source, spec.exported.span())).to_owned(),
                            )
                        })
                        .collect(),
                    from: export.source.as_ref().map(|s| s.value.to_string()),
                },
            }
        },
        Statement::ExportDefaultDeclaration(export) => {
            let (name, declaration) = match &export.declaration {
                ExportDefaultDeclarationKind::FunctionDeclaration(f) => {
                    (f.id.as_ref().map(|id| id.name.to_string()), true)
                },
                ExportDefaultDeclarationKind::ClassDeclaration(c) => {
                    (c.id.as_ref().map(|id| id.name.to_string()), true)
                },
                ExportDefaultDeclarationKind::TSInterfaceDeclaration(_) => {
                    return Ok(ItemKind::TypeOnly);
                },
                _ => (None, false),
            };
            ItemKind::ExportDefault {
                value: range(export.declaration.span()),
                name,
                declaration,
            }
        },
        Statement::ExportAllDeclaration(export) => {
            if export.export_kind.is_type() {
                return Ok(ItemKind::TypeOnly);
            }
            ItemKind::ExportAll {
                from: export.source.value.to_string(),
                alias: export
                    .exported
                    .as_ref()
                    .map(|alias| unquote(slice(source, alias.span())).to_owned()),
            }
        },
        _ => ItemKind::Statement,
    };
    Ok(kind)
}

fn declaration_binding(
    decl: &Declaration<'_>,
    scoping: &Scoping,
    source: &str,
    origin: &str,
) -> TransformResult<Binding> {
    let unsupported = || TransformError::UnsupportedExport {
        file: origin.to_owned(),
        detail: slice(source, decl.span()).lines().next().unwrap_or_default().to_owned(),
    };

    match decl {
        Declaration::FunctionDeclaration(f) => {
            let id = f.id.as_ref().ok_or_else(unsupported)?;
            let referenced = id
                .symbol_id
                .get()
                .is_some_and(|symbol| !scoping.get_resolved_reference_ids(symbol).is_empty());
            Ok(Binding::Function {
                name: id.name.to_string(),
                name_span: range(id.span),
                referenced,
            })
        },
        Declaration::ClassDeclaration(c) => {
            let id = c.id.as_ref().ok_or_else(unsupported)?;
            Ok(Binding::Class {
                name: id.name.to_string(),
            })
        },
        Declaration::VariableDeclaration(v) => {
            let mut collector = BindingNames::default();
            for declarator in &v.declarations {
                collector.visit_binding_pattern(&declarator.id);
            }
            Ok(Binding::Variables {
                names: collector.names,
            })
        },
        _ => Err(unsupported()),
    }
}

#[derive(Default)]
struct BindingNames {
    names: Vec<String>,
}

impl<'a> Visit<'a> for BindingNames {
    fn visit_binding_identifier(&mut self, it: &BindingIdentifier<'a>) {
        self.names.push(it.name.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::SymbolKind;

    const MODULE: &str = r#"// @ts-expect-error
import * as imports from "./tiktoken_bg";
import init, { helper as h } from "./util";
import "./polyfill";

let ready = false;

export async function load(bytes) {
    return h(bytes);
}

export class Loader {}

export const { a, b: [c] } = imports;

export { ready as isReady };
export { get_encoding } from "./tiktoken_bg";
export * from "./tiktoken_bg";
export * as raw from "./tiktoken_bg";
export default init;
"#;

    #[test]
    fn esm_render_is_exact() {
        let module = SourceModule::parse(MODULE, "init.js").unwrap();
        assert_eq!(module.render_esm(), MODULE);
    }

    #[test]
    fn classifies_imports() {
        let module = SourceModule::parse(MODULE, "init.js").unwrap();
        let imports: Vec<_> = module
            .items()
            .iter()
            .filter_map(|item| match &item.kind {
                ItemKind::Import { from, clause } => Some((from.clone(), clause.clone())),
                _ => None,
            })
            .collect();

        assert_eq!(imports.len(), 3);
        assert_eq!(imports[0].1.as_ref().unwrap().namespace.as_deref(), Some("imports"));
        let util = imports[1].1.as_ref().unwrap();
        assert_eq!(util.default.as_deref(), Some("init"));
        assert_eq!(util.named, vec![("helper".to_owned(), "h".to_owned())]);
        assert_eq!(imports[2], ("./polyfill".to_owned(), None));
    }

    #[test]
    fn leading_comments_stay_with_their_item() {
        let module = SourceModule::parse(MODULE, "init.js").unwrap();
        let first = &module.items()[0];
        assert_eq!(module.text_of(&first.leading), "// @ts-expect-error\n");
    }

    #[test]
    fn exported_names_in_source_order() {
        let module = SourceModule::parse(MODULE, "init.js").unwrap();
        assert_eq!(
            module.exported_names(),
            vec!["load", "Loader", "a", "c", "isReady", "get_encoding", "raw", "default"]
        );
    }

    #[test]
    fn finds_namespace_binding() {
        let module = SourceModule::parse(MODULE, "init.js").unwrap();
        assert_eq!(
            module.namespace_binding(&["./tiktoken_bg", "./tiktoken_bg.js"]),
            Some("imports")
        );
        assert_eq!(module.namespace_binding(&["./other"]), None);
    }

    #[test]
    fn ensure_exports_reports_first_missing_symbol() {
        let module = SourceModule::parse(MODULE, "init.js").unwrap();
        let symbols = vec![
            ExportSymbol::new("load", SymbolKind::Callable),
            ExportSymbol::new("Tiktoken", SymbolKind::Class),
        ];
        let err = module.ensure_exports(&symbols, "init.js").unwrap_err();
        assert!(matches!(err, TransformError::MissingExport { ref name, .. } if name == "Tiktoken"));
        assert!(module.ensure_exports(&symbols[..1], "init.js").is_ok());
    }

    #[test]
    fn function_references_are_resolved() {
        let module = SourceModule::parse(
            "export function a() {}\nexport function b() { return b; }\nexport function c() {}\nexport { c as d };\n",
            "refs.js",
        )
        .unwrap();
        let referenced: Vec<(String, bool)> = module
            .items()
            .iter()
            .filter_map(|item| match &item.kind {
                ItemKind::ExportDecl {
                    binding: Binding::Function { name, referenced, .. },
                    ..
                } => Some((name.clone(), *referenced)),
                _ => None,
            })
            .collect();
        assert_eq!(
            referenced,
            vec![("a".into(), false), ("b".into(), true), ("c".into(), true)]
        );
    }

    #[test]
    fn function_name_span_covers_identifier() {
        let module = SourceModule::parse(MODULE, "init.js").unwrap();
        let (name, span) = module
            .items()
            .iter()
            .find_map(|item| match &item.kind {
                ItemKind::ExportDecl {
                    binding: Binding::Function { name, name_span, .. },
                    ..
                } => Some((name.clone(), name_span.clone())),
                _ => None,
            })
            .unwrap();
        assert_eq!(name, "load");
        assert_eq!(module.text_of(&span), "load");
    }
}
