//! CommonJS rendering of a [`SourceModule`].
//!
//! Every item keeps its leading trivia and position, so top-level side
//! effects run in the same order as in the ESM artifact. Only the module
//! mechanics change:
//!
//! - `import` becomes `require`
//! - `export function f() {}` becomes `module.exports.f = function () {};`
//!   when nothing else in the module refers to `f`
//! - `export class C {}` keeps the declaration, followed by
//!   `module.exports.C = C;` (same for `export const` and for functions
//!   referred to by name)
//! - export lists and re-exports become assignments
//! - `export default x` becomes `module.exports.default = x;`

use std::collections::{BTreeMap, HashSet};

use oxc::ast::ast::{Expression, Statement};
use oxc::span::{GetSpan, SourceType};
use oxc_allocator::Allocator;

use crate::error::TransformResult;
use crate::module::{Binding, ImportClause, ItemKind, SourceModule, ensure_names};
use crate::parse::{is_identifier, js_string, member, parse_program, slice, unquote};
use crate::symbols::ExportSymbol;

const EXPORTS: &str = "module.exports";

/// Names forwarded from a namespace binding onto the export object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Forwarding {
    /// Local binding the names are read from.
    pub table: String,
    /// Names to forward, in order.
    pub names: Vec<String>,
}

/// Renders ES modules as CommonJS.
#[derive(Debug, Clone, Default)]
pub struct ModuleDualizer {
    specifiers: BTreeMap<String, String>,
    forwarding: Option<Forwarding>,
}

impl ModuleDualizer {
    /// A dualizer with no specifier rewrites and no forwarding.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rewrite module specifier `from` to `to` in every `require`.
    #[must_use]
    pub fn rewrite_specifier(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.specifiers.insert(from.into(), to.into());
        self
    }

    /// Append `module.exports["N"] = table["N"];` for every forwarded name.
    #[must_use]
    pub fn forward(mut self, forwarding: Forwarding) -> Self {
        self.forwarding = Some(forwarding);
        self
    }

    /// Render `module` as CommonJS.
    #[must_use]
    pub fn dualize(&self, module: &SourceModule) -> String {
        let mut out = String::new();
        let mut has_default = false;

        for item in module.items() {
            out.push_str(module.text_of(&item.leading));
            let text = module.text_of(&item.span);
            match &item.kind {
                ItemKind::Statement => out.push_str(text),
                ItemKind::TypeOnly => {},
                ItemKind::Import { from, clause } => {
                    out.push_str(&self.render_import(from, clause.as_ref()));
                },
                ItemKind::ExportDecl { decl, binding } => match binding {
                    Binding::Function {
                        name,
                        referenced: true,
                        ..
                    }
                    | Binding::Class { name } => {
                        out.push_str(module.text_of(decl));
                        out.push('\n');
                        out.push_str(&assign(name, name));
                    },
                    Binding::Function {
                        name, name_span, ..
                    } => {
                        // Nothing refers to the name, so the exported slot
                        // can be its only binding.
                        out.push_str(&format!(
                            "{} = {} {};",
                            member(EXPORTS, name),
                            module.text_of(&(decl.start..name_span.start)).trim_end(),
                            module.text_of(&(name_span.end..decl.end)),
                        ));
                    },
                    Binding::Variables { names } => {
                        out.push_str(module.text_of(decl));
                        for name in names {
                            out.push('\n');
                            out.push_str(&assign(name, name));
                        }
                    },
                },
                ItemKind::ExportDefault {
                    value,
                    name,
                    declaration,
                } => {
                    has_default = true;
                    let value_text = module.text_of(value);
                    match (name, declaration) {
                        (Some(name), true) => {
                            out.push_str(value_text);
                            out.push('\n');
                            out.push_str(&assign("default", name));
                        },
                        _ => out.push_str(&format!(
                            "{} = {};",
                            member(EXPORTS, "default"),
                            value_text.trim_end_matches(';')
                        )),
                    }
                },
                ItemKind::ExportList { specifiers, from } => {
                    let lines: Vec<String> = specifiers
                        .iter()
                        .map(|(local, exported)| match from {
                            Some(from) => assign(
                                exported,
                                &member(&self.require(from), local),
                            ),
                            None => assign(exported, local),
                        })
                        .collect();
                    out.push_str(&lines.join("\n"));
                },
                ItemKind::ExportAll { from, alias } => match alias {
                    Some(alias) => out.push_str(&assign(alias, &self.require(from))),
                    None => out.push_str(&format!(
                        "for (const [key, value] of Object.entries({})) if (key !== \"default\") {EXPORTS}[key] = value;",
                        self.require(from)
                    )),
                },
            }
        }

        let mut tail = Vec::new();
        if let Some(forwarding) = &self.forwarding {
            for name in &forwarding.names {
                let slot = js_string(name);
                tail.push(format!(
                    "{EXPORTS}[{slot}] = {}[{slot}];",
                    forwarding.table
                ));
            }
        }
        if has_default {
            tail.push(format!(
                "Object.defineProperty({EXPORTS}, \"__esModule\", {{ value: true }});"
            ));
        }

        let trailer = module.trailer();
        if tail.is_empty() {
            out.push_str(trailer);
        } else {
            out.push('\n');
            out.push_str(&tail.join("\n"));
            if trailer.is_empty() {
                out.push('\n');
            } else {
                out.push_str(trailer);
            }
        }
        out
    }

    /// Parse `source` and render it as CommonJS.
    ///
    /// # Errors
    ///
    /// Returns a parse error or an unsupported export form.
    pub fn dualize_source(&self, source: &str, origin: &str) -> TransformResult<String> {
        Ok(self.dualize(&SourceModule::parse(source, origin)?))
    }

    fn specifier<'s>(&'s self, from: &'s str) -> &'s str {
        self.specifiers.get(from).map_or(from, String::as_str)
    }

    fn require(&self, from: &str) -> String {
        format!("require({})", js_string(self.specifier(from)))
    }

    fn render_import(&self, from: &str, clause: Option<&ImportClause>) -> String {
        let require = self.require(from);
        let Some(clause) = clause else {
            return format!("{require};");
        };

        let mut lines = Vec::new();
        if let Some(namespace) = &clause.namespace {
            lines.push(format!("const {namespace} = {require};"));
        }
        if let Some(default) = &clause.default {
            lines.push(format!(
                "const {default} = ((m) => m && m.__esModule ? m.default : m)({require});"
            ));
        }
        if !clause.named.is_empty() {
            let bindings: Vec<String> = clause
                .named
                .iter()
                .map(|(imported, local)| {
                    if imported == local {
                        local.clone()
                    } else if is_identifier(imported) {
                        format!("{imported}: {local}")
                    } else {
                        format!("{}: {local}", js_string(imported))
                    }
                })
                .collect();
            lines.push(format!("const {{ {} }} = {require};", bindings.join(", ")));
        }
        if lines.is_empty() {
            lines.push(format!("{require};"));
        }
        lines.join("\n")
    }
}

fn assign(exported: &str, value: &str) -> String {
    format!("{} = {value};", member(EXPORTS, exported))
}

/// Names assigned at top level as `module.exports.N = ...` or
/// `module.exports["N"] = ...`, in source order.
///
/// # Errors
///
/// Returns a parse error if `source` is not a valid script.
pub fn commonjs_export_names(source: &str, origin: &str) -> TransformResult<Vec<String>> {
    let allocator = Allocator::default();
    let program = parse_program(&allocator, source, SourceType::cjs(), origin)?;

    let mut names = Vec::new();
    for stmt in &program.body {
        let Statement::ExpressionStatement(expr) = stmt else {
            continue;
        };
        let Expression::AssignmentExpression(assignment) = &expr.expression else {
            continue;
        };
        let target = slice(source, assignment.left.span());
        let Some(rest) = target.strip_prefix(EXPORTS) else {
            continue;
        };
        let name = rest
            .strip_prefix('.')
            .or_else(|| rest.strip_prefix('[').and_then(|r| r.strip_suffix(']')))
            .map(|n| unquote(n.trim()));
        if let Some(name) = name
            && !names.iter().any(|n| n == name)
        {
            names.push(name.to_owned());
        }
    }
    Ok(names)
}

/// Fail unless the CommonJS `source` assigns every symbol.
///
/// # Errors
///
/// Returns a parse error or [`crate::TransformError::MissingExport`].
pub fn ensure_commonjs_exports(
    source: &str,
    symbols: &[ExportSymbol],
    artifact: &str,
) -> TransformResult<()> {
    let names = commonjs_export_names(source, artifact)?;
    let exported: HashSet<&str> = names.iter().map(String::as_str).collect();
    ensure_names(&exported, symbols, artifact)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cjs(source: &str) -> String {
        ModuleDualizer::new().dualize_source(source, "test.js").unwrap()
    }

    #[test]
    fn exported_function_becomes_anonymous_assignment() {
        let out = cjs("export function get_encoding(encoding) {\n    return wasm.get(encoding);\n}\n");
        assert_eq!(
            out,
            "module.exports.get_encoding = function (encoding) {\n    return wasm.get(encoding);\n};\n"
        );
    }

    #[test]
    fn function_called_by_a_sibling_keeps_its_binding() {
        let out = cjs(
            "export async function init(cb) {\n    return cb();\n}\nexport async function load() {\n    return init(() => \"ready\");\n}\n",
        );
        assert_eq!(
            out,
            "async function init(cb) {\n    return cb();\n}\nmodule.exports.init = init;\nmodule.exports.load = async function () {\n    return init(() => \"ready\");\n};\n"
        );
    }

    #[test]
    fn recursive_function_keeps_its_binding() {
        let out = cjs("export function fact(n) {\n    return n < 2 ? 1 : n * fact(n - 1);\n}\n");
        assert_eq!(
            out,
            "function fact(n) {\n    return n < 2 ? 1 : n * fact(n - 1);\n}\nmodule.exports.fact = fact;\n"
        );
    }

    #[test]
    fn aliased_function_keeps_its_binding() {
        let out = cjs("export function init() {}\nexport { init as initialize };\n");
        assert_eq!(
            out,
            "function init() {}\nmodule.exports.init = init;\nmodule.exports.initialize = init;\n"
        );
        assert_eq!(
            commonjs_export_names(&out, "test.cjs").unwrap(),
            vec!["init", "initialize"]
        );
    }

    #[test]
    fn async_function_keeps_modifiers() {
        let out = cjs("export async function load() {}\n");
        assert_eq!(out, "module.exports.load = async function () {};\n");
    }

    #[test]
    fn exported_class_is_followed_by_assignment() {
        let out = cjs("export class Tok {\n    encode() {}\n}\n");
        assert_eq!(out, "class Tok {\n    encode() {}\n}\nmodule.exports.Tok = Tok;\n");
    }

    #[test]
    fn variables_and_lists() {
        let out = cjs("const a = 1;\nexport const b = 2, c = 3;\nexport { a as first };\n");
        assert_eq!(
            out,
            "const a = 1;\nconst b = 2, c = 3;\nmodule.exports.b = b;\nmodule.exports.c = c;\nmodule.exports.first = a;\n"
        );
    }

    #[test]
    fn imports_become_requires_with_rewritten_specifiers() {
        let out = ModuleDualizer::new()
            .rewrite_specifier("./tiktoken_bg", "./tiktoken_bg.cjs")
            .dualize_source(
                "import * as imports from \"./tiktoken_bg\";\nimport { a, b as c } from \"./util\";\nimport \"./side\";\n",
                "init.js",
            )
            .unwrap();
        assert_eq!(
            out,
            "const imports = require(\"./tiktoken_bg.cjs\");\nconst { a, b: c } = require(\"./util\");\nrequire(\"./side\");\n"
        );
    }

    #[test]
    fn reexports() {
        let out = ModuleDualizer::new()
            .rewrite_specifier("./tiktoken_bg", "./tiktoken_bg.cjs")
            .dualize_source(
                "export { get_encoding as ge } from \"./tiktoken_bg\";\nexport * as raw from \"./tiktoken_bg\";\n",
                "init.js",
            )
            .unwrap();
        assert_eq!(
            out,
            "module.exports.ge = require(\"./tiktoken_bg.cjs\").get_encoding;\nmodule.exports.raw = require(\"./tiktoken_bg.cjs\");\n"
        );
    }

    #[test]
    fn default_export_marks_module() {
        let out = cjs("function init() {}\nexport default init;\n");
        assert_eq!(
            out,
            "function init() {}\nmodule.exports.default = init;\nObject.defineProperty(module.exports, \"__esModule\", { value: true });\n"
        );
    }

    #[test]
    fn forwarding_lines_come_last() {
        let out = ModuleDualizer::new()
            .forward(Forwarding {
                table: "imports".into(),
                names: vec!["Tiktoken".into(), "get_encoding".into()],
            })
            .dualize_source("import * as imports from \"./tiktoken_bg\";\nexport { init };\nfunction init() {}\n", "init.js")
            .unwrap();
        assert!(out.ends_with(
            "module.exports[\"Tiktoken\"] = imports[\"Tiktoken\"];\nmodule.exports[\"get_encoding\"] = imports[\"get_encoding\"];\n"
        ));
    }

    #[test]
    fn declaration_order_is_preserved() {
        let out = cjs("export class A {}\nexport function f() {}\nexport class B {}\n");
        let a = out.find("module.exports.A").unwrap();
        let f = out.find("module.exports.f").unwrap();
        let b = out.find("module.exports.B").unwrap();
        assert!(a < f && f < b);
    }

    #[test]
    fn no_export_keyword_survives() {
        let out = cjs("export class A {}\nexport function f() {}\nexport const v = 1;\nexport { v as w };\n");
        assert!(!out.contains("export "));
    }

    #[test]
    fn reads_back_commonjs_names() {
        let out = cjs("export class A {}\nexport function f() {}\nexport { A as \"g-h\" };\n");
        assert_eq!(commonjs_export_names(&out, "test.cjs").unwrap(), vec!["A", "f", "g-h"]);
    }
}
