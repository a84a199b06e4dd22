//! Declaration retyping and public surface extraction.
//!
//! The code generator types everything it cannot express as `any`. A
//! [`SignatureEnricher`] carries a list of [`Retype`] rules that replace the
//! type of a named parameter or the return type of a named member, and
//! collects the [`ExportSymbol`] list of the declaration file on the way.

use std::collections::{BTreeMap, HashMap};

use oxc::ast::ast::{
    Class, ClassElement, Declaration, ExportDefaultDeclarationKind, Function, MethodDefinition,
    MethodDefinitionKind, Program, Statement,
};
use oxc::span::GetSpan;
use oxc_allocator::Allocator;
use tracing::debug;

use crate::edit::{self, TextEdit};
use crate::error::{TransformError, TransformResult};
use crate::parse::{declaration_source_type, parse_program, range, slice, unquote};
use crate::symbols::{ExportSymbol, SymbolKind};

/// Member name that selects a class's constructor.
const CONSTRUCTOR: &str = "constructor";

/// Which part of a member signature a [`Retype`] replaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetypeSlot {
    /// The type annotation of a named parameter.
    Parameter {
        /// Parameter name.
        name: String,
        /// Replacement type.
        ty: String,
        /// Mark the parameter optional. An existing `?` is always kept.
        optional: bool,
    },
    /// The return type annotation.
    Return {
        /// Replacement type.
        ty: String,
    },
}

/// One replacement of a loosely-typed declaration slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Retype {
    /// Owning class. The first class of the file when `None`.
    pub class: Option<String>,
    /// Member name, `constructor` for the constructor.
    pub member: String,
    /// Slot to replace.
    pub slot: RetypeSlot,
}

impl Retype {
    /// Retype parameter `name` of `member`.
    #[must_use]
    pub fn parameter(
        class: Option<String>,
        member: impl Into<String>,
        name: impl Into<String>,
        ty: impl Into<String>,
    ) -> Self {
        Self {
            class,
            member: member.into(),
            slot: RetypeSlot::Parameter {
                name: name.into(),
                ty: ty.into(),
                optional: false,
            },
        }
    }

    /// Retype the return type of `member`.
    #[must_use]
    pub fn returns(class: Option<String>, member: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            class,
            member: member.into(),
            slot: RetypeSlot::Return { ty: ty.into() },
        }
    }

    /// Mark a retyped parameter optional. No effect on return types.
    #[must_use]
    pub fn optional(mut self) -> Self {
        if let RetypeSlot::Parameter { optional, .. } = &mut self.slot {
            *optional = true;
        }
        self
    }
}

/// Output of [`SignatureEnricher::enrich`].
#[derive(Debug, Clone)]
pub struct Enriched {
    /// Rewritten declaration source.
    pub text: String,
    /// Every exported class or function, in declaration order.
    pub symbols: Vec<ExportSymbol>,
}

/// Applies [`Retype`] rules to a declaration file.
#[derive(Debug, Clone, Default)]
pub struct SignatureEnricher {
    retypes: Vec<Retype>,
}

impl SignatureEnricher {
    /// Create an enricher applying `retypes` in order.
    #[must_use]
    pub fn new(retypes: Vec<Retype>) -> Self {
        Self { retypes }
    }

    /// Retype `source` and collect its public surface.
    ///
    /// # Errors
    ///
    /// Returns a parse error, or a `Missing*` error when a rule names a
    /// class, member or parameter the file does not declare.
    pub fn enrich(&self, source: &str, origin: &str) -> TransformResult<Enriched> {
        let allocator = Allocator::default();
        let program = parse_program(&allocator, source, declaration_source_type(), origin)?;

        let classes = collect_classes(&program);
        // Keyed by range so a later rule on the same slot wins.
        let mut edits: BTreeMap<(usize, usize), String> = BTreeMap::new();

        for rule in &self.retypes {
            let (class_name, class) = find_class(&classes, rule.class.as_deref(), origin)?;
            let method = find_member(class, &rule.member, source).ok_or_else(|| {
                TransformError::MissingMember {
                    file: origin.to_owned(),
                    class: class_name.to_owned(),
                    member: rule.member.clone(),
                }
            })?;

            let (span, replacement) = match &rule.slot {
                RetypeSlot::Parameter { name, ty, optional } => {
                    retype_parameter(source, &method.value, name, ty, *optional).ok_or_else(
                        || TransformError::MissingParameter {
                            file: origin.to_owned(),
                            class: class_name.to_owned(),
                            member: rule.member.clone(),
                            param: name.clone(),
                        },
                    )?
                },
                RetypeSlot::Return { ty } => retype_return(source, &method.value, ty),
            };

            debug!(class = %class_name, member = %rule.member, slot = ?rule.slot, "retyped");
            edits.insert(span, replacement);
        }

        let edits = edits
            .into_iter()
            .map(|((start, end), text)| TextEdit::replace(start..end, text))
            .collect();

        Ok(Enriched {
            text: edit::apply(source, edits),
            symbols: export_symbols(&program, source),
        })
    }
}

/// Top-level classes, exported or not, in declaration order.
fn collect_classes<'p, 'a>(program: &'p Program<'a>) -> Vec<(&'p str, &'p Class<'a>)> {
    let mut classes = Vec::new();
    for stmt in &program.body {
        let class = match stmt {
            Statement::ClassDeclaration(class) => class,
            Statement::ExportNamedDeclaration(decl) => match &decl.declaration {
                Some(Declaration::ClassDeclaration(class)) => class,
                _ => continue,
            },
            Statement::ExportDefaultDeclaration(decl) => match &decl.declaration {
                ExportDefaultDeclarationKind::ClassDeclaration(class) => class,
                _ => continue,
            },
            _ => continue,
        };
        let name = class.id.as_ref().map_or("default", |id| id.name.as_str());
        classes.push((name, &**class));
    }
    classes
}

fn find_class<'p, 'a>(
    classes: &[(&'p str, &'p Class<'a>)],
    wanted: Option<&str>,
    origin: &str,
) -> TransformResult<(&'p str, &'p Class<'a>)> {
    let found = match wanted {
        Some(wanted) => classes.iter().find(|(name, _)| *name == wanted),
        None => classes.first(),
    };
    found.copied().ok_or_else(|| TransformError::MissingClass {
        file: origin.to_owned(),
        class: wanted.unwrap_or("<first class>").to_owned(),
    })
}

fn find_member<'p, 'a>(
    class: &'p Class<'a>,
    member: &str,
    source: &str,
) -> Option<&'p MethodDefinition<'a>> {
    class.body.body.iter().find_map(|element| {
        let ClassElement::MethodDefinition(method) = element else {
            return None;
        };
        let is_constructor = matches!(method.kind, MethodDefinitionKind::Constructor);
        let matches = if member == CONSTRUCTOR {
            is_constructor
        } else {
            !is_constructor && unquote(slice(source, method.key.span())) == member
        };
        matches.then_some(&**method)
    })
}

/// Parameter name: the text before any `?`, type annotation or initializer.
fn parameter_name(text: &str) -> &str {
    let end = text.find(['?', ':', '=']).unwrap_or(text.len());
    text[..end].trim()
}

fn retype_parameter(
    source: &str,
    function: &Function<'_>,
    name: &str,
    ty: &str,
    optional: bool,
) -> Option<((usize, usize), String)> {
    let param = function
        .params
        .items
        .iter()
        .find(|param| parameter_name(slice(source, param.span)) == name)?;

    let text = slice(source, param.span);
    let already_optional = text
        .get(name.len()..)
        .is_some_and(|rest| rest.trim_start().starts_with('?'));
    let question = if optional || already_optional { "?" } else { "" };

    let span = range(param.span);
    Some(((span.start, span.end), format!("{name}{question}: {ty}")))
}

fn retype_return(source: &str, function: &Function<'_>, ty: &str) -> ((usize, usize), String) {
    if let Some(annotation) = &function.return_type {
        let span = range(annotation.type_annotation.span());
        return ((span.start, span.end), ty.to_owned());
    }

    // No annotation: insert one after the closing parenthesis.
    let end = range(function.params.span).end;
    let at = if source[..end].ends_with(')') {
        end
    } else {
        source[end..]
            .find(')')
            .map_or(end, |offset| end.saturating_add(offset).saturating_add(1))
    };
    ((at, at), format!(": {ty}"))
}

/// Every exported class or function declaration, deduplicated in order.
fn export_symbols(program: &Program<'_>, source: &str) -> Vec<ExportSymbol> {
    let mut local: HashMap<&str, SymbolKind> = HashMap::new();
    for stmt in &program.body {
        let decl = match stmt {
            Statement::FunctionDeclaration(f) => function_symbol(f),
            Statement::ClassDeclaration(c) => class_symbol(c),
            Statement::ExportNamedDeclaration(export) => match &export.declaration {
                Some(Declaration::FunctionDeclaration(f)) => function_symbol(f),
                Some(Declaration::ClassDeclaration(c)) => class_symbol(c),
                _ => None,
            },
            _ => None,
        };
        if let Some((name, kind)) = decl {
            local.entry(name).or_insert(kind);
        }
    }

    let mut symbols: Vec<ExportSymbol> = Vec::new();
    let mut push = |name: &str, kind: SymbolKind| {
        if !symbols.iter().any(|s| s.name == name) {
            symbols.push(ExportSymbol::new(name, kind));
        }
    };

    for stmt in &program.body {
        match stmt {
            Statement::ExportNamedDeclaration(export) => {
                match &export.declaration {
                    Some(Declaration::FunctionDeclaration(f)) => {
                        if let Some((name, kind)) = function_symbol(f) {
                            push(name, kind);
                        }
                    },
                    Some(Declaration::ClassDeclaration(c)) => {
                        if let Some((name, kind)) = class_symbol(c) {
                            push(name, kind);
                        }
                    },
                    _ => {},
                }
                // Re-exports from other modules are not declarations here.
                if export.source.is_some() || export.export_kind.is_type() {
                    continue;
                }
                for spec in &export.specifiers {
                    let local_name = unquote(slice(source, spec.local.span()));
                    if let Some(kind) = local.get(local_name) {
                        push(unquote(slice(source, spec.exported.span())), *kind);
                    }
                }
            },
            Statement::ExportDefaultDeclaration(export) => match &export.declaration {
                ExportDefaultDeclarationKind::FunctionDeclaration(_) => {
                    push("default", SymbolKind::Callable);
                },
                ExportDefaultDeclarationKind::ClassDeclaration(_) => {
                    push("default", SymbolKind::Class);
                },
                _ => {},
            },
            _ => {},
        }
    }

    symbols
}

fn function_symbol<'p>(function: &'p Function<'_>) -> Option<(&'p str, SymbolKind)> {
    function
        .id
        .as_ref()
        .map(|id| (id.name.as_str(), SymbolKind::Callable))
}

fn class_symbol<'p>(class: &'p Class<'_>) -> Option<(&'p str, SymbolKind)> {
    class
        .id
        .as_ref()
        .map(|id| (id.name.as_str(), SymbolKind::Class))
}

#[cfg(test)]
mod tests {
    use super::*;

    const DECLS: &str = r#"/* tslint:disable */
/* eslint-disable */
export type TiktokenEncoding = "gpt2" | "r50k_base" | "cl100k_base";
export function get_encoding(encoding: TiktokenEncoding, extend_special_tokens?: Record<string, number>): Tiktoken;
export function encoding_for_model(model: string): Tiktoken;
export class Tiktoken {
  free(): void;
  constructor(tiktoken_bfe: string, special_tokens: any, pat_str: string);
  encode(text: string, allowed_special: any, disallowed_special: any): Uint32Array;
  encode_ordinary(text: string): Uint32Array;
  token_byte_values(): Array<any>;
  readonly name: string | undefined;
}
"#;

    fn run(retypes: Vec<Retype>) -> TransformResult<Enriched> {
        SignatureEnricher::new(retypes).enrich(DECLS, "tiktoken.d.ts")
    }

    #[test]
    fn retypes_constructor_parameter() {
        let out = run(vec![Retype::parameter(
            None,
            "constructor",
            "special_tokens",
            "Record<string, number>",
        )])
        .unwrap();
        assert!(out.text.contains(
            "constructor(tiktoken_bfe: string, special_tokens: Record<string, number>, pat_str: string);"
        ));
    }

    #[test]
    fn optional_parameters_gain_question_mark() {
        let out = run(vec![
            Retype::parameter(None, "encode", "allowed_special", r#""all" | string[]"#).optional(),
            Retype::parameter(None, "encode", "disallowed_special", r#""all" | string[]"#)
                .optional(),
        ])
        .unwrap();
        assert!(out.text.contains(
            r#"encode(text: string, allowed_special?: "all" | string[], disallowed_special?: "all" | string[]): Uint32Array;"#
        ));
    }

    #[test]
    fn retypes_return_type() {
        let out = run(vec![Retype::returns(
            Some("Tiktoken".into()),
            "token_byte_values",
            "Array<Array<number>>",
        )])
        .unwrap();
        assert!(out.text.contains("token_byte_values(): Array<Array<number>>;"));
    }

    #[test]
    fn inserts_missing_return_annotation() {
        let source = "export declare class A {\n  f(x: number);\n}\n";
        let out = SignatureEnricher::new(vec![Retype::returns(None, "f", "string")])
            .enrich(source, "a.d.ts")
            .unwrap();
        assert!(out.text.contains("f(x: number): string;"));
    }

    #[test]
    fn no_rules_leaves_text_untouched() {
        let out = run(Vec::new()).unwrap();
        assert_eq!(out.text, DECLS);
    }

    #[test]
    fn extracts_classes_and_functions_only() {
        let out = run(Vec::new()).unwrap();
        assert_eq!(
            out.symbols,
            vec![
                ExportSymbol::new("get_encoding", SymbolKind::Callable),
                ExportSymbol::new("encoding_for_model", SymbolKind::Callable),
                ExportSymbol::new("Tiktoken", SymbolKind::Class),
            ]
        );
    }

    #[test]
    fn export_lists_resolve_to_local_declarations() {
        let source = "declare class A {}\ndeclare function f(): void;\ndeclare const v: number;\nexport { A as B, f, v };\n";
        let out = SignatureEnricher::default().enrich(source, "x.d.ts").unwrap();
        assert_eq!(
            out.symbols,
            vec![
                ExportSymbol::new("B", SymbolKind::Class),
                ExportSymbol::new("f", SymbolKind::Callable),
            ]
        );
    }

    #[test]
    fn overloads_are_listed_once() {
        let source = "export function f(a: string): void;\nexport function f(a: number): void;\n";
        let out = SignatureEnricher::default().enrich(source, "x.d.ts").unwrap();
        assert_eq!(out.symbols, vec![ExportSymbol::new("f", SymbolKind::Callable)]);
    }

    #[test]
    fn missing_member_fails_fast() {
        let err = run(vec![Retype::returns(None, "decode_all", "string")]).unwrap_err();
        assert!(matches!(
            err,
            TransformError::MissingMember { ref class, ref member, .. }
                if class == "Tiktoken" && member == "decode_all"
        ));
    }

    #[test]
    fn missing_parameter_fails_fast() {
        let err = run(vec![Retype::parameter(None, "encode", "special", "string")]).unwrap_err();
        assert!(matches!(err, TransformError::MissingParameter { ref param, .. } if param == "special"));
    }

    #[test]
    fn missing_class_fails_fast() {
        let err = run(vec![Retype::returns(Some("Encoder".into()), "encode", "string")])
            .unwrap_err();
        assert!(matches!(err, TransformError::MissingClass { ref class, .. } if class == "Encoder"));
    }

    #[test]
    fn parameter_name_stops_at_annotation() {
        assert_eq!(parameter_name("special_tokens: any"), "special_tokens");
        assert_eq!(parameter_name("allowed?: any"), "allowed");
        assert_eq!(parameter_name("x = 1"), "x");
    }
}
