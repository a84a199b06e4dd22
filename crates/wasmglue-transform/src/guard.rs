//! Initialization guards for exported entry points.
//!
//! Generated glue keeps the instantiated binary in a module-scoped handle
//! that stays unset until the loader binds it. Every exported function,
//! method and constructor whose body reads that handle gets a first
//! statement that throws while the handle is still unset.

use std::collections::HashSet;

use oxc::ast::ast::{
    BinaryOperator, Class, ClassElement, Declaration, ExportDefaultDeclarationKind, Expression,
    Function, FunctionBody, IdentifierReference, MethodDefinitionKind, Program, Statement,
};
use oxc::ast_visit::Visit;
use oxc::span::GetSpan;
use oxc_allocator::Allocator;
use tracing::debug;

use crate::edit::{self, TextEdit};
use crate::error::TransformResult;
use crate::parse::{js_string, line_indent, module_source_type, parse_program, range, slice, unquote};

/// What happened to each exported entry point, labelled `name` or
/// `Class.member`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GuardReport {
    /// Entry points that received a guard.
    pub guarded: Vec<String>,
    /// Entry points whose first statement already was the guard.
    pub already_guarded: Vec<String>,
    /// The handle setter.
    pub exempt: Vec<String>,
    /// Entry points that never reference the handle.
    pub untouched: Vec<String>,
}

/// Output of [`GuardInjector::inject`].
#[derive(Debug, Clone)]
pub struct Guarded {
    /// Rewritten glue source.
    pub text: String,
    /// Per-entry-point outcome.
    pub report: GuardReport,
}

/// Prepends initialization guards to exported entry points.
#[derive(Debug, Clone)]
pub struct GuardInjector {
    handle: String,
    setter: String,
    message: String,
}

impl GuardInjector {
    /// Guard references to `handle`, exempting the function named `setter`.
    #[must_use]
    pub fn new(
        handle: impl Into<String>,
        setter: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            handle: handle.into(),
            setter: setter.into(),
            message: message.into(),
        }
    }

    /// The statement prepended to guarded bodies.
    #[must_use]
    pub fn guard_statement(&self) -> String {
        format!(
            "if ({} == null) throw new Error({});",
            self.handle,
            js_string(&self.message)
        )
    }

    /// Guard every exported entry point of `source`.
    ///
    /// Bodies that already open with `if (<handle> == null) throw ...` are
    /// left alone, whatever the message, so running the injector twice
    /// yields the same text as running it once.
    ///
    /// # Errors
    ///
    /// Returns a parse error if `source` is not a valid ES module.
    pub fn inject(&self, source: &str, origin: &str) -> TransformResult<Guarded> {
        let allocator = Allocator::default();
        let program = parse_program(&allocator, source, module_source_type(), origin)?;

        let guard = self.guard_statement();
        let mut report = GuardReport::default();
        let mut edits = Vec::new();

        for (label, function) in entry_points(&program, source) {
            let Some(body) = &function.body else {
                continue;
            };

            if function
                .id
                .as_ref()
                .is_some_and(|id| id.name.as_str() == self.setter)
            {
                debug!(entry = %label, "exempt handle setter");
                report.exempt.push(label);
                continue;
            }

            if body.statements.first().is_some_and(|first| self.is_guard(first)) {
                debug!(entry = %label, "guard already present");
                report.already_guarded.push(label);
                continue;
            }

            if !self.references_handle(function, body) {
                report.untouched.push(label);
                continue;
            }

            edits.push(guard_edit(source, body, &guard));
            debug!(entry = %label, "guard inserted");
            report.guarded.push(label);
        }

        Ok(Guarded {
            text: edit::apply(source, edits),
            report,
        })
    }

    /// `if (<handle> == null) throw ...;` with any thrown value.
    fn is_guard(&self, statement: &Statement<'_>) -> bool {
        let Statement::IfStatement(check) = statement else {
            return false;
        };
        let Expression::BinaryExpression(test) = &check.test else {
            return false;
        };
        let handle_is_null = matches!(
            (&test.left, &test.right),
            (Expression::Identifier(id), Expression::NullLiteral(_)) if id.name.as_str() == self.handle
        );
        handle_is_null
            && matches!(test.operator, BinaryOperator::Equality)
            && check.alternate.is_none()
            && matches!(check.consequent, Statement::ThrowStatement(_))
    }

    fn references_handle(&self, function: &Function<'_>, body: &FunctionBody<'_>) -> bool {
        let mut finder = HandleReferences {
            handle: &self.handle,
            found: false,
        };
        finder.visit_formal_parameters(&function.params);
        finder.visit_function_body(body);
        finder.found
    }
}

struct HandleReferences<'h> {
    handle: &'h str,
    found: bool,
}

impl<'a> Visit<'a> for HandleReferences<'_> {
    fn visit_identifier_reference(&mut self, it: &IdentifierReference<'a>) {
        if it.name.as_str() == self.handle {
            self.found = true;
        }
    }
}

/// Put the guard on its own line after the opening brace, or after the
/// directive prologue. A first statement on the same line moves to the
/// next one.
fn guard_edit(source: &str, body: &FunctionBody<'_>, guard: &str) -> TextEdit {
    let at = body.directives.last().map_or_else(
        || range(body.span).start.saturating_add(1),
        |directive| range(directive.span).end,
    );
    let nested = format!("{}    ", line_indent(source, at));

    let Some(first) = body.statements.first() else {
        return TextEdit::insert(at, format!("\n{nested}{guard}"));
    };
    let start = range(first.span()).start;
    let gap = source.get(at..start).unwrap_or_default();
    if gap.contains('\n') {
        let indent = line_indent(source, start);
        return TextEdit::insert(at, format!("\n{indent}{guard}"));
    }

    let blank = gap.len().saturating_sub(gap.trim_start().len());
    TextEdit::replace(
        at..at.saturating_add(blank),
        format!("\n{nested}{guard}\n{nested}"),
    )
}

/// Exported functions and every method of exported classes, in source
/// order. Covers inline exports, `export default` and `export { .. }` lists.
fn entry_points<'p, 'a>(
    program: &'p Program<'a>,
    source: &str,
) -> Vec<(String, &'p Function<'a>)> {
    let listed: HashSet<&str> = program
        .body
        .iter()
        .filter_map(|stmt| match stmt {
            Statement::ExportNamedDeclaration(export) if export.source.is_none() => {
                Some(export.specifiers.iter())
            },
            _ => None,
        })
        .flatten()
        .map(|spec| unquote(slice(source, spec.local.span())))
        .collect();
    let is_listed = |id: Option<&str>| id.is_some_and(|name| listed.contains(name));

    let mut out = Vec::new();
    for stmt in &program.body {
        match stmt {
            Statement::ExportNamedDeclaration(export) => match &export.declaration {
                Some(Declaration::FunctionDeclaration(f)) => push_function(&mut out, f),
                Some(Declaration::ClassDeclaration(c)) => push_class(&mut out, c, source),
                _ => {},
            },
            Statement::ExportDefaultDeclaration(export) => match &export.declaration {
                ExportDefaultDeclarationKind::FunctionDeclaration(f) => push_function(&mut out, f),
                ExportDefaultDeclarationKind::ClassDeclaration(c) => push_class(&mut out, c, source),
                _ => {},
            },
            Statement::FunctionDeclaration(f)
                if is_listed(f.id.as_ref().map(|id| id.name.as_str())) =>
            {
                push_function(&mut out, f);
            },
            Statement::ClassDeclaration(c)
                if is_listed(c.id.as_ref().map(|id| id.name.as_str())) =>
            {
                push_class(&mut out, c, source);
            },
            _ => {},
        }
    }
    out
}

fn push_function<'p, 'a>(out: &mut Vec<(String, &'p Function<'a>)>, function: &'p Function<'a>) {
    let name = function
        .id
        .as_ref()
        .map_or_else(|| "default".to_owned(), |id| id.name.to_string());
    out.push((name, function));
}

fn push_class<'p, 'a>(out: &mut Vec<(String, &'p Function<'a>)>, class: &'p Class<'a>, source: &str) {
    let class_name = class.id.as_ref().map_or("default", |id| id.name.as_str());
    for element in &class.body.body {
        let ClassElement::MethodDefinition(method) = element else {
            continue;
        };
        let member = match method.kind {
            MethodDefinitionKind::Constructor => "constructor",
            _ => unquote(slice(source, method.key.span())),
        };
        out.push((format!("{class_name}.{member}"), &method.value));
    }
}
