//! Shared OXC parsing helpers.

use std::ops::Range;

use oxc::ast::ast::Program;
use oxc::parser::Parser;
use oxc::span::{SourceType, Span};
use oxc_allocator::Allocator;

use crate::error::{TransformError, TransformResult};

/// Parse `source` and fail on any diagnostic.
pub(crate) fn parse_program<'a>(
    allocator: &'a Allocator,
    source: &'a str,
    source_type: SourceType,
    origin: &str,
) -> TransformResult<Program<'a>> {
    let parse_ret = Parser::new(allocator, source, source_type).parse();

    if parse_ret.panicked || !parse_ret.errors.is_empty() {
        let errors: Vec<String> = parse_ret.errors.iter().map(|e| format!("{e}")).collect();
        return Err(TransformError::Parse {
            file: origin.to_owned(),
            message: errors.join("\n"),
        });
    }

    Ok(parse_ret.program)
}

/// Source type for an ES module.
pub(crate) fn module_source_type() -> SourceType {
    SourceType::mjs()
}

/// Source type for a `.d.ts` declaration file.
pub(crate) fn declaration_source_type() -> SourceType {
    SourceType::from_path("module.d.ts").unwrap_or_else(|_| SourceType::ts())
}

/// Byte range of a span.
pub(crate) fn range(span: Span) -> Range<usize> {
    span.start as usize..span.end as usize
}

/// Text covered by a span.
pub(crate) fn slice(source: &str, span: Span) -> &str {
    &source[range(span)]
}

/// A double-quoted JavaScript string literal.
pub(crate) fn js_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| format!("\"{value}\""))
}

/// Strip the quotes of a string-literal module export name.
pub(crate) fn unquote(name: &str) -> &str {
    name.strip_prefix(['"', '\''])
        .and_then(|n| n.strip_suffix(['"', '\'']))
        .unwrap_or(name)
}

/// Whether `name` can be written as a dotted property access.
pub(crate) fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

/// `object.name`, or `object["name"]` when `name` is not an identifier.
pub(crate) fn member(object: &str, name: &str) -> String {
    if is_identifier(name) {
        format!("{object}.{name}")
    } else {
        format!("{object}[{}]", js_string(name))
    }
}

/// Leading whitespace of the line containing byte `pos`.
pub(crate) fn line_indent(source: &str, pos: usize) -> &str {
    let line_start = source[..pos].rfind('\n').map_or(0, |i| i.saturating_add(1));
    let line = &source[line_start..];
    let width = line.len().saturating_sub(line.trim_start_matches([' ', '\t']).len());
    &line[..width]
}
