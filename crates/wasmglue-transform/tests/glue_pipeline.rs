//! End-to-end: declarations are retyped, glue is guarded and dualized.
//!
//! Mirrors the artifacts the code generator produces for a class `Tok`
//! with a guarded method `encode` and a free function `get_encoding`.

use std::collections::BTreeSet;

use wasmglue_transform::{
    ExportSymbol, GuardInjector, ModuleDualizer, Retype, SignatureEnricher, SourceModule,
    SymbolKind, TransformError, commonjs_export_names, ensure_commonjs_exports,
};

const DECLS: &str = r#"/* tslint:disable */
/* eslint-disable */
export function get_encoding(encoding: string): Tok;
export class Tok {
  free(): void;
  constructor(bpe: string, special_tokens: any);
  encode(text: string): Uint32Array;
}
"#;

const GLUE: &str = r#"let wasm;
export function __wbg_set_wasm(val) {
    wasm = val;
}

const TokFinalization = (typeof FinalizationRegistry === 'undefined')
    ? { register: () => {}, unregister: () => {} }
    : new FinalizationRegistry(ptr => wasm.__wbg_tok_free(ptr >>> 0));

export class Tok {
    static __wrap(ptr) {
        const obj = Object.create(Tok.prototype);
        obj.__wbg_ptr = ptr;
        TokFinalization.register(obj, obj.__wbg_ptr, obj);
        return obj;
    }
    free() {
        const ptr = this.__wbg_ptr;
        this.__wbg_ptr = 0;
        wasm.__wbg_tok_free(ptr);
    }
    constructor(bpe, special_tokens) {
        const ret = wasm.tok_new(bpe, special_tokens);
        this.__wbg_ptr = ret >>> 0;
        return this;
    }
    encode(text) {
        return wasm.tok_encode(this.__wbg_ptr, text);
    }
}

export function get_encoding(encoding) {
    const ret = wasm.get_encoding(encoding);
    return Tok.__wrap(ret);
}
"#;

fn injector() -> GuardInjector {
    GuardInjector::new(
        "wasm",
        "__wbg_set_wasm",
        "tok: WASM binary has not been properly initialized.",
    )
}

/// First statement of the body that follows `header`.
fn first_statement_after<'s>(source: &'s str, header: &str) -> &'s str {
    let start = source.find(header).unwrap();
    let body = &source[start..];
    let open = body.find('{').unwrap();
    body[open + 1..].trim_start().lines().next().unwrap().trim()
}

#[test]
fn declaration_parameter_gets_mapping_type() {
    let enriched = SignatureEnricher::new(vec![Retype::parameter(
        Some("Tok".into()),
        "constructor",
        "special_tokens",
        "Record<string, number>",
    )])
    .enrich(DECLS, "tok.d.ts")
    .unwrap();

    assert!(
        enriched
            .text
            .contains("constructor(bpe: string, special_tokens: Record<string, number>);")
    );
    assert_eq!(
        enriched.symbols,
        vec![
            ExportSymbol::new("get_encoding", SymbolKind::Callable),
            ExportSymbol::new("Tok", SymbolKind::Class),
        ]
    );
}

#[test]
fn every_handle_touching_entry_point_starts_with_guard() {
    let guarded = injector().inject(GLUE, "tok_bg.js").unwrap();
    let guard = injector().guard_statement();

    for header in [
        "    encode(text)",
        "    free()",
        "    constructor(bpe, special_tokens)",
        "export function get_encoding(encoding)",
    ] {
        assert_eq!(first_statement_after(&guarded.text, header), guard, "{header}");
    }
    assert_eq!(
        first_statement_after(&guarded.text, "export function __wbg_set_wasm(val)"),
        "wasm = val;"
    );
    assert_eq!(
        first_statement_after(&guarded.text, "static __wrap(ptr)"),
        "const obj = Object.create(Tok.prototype);"
    );
}

#[test]
fn commonjs_glue_drops_export_keywords_and_assigns_in_order() {
    let guarded = injector().inject(GLUE, "tok_bg.js").unwrap();
    let module = SourceModule::parse(&guarded.text, "tok_bg.js").unwrap();
    let cjs = ModuleDualizer::new().dualize(&module);

    assert!(!cjs.contains("export class Tok"));
    assert!(!cjs.contains("export function get_encoding"));
    assert!(cjs.contains("class Tok {"));

    let tok = cjs.find("module.exports.Tok = Tok;").unwrap();
    let get_encoding = cjs.find("module.exports.get_encoding = function (encoding)").unwrap();
    assert!(tok < get_encoding);

    // The finalization registry is created before the class, as in ESM.
    assert!(cjs.find("const TokFinalization").unwrap() < cjs.find("class Tok {").unwrap());
    // The guard survives dualization.
    assert!(cjs.contains(&format!(
        "function (encoding) {{\n    {}",
        injector().guard_statement()
    )));
}

#[test]
fn esm_and_commonjs_expose_the_same_names() {
    let guarded = injector().inject(GLUE, "tok_bg.js").unwrap();
    let module = SourceModule::parse(&guarded.text, "tok_bg.js").unwrap();
    let cjs = ModuleDualizer::new().dualize(&module);

    let esm_names: BTreeSet<String> = module.exported_names().into_iter().collect();
    let cjs_names: BTreeSet<String> = commonjs_export_names(&cjs, "tok_bg.cjs")
        .unwrap()
        .into_iter()
        .collect();
    assert_eq!(esm_names, cjs_names);

    let symbols = SignatureEnricher::default()
        .enrich(DECLS, "tok.d.ts")
        .unwrap()
        .symbols;
    module.ensure_exports(&symbols, "tok_bg.js").unwrap();
    ensure_commonjs_exports(&cjs, &symbols, "tok_bg.cjs").unwrap();
}

#[test]
fn drift_between_declarations_and_glue_is_fatal() {
    let module = SourceModule::parse("export function other() {}\n", "tok_bg.js").unwrap();
    let symbols = vec![ExportSymbol::new("Tok", SymbolKind::Class)];
    let err = module.ensure_exports(&symbols, "tok_bg.js").unwrap_err();
    assert!(matches!(err, TransformError::MissingExport { ref name, .. } if name == "Tok"));
}

#[test]
fn pipeline_is_stable_on_its_own_output() {
    let once = injector().inject(GLUE, "tok_bg.js").unwrap().text;
    let module = SourceModule::parse(&once, "tok_bg.js").unwrap();
    let reparsed = module.render_esm();
    assert_eq!(reparsed, once);

    let twice = injector().inject(&reparsed, "tok_bg.js").unwrap();
    assert_eq!(twice.text, once);

    let first = ModuleDualizer::new().dualize(&module);
    let second = ModuleDualizer::new()
        .dualize_source(&twice.text, "tok_bg.js")
        .unwrap();
    assert_eq!(first, second);
}
