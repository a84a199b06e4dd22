//! The CommonJS loader emitted next to each target's glue.
//!
//! The template (`loader.cjs`) is embedded at compile time via
//! `include_str!()` and filled with JSON-escaped string literals.

use crate::search::InstallLocation;

/// The loader script, embedded at compile time.
pub const LOADER_TEMPLATE: &str = include_str!("../templates/loader.cjs");

/// Parameters of one rendered loader.
#[derive(Debug, Clone)]
pub struct LoaderSpec<'a> {
    /// Specifier of the CommonJS glue, e.g. `./tiktoken_bg.cjs`.
    pub glue_require: &'a str,
    /// Import namespace the binary expects the glue under, e.g.
    /// `./tiktoken_bg.js`.
    pub glue_import: &'a str,
    /// Glue function that binds the instantiated binary.
    pub setter: &'a str,
    /// Where the binary is searched.
    pub location: &'a InstallLocation,
    /// Public names re-exported from the glue.
    pub exports: &'a [String],
}

/// Render the loader for `spec`.
#[must_use]
pub fn render_loader(spec: &LoaderSpec<'_>) -> String {
    let exports: Vec<String> = spec
        .exports
        .iter()
        .map(|name| {
            let slot = literal(name);
            format!("exports[{slot}] = glue[{slot}];")
        })
        .collect();
    let segments =
        serde_json::to_string(&spec.location.segments()).unwrap_or_else(|_| "[]".to_owned());

    LOADER_TEMPLATE
        .replace("{{GLUE_REQUIRE}}", &literal(spec.glue_require))
        .replace("{{GLUE_IMPORT}}", &literal(spec.glue_import))
        .replace("{{INSTALL_SEGMENTS}}", &segments)
        .replace("{{BINARY}}", &literal(&spec.location.binary))
        .replace(
            "{{MISSING}}",
            &literal(&format!("Missing {}", spec.location.binary)),
        )
        .replace("{{SETTER}}", &literal(spec.setter))
        .replace("{{EXPORTS}}", &exports.join("\n"))
}

fn literal(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| format!("\"{value}\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render() -> String {
        let location = InstallLocation {
            scope: "@zerfl".into(),
            package: "tiktoken".into(),
            target_dir: "lite".into(),
            binary: "tiktoken_bg.wasm".into(),
        };
        let exports = vec!["get_encoding".to_owned(), "Tiktoken".to_owned()];
        render_loader(&LoaderSpec {
            glue_require: "./tiktoken_bg.cjs",
            glue_import: "./tiktoken_bg.js",
            setter: "__wbg_set_wasm",
            location: &location,
            exports: &exports,
        })
    }

    #[test]
    fn template_is_nonempty() {
        assert!(LOADER_TEMPLATE.contains("WebAssembly.Instance"));
    }

    #[test]
    fn every_placeholder_is_filled() {
        assert!(!render().contains("{{"));
    }

    #[test]
    fn loader_requires_commonjs_glue() {
        let loader = render();
        assert!(loader.starts_with("const glue = require(\"./tiktoken_bg.cjs\");"));
        assert!(loader.contains("imports[\"./tiktoken_bg.js\"] = glue;"));
    }

    #[test]
    fn loader_searches_install_location() {
        let loader = render();
        assert!(loader.contains(
            "\"node_modules\", ...[\"@zerfl\",\"tiktoken\",\"lite\"], \"tiktoken_bg.wasm\""
        ));
        assert!(loader.contains("candidates.unshift(path.join(__dirname, \"tiktoken_bg.wasm\"));"));
        assert!(loader.contains("throw new Error(\"Missing tiktoken_bg.wasm\")"));
    }

    #[test]
    fn binding_happens_before_exports() {
        let loader = render();
        let bind = loader.find("glue[\"__wbg_set_wasm\"](wasmInstance.exports);").unwrap();
        let first_export = loader.find("exports[\"get_encoding\"] = glue[\"get_encoding\"];").unwrap();
        assert!(bind < first_export);
        assert!(loader.trim_end().ends_with("exports[\"Tiktoken\"] = glue[\"Tiktoken\"];"));
    }
}
