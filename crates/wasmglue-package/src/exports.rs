//! The `exports` map of the published package.
//!
//! Condition order matters to Node: `types` first, then the edge runtime
//! condition, then `node`, then `default`. The map relies on
//! `serde_json`'s `preserve_order` feature to keep insertion order.

use serde_json::{Map, Value};
use wasmglue_config::{Config, PackageSection};

/// An ordered `exports` map.
pub type ExportMap = Map<String, Value>;

/// Build the export map for every target, companion, copied file and
/// registry encoder.
#[must_use]
pub fn export_map(config: &Config, package: &PackageSection, registry_keys: &[String]) -> ExportMap {
    let module = &config.glue.module;
    let binary = config.glue.binary_file();
    let edge = &package.edge_condition;
    let mut map = ExportMap::new();

    for target in &config.targets {
        map.insert(
            subpath_key(&target.dir, None),
            conditional(&subpath(&target.dir, module), edge),
        );
        for companion in &config.companions {
            map.insert(
                subpath_key(&target.dir, Some(&companion.name)),
                conditional(&subpath(&target.dir, &companion.name), edge),
            );
        }

        let wasm = subpath(&target.dir, &binary);
        for key in [wasm.clone(), format!("{wasm}?module")] {
            let mut entry = Map::new();
            entry.insert("types".to_owned(), Value::String(format!("{wasm}.d.ts")));
            entry.insert("default".to_owned(), Value::String(key.clone()));
            map.insert(key, Value::Object(entry));
        }
    }

    for copy in package.copy.iter().filter(|copy| copy.export) {
        let path = format!("./{}", copy.to);
        map.insert(path.clone(), Value::String(path));
    }

    for key in registry_keys {
        let json = format!("./encoders/{key}.json");
        map.insert(json.clone(), Value::String(json));
        map.insert(
            format!("./encoders/{key}"),
            conditional(&format!("./encoders/{key}"), edge),
        );
    }

    map
}

/// `./<dir>/<file>`, or `./<file>` for the root target.
pub(crate) fn subpath(dir: &str, file: &str) -> String {
    if dir.is_empty() {
        format!("./{file}")
    } else {
        format!("./{dir}/{file}")
    }
}

/// Export map key of a target (`.` or `./<dir>`) or one of its companions.
fn subpath_key(dir: &str, name: Option<&str>) -> String {
    match (dir.is_empty(), name) {
        (true, None) => ".".to_owned(),
        (false, None) => format!("./{dir}"),
        (_, Some(name)) => subpath(dir, name),
    }
}

/// Conditional entry for a module available as `.d.ts`, `.js` and `.cjs`.
fn conditional(stem: &str, edge: &str) -> Value {
    let mut entry = Map::new();
    entry.insert("types".to_owned(), Value::String(format!("{stem}.d.ts")));
    entry.insert(edge.to_owned(), Value::String(format!("{stem}.js")));
    entry.insert("node".to_owned(), Value::String(format!("{stem}.cjs")));
    entry.insert("default".to_owned(), Value::String(format!("{stem}.js")));
    Value::Object(entry)
}
