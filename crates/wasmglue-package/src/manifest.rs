//! `package.json` rewriting and distribution assembly.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, info};
use wasmglue_config::{Config, PackageSection};

use crate::error::{PackageError, PackageResult};
use crate::exports::export_map;

/// Extensions published per registry encoder.
const ENCODER_EXTENSIONS: &[&str] = &["json", "js", "cjs", "d.ts"];

/// Rewrite a parsed source manifest for publication.
///
/// Removes the configured keys, publishes every file of the distribution,
/// points `main` and `types` at the root loader and replaces `exports`.
///
/// # Errors
///
/// Returns [`PackageError::Shape`] if the manifest is not a JSON object.
pub fn rewrite_manifest(
    manifest: Value,
    origin: &Path,
    config: &Config,
    package: &PackageSection,
    registry_keys: &[String],
) -> PackageResult<Value> {
    let Value::Object(mut pkg) = manifest else {
        return Err(PackageError::Shape {
            path: origin.to_path_buf(),
            message: "package manifest must be a JSON object".to_owned(),
        });
    };

    for key in &package.strip {
        pkg.shift_remove(key);
    }

    let module = &config.glue.module;
    pkg.insert("files".to_owned(), Value::from(vec!["**/*"]));
    pkg.insert("main".to_owned(), Value::String(format!("{module}.cjs")));
    pkg.insert("types".to_owned(), Value::String(format!("{module}.d.ts")));
    pkg.insert(
        "exports".to_owned(),
        Value::Object(export_map(config, package, registry_keys)),
    );

    Ok(Value::Object(pkg))
}

/// Copy static files and encoders into the distribution and write the
/// published `package.json`. Returns the manifest path.
///
/// # Errors
///
/// Returns an error if an input cannot be read or parsed, or an output
/// cannot be written.
pub fn assemble(config: &Config, package: &PackageSection) -> PackageResult<PathBuf> {
    let dist = config.dist_root();

    let registry_keys = match &package.registry {
        Some(registry) => read_registry_keys(&config.resolve(registry))?,
        None => Vec::new(),
    };

    if let Some(ranks_dir) = &package.ranks_dir
        && !registry_keys.is_empty()
    {
        let ranks_dir = config.resolve(ranks_dir);
        let encoders = dist.join("encoders");
        create_dir(&encoders)?;
        for key in &registry_keys {
            for ext in ENCODER_EXTENSIONS {
                let file = format!("{key}.{ext}");
                copy(&ranks_dir.join(&file), &encoders.join(&file))?;
            }
        }
        info!(count = registry_keys.len(), "encoders copied");
    }

    for entry in &package.copy {
        copy(&config.resolve(&entry.from), &dist.join(&entry.to))?;
    }

    let source = config.resolve(&package.manifest);
    let manifest = read_json(&source)?;
    let manifest = rewrite_manifest(manifest, &source, config, package, &registry_keys)?;

    let dest = dist.join("package.json");
    let text = serde_json::to_string_pretty(&manifest).map_err(|e| PackageError::Json {
        path: dest.clone(),
        source: e,
    })?;
    fs::write(&dest, text).map_err(|e| PackageError::Write {
        path: dest.clone(),
        source: e,
    })?;
    info!(path = %dest.display(), "package manifest written");
    Ok(dest)
}

/// Top-level keys of the registry document, in file order.
fn read_registry_keys(path: &Path) -> PackageResult<Vec<String>> {
    match read_json(path)? {
        Value::Object(registry) => Ok(registry.keys().cloned().collect()),
        _ => Err(PackageError::Shape {
            path: path.to_path_buf(),
            message: "registry must be a JSON object".to_owned(),
        }),
    }
}

fn read_json(path: &Path) -> PackageResult<Value> {
    let text = fs::read_to_string(path).map_err(|e| PackageError::Read {
        path: path.to_path_buf(),
        source: e,
    })?;
    serde_json::from_str(&text).map_err(|e| PackageError::Json {
        path: path.to_path_buf(),
        source: e,
    })
}

fn create_dir(path: &Path) -> PackageResult<()> {
    fs::create_dir_all(path).map_err(|e| PackageError::Write {
        path: path.to_path_buf(),
        source: e,
    })
}

fn copy(from: &Path, to: &Path) -> PackageResult<()> {
    if !from.is_file() {
        return Err(PackageError::Read {
            path: from.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        });
    }
    if let Some(parent) = to.parent() {
        create_dir(parent)?;
    }
    fs::copy(from, to).map_err(|e| PackageError::Write {
        path: to.to_path_buf(),
        source: e,
    })?;
    debug!(from = %from.display(), to = %to.display(), "copied");
    Ok(())
}
