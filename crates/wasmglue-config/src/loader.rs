//! Project file loading.
//!
//! 1. Parse `defaults.toml` → base
//! 2. Merge the project file
//! 3. Apply environment fallbacks
//! 4. Deserialize the merged tree → `Config`
//! 5. Validate

use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, info};

use crate::error::{ConfigError, ConfigResult};
use crate::merge::deep_merge;
use crate::types::Config;
use crate::validate;

/// Embedded default configuration.
const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// Maximum size of a project file (1 MiB).
const MAX_CONFIG_FILE_SIZE: u64 = 1_048_576;

/// Environment variable overriding `logging.level`.
pub const LOG_LEVEL_ENV: &str = "WASMGLUE_LOG_LEVEL";

/// Load the project file at `path`.
///
/// Relative paths inside the file resolve against the file's directory.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file cannot be read or parsed, or if the
/// merged configuration fails validation.
pub fn load(path: &Path) -> ConfigResult<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.display().to_string(),
        source: e,
    })?;

    // Check size after reading to avoid TOCTOU between stat and read.
    if content.len() as u64 > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::ValidationError {
            field: path.display().to_string(),
            message: format!(
                "config file is {} bytes, exceeding the {MAX_CONFIG_FILE_SIZE} byte limit",
                content.len(),
            ),
        });
    }

    let mut config = load_str(&content, &path.display().to_string())?;
    config.root = path.parent().map(Path::to_path_buf).unwrap_or_default();
    info!(path = %path.display(), targets = config.targets.len(), "loaded project config");
    Ok(config)
}

/// Layer an in-memory project document over the embedded defaults.
///
/// `origin` names the document in error messages.
///
/// # Errors
///
/// Returns a [`ConfigError`] if either document fails to parse or the merged
/// configuration fails validation.
pub fn load_str(source: &str, origin: &str) -> ConfigResult<Config> {
    let mut merged: toml::Value =
        toml::from_str(DEFAULTS_TOML).map_err(|e| ConfigError::ParseError {
            path: "<embedded defaults>".to_owned(),
            source: e,
        })?;

    let overlay: toml::Value = toml::from_str(source).map_err(|e| ConfigError::ParseError {
        path: origin.to_owned(),
        source: e,
    })?;
    deep_merge(&mut merged, &overlay);

    let applied = apply_env_fallbacks(&mut merged, &collect_env_vars());
    if applied > 0 {
        debug!(count = applied, "applied environment variable overrides");
    }

    let config: Config =
        merged
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::ParseError {
                path: origin.to_owned(),
                source: e,
            })?;

    validate::validate(&config)?;
    Ok(config)
}

/// Snapshot the `WASMGLUE_*` environment variables.
fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars()
        .filter(|(key, _)| key.starts_with("WASMGLUE_"))
        .collect()
}

/// Apply environment overrides to the merged tree. Returns the number of
/// fields that were overridden.
pub(crate) fn apply_env_fallbacks(
    merged: &mut toml::Value,
    env_vars: &HashMap<String, String>,
) -> usize {
    let mut applied = 0_usize;

    if let Some(level) = env_vars.get(LOG_LEVEL_ENV).filter(|v| !v.trim().is_empty())
        && let Some(root) = merged.as_table_mut()
    {
        let logging = root
            .entry("logging")
            .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
        if let Some(table) = logging.as_table_mut() {
            table.insert(
                "level".to_owned(),
                toml::Value::String(level.trim().to_owned()),
            );
            applied = applied.saturating_add(1);
        }
    }

    applied
}
