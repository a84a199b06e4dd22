//! Post-merge configuration validation.
//!
//! Validates that deserialized [`Config`](crate::Config) values describe a
//! runnable pipeline before any artifact is touched.

use std::collections::HashSet;

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;

/// Validate a fully-merged and deserialized configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_glue(config)?;
    validate_targets(config)?;
    validate_retype(config)?;
    validate_companions(config)?;
    validate_package(config)?;
    validate_logging(config)?;
    Ok(())
}

/// Whether `name` is a plain JavaScript identifier (ASCII subset).
#[must_use]
pub fn is_js_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {},
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

fn invalid(field: impl Into<String>, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.into(),
        message: message.into(),
    }
}

fn validate_glue(config: &Config) -> ConfigResult<()> {
    let glue = &config.glue;

    if glue.module.trim().is_empty() {
        return Err(invalid("glue.module", "module base name must not be empty"));
    }
    if glue.module.contains(['/', '\\']) {
        return Err(invalid(
            "glue.module",
            format!("'{}' must be a file base name, not a path", glue.module),
        ));
    }
    if !is_js_identifier(&glue.handle) {
        return Err(invalid(
            "glue.handle",
            format!("'{}' is not a valid JavaScript identifier", glue.handle),
        ));
    }
    if !is_js_identifier(&glue.setter) {
        return Err(invalid(
            "glue.setter",
            format!("'{}' is not a valid JavaScript identifier", glue.setter),
        ));
    }
    if glue.guard_message.is_empty() {
        return Err(invalid("glue.guard_message", "must not be empty"));
    }
    if config.install.package.trim().is_empty() {
        return Err(invalid("install.package", "package name must not be empty"));
    }
    if !config.install.scope.is_empty() && !config.install.scope.starts_with('@') {
        return Err(invalid(
            "install.scope",
            format!("scope '{}' must start with '@'", config.install.scope),
        ));
    }
    Ok(())
}

fn validate_targets(config: &Config) -> ConfigResult<()> {
    if config.targets.is_empty() {
        return Err(invalid("targets", "at least one [[targets]] entry is required"));
    }

    let mut dirs = HashSet::new();
    for (i, target) in config.targets.iter().enumerate() {
        if target.name.trim().is_empty() {
            return Err(invalid(format!("targets[{i}].name"), "must not be empty"));
        }
        if target.dir.starts_with('/') || target.dir.split('/').any(|seg| seg == "..") {
            return Err(invalid(
                format!("targets[{i}].dir"),
                format!("'{}' must be a relative path inside dist_dir", target.dir),
            ));
        }
        if !dirs.insert(target.dir.trim_end_matches('/')) {
            return Err(invalid(
                format!("targets[{i}].dir"),
                format!("directory '{}' is used by more than one target", target.dir),
            ));
        }
    }
    Ok(())
}

fn validate_retype(config: &Config) -> ConfigResult<()> {
    for (i, rule) in config.retype.iter().enumerate() {
        let field = format!("retype[{i}]");
        if rule.member.is_empty() {
            return Err(invalid(format!("{field}.member"), "must not be empty"));
        }
        match (&rule.param, &rule.ty, &rule.returns) {
            (_, None, None) => {
                return Err(invalid(field, "one of 'type' or 'returns' is required"));
            },
            (None, Some(_), _) => {
                return Err(invalid(field, "'type' requires 'param'"));
            },
            (Some(_), None, Some(_)) => {
                return Err(invalid(field, "'param' requires 'type'"));
            },
            _ => {},
        }
    }
    Ok(())
}

fn validate_companions(config: &Config) -> ConfigResult<()> {
    let mut names = HashSet::new();
    for (i, companion) in config.companions.iter().enumerate() {
        if companion.name.trim().is_empty() {
            return Err(invalid(format!("companions[{i}].name"), "must not be empty"));
        }
        if companion.name == config.glue.module
            || companion.name == format!("{}_bg", config.glue.module)
        {
            return Err(invalid(
                format!("companions[{i}].name"),
                format!("'{}' collides with a generated glue file", companion.name),
            ));
        }
        if !names.insert(companion.name.as_str()) {
            return Err(invalid(
                format!("companions[{i}].name"),
                format!("duplicate companion '{}'", companion.name),
            ));
        }
        if companion.source.as_os_str().is_empty() {
            return Err(invalid(format!("companions[{i}].source"), "must not be empty"));
        }
        if let Some(table) = &companion.binding_table
            && !is_js_identifier(table)
        {
            return Err(invalid(
                format!("companions[{i}].binding_table"),
                format!("'{table}' is not a valid JavaScript identifier"),
            ));
        }
    }
    Ok(())
}

fn validate_package(config: &Config) -> ConfigResult<()> {
    let Some(package) = &config.package else {
        return Ok(());
    };

    if package.registry.is_some() && package.ranks_dir.is_none() {
        return Err(invalid(
            "package.ranks_dir",
            "required when package.registry is set",
        ));
    }
    for (i, copy) in package.copy.iter().enumerate() {
        if copy.to.is_empty() || copy.to.starts_with('/') || copy.to.split('/').any(|s| s == "..") {
            return Err(invalid(
                format!("package.copy[{i}].to"),
                format!("'{}' must be a relative path inside the distribution", copy.to),
            ));
        }
    }
    Ok(())
}

fn validate_logging(config: &Config) -> ConfigResult<()> {
    if !matches!(
        config.logging.format.as_str(),
        "pretty" | "compact" | "json" | "full"
    ) {
        return Err(invalid(
            "logging.format",
            format!(
                "unsupported format '{}'; expected one of: pretty, compact, json, full",
                config.logging.format
            ),
        ));
    }
    if !matches!(config.logging.target.as_str(), "stderr" | "stdout") {
        return Err(invalid(
            "logging.target",
            format!(
                "unsupported target '{}'; expected stderr or stdout",
                config.logging.target
            ),
        ));
    }
    Ok(())
}
