//! Conversions from the project file to the types each pass consumes.

use wasmglue_config::{Config, RetypeRule, TargetSection};
use wasmglue_resolver::InstallLocation;
use wasmglue_telemetry::{LogConfig, LogFormat, LogTarget};
use wasmglue_transform::{GuardInjector, Retype};

/// Convert the `[logging]` section to a [`LogConfig`].
#[must_use]
pub fn to_log_config(cfg: &Config) -> LogConfig {
    let format = match cfg.logging.format.as_str() {
        "pretty" => LogFormat::Pretty,
        "json" => LogFormat::Json,
        "full" => LogFormat::Full,
        _ => LogFormat::Compact,
    };

    let target = match cfg.logging.target.as_str() {
        "stdout" => LogTarget::Stdout,
        _ => LogTarget::Stderr,
    };

    let mut log_config = LogConfig::new(&cfg.logging.level)
        .with_format(format)
        .with_target(target)
        .with_timestamps(cfg.logging.timestamps);

    for directive in &cfg.logging.directives {
        log_config = log_config.with_directive(directive);
    }

    log_config
}

/// Convert one `[[retype]]` table. A rule may set both a parameter type and
/// a return type, yielding two retypes.
#[must_use]
pub fn to_retypes(rule: &RetypeRule) -> Vec<Retype> {
    let mut retypes = Vec::new();
    if let (Some(param), Some(ty)) = (&rule.param, &rule.ty) {
        let retype = Retype::parameter(rule.class.clone(), &rule.member, param, ty);
        retypes.push(if rule.optional { retype.optional() } else { retype });
    }
    if let Some(returns) = &rule.returns {
        retypes.push(Retype::returns(rule.class.clone(), &rule.member, returns));
    }
    retypes
}

/// The guard injector for the configured glue. The message is prefixed with
/// the module name so the error names the package that was misused.
#[must_use]
pub fn to_guard_injector(cfg: &Config) -> GuardInjector {
    let glue = &cfg.glue;
    GuardInjector::new(
        &glue.handle,
        &glue.setter,
        format!("{}: {}", glue.module, glue.guard_message),
    )
}

/// Where the loader of `target` searches for the installed binary.
#[must_use]
pub fn to_install_location(cfg: &Config, target: &TargetSection) -> InstallLocation {
    InstallLocation {
        scope: cfg.install.scope.clone(),
        package: cfg.install.package.clone(),
        target_dir: target.dir.clone(),
        binary: cfg.glue.binary_file(),
    }
}

#[cfg(test)]
mod tests {
    use wasmglue_transform::RetypeSlot;

    use super::*;

    const PROJECT: &str = r#"
        [glue]
        module = "tiktoken"

        [install]
        scope = "@zerfl"
        package = "tiktoken"

        [[targets]]
        name = "lite"
        dir = "lite"

        [[retype]]
        class = "Tiktoken"
        member = "encode"
        param = "allowed_special"
        type = "\"all\" | string[]"
        optional = true
        returns = "Uint32Array"

        [logging]
        level = "warn"
        format = "json"
        target = "stdout"
        timestamps = false
        directives = ["wasmglue_transform=trace"]
    "#;

    fn config() -> Config {
        Config::from_toml_str(PROJECT).unwrap()
    }

    #[test]
    fn log_config_follows_logging_section() {
        let log = to_log_config(&config());
        assert_eq!(log.level, "warn");
        assert_eq!(log.format, LogFormat::Json);
        assert_eq!(log.target, LogTarget::Stdout);
        assert!(!log.timestamps);
        assert_eq!(log.directives, vec!["wasmglue_transform=trace"]);
    }

    #[test]
    fn log_config_defaults_to_stderr() {
        let config = Config::from_toml_str(
            "[glue]\nmodule = \"tiktoken\"\n[install]\npackage = \"tiktoken\"\n[[targets]]\nname = \"full\"\n",
        )
        .unwrap();
        let log = to_log_config(&config);
        assert_eq!(log.target, LogTarget::Stderr);
        assert!(log.timestamps);
    }

    #[test]
    fn rule_with_param_and_return_yields_two_retypes() {
        let config = config();
        let retypes = to_retypes(&config.retype[0]);
        assert_eq!(retypes.len(), 2);
        assert_eq!(
            retypes[0].slot,
            RetypeSlot::Parameter {
                name: "allowed_special".into(),
                ty: "\"all\" | string[]".into(),
                optional: true,
            }
        );
        assert_eq!(retypes[1].slot, RetypeSlot::Return { ty: "Uint32Array".into() });
        assert_eq!(retypes[1].class.as_deref(), Some("Tiktoken"));
    }

    #[test]
    fn guard_message_names_the_module() {
        let injector = to_guard_injector(&config());
        assert!(injector.guard_statement().contains("\"tiktoken: "));
    }

    #[test]
    fn install_location_uses_target_dir() {
        let config = config();
        let location = to_install_location(&config, &config.targets[0]);
        assert_eq!(location.segments(), vec!["@zerfl", "tiktoken", "lite"]);
        assert_eq!(location.binary, "tiktoken_bg.wasm");
    }
}
