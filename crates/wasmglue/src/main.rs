//! CLI entry point for `wasmglue`.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::io::IsTerminal;
use std::path::PathBuf;
use std::process;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use wasmglue::Pipeline;
use wasmglue::config_bridge::to_log_config;
use wasmglue_config::Config;
use wasmglue_telemetry::{LogFormat, LogTarget, setup_logging};

#[derive(Parser)]
#[command(
    name = "wasmglue",
    version,
    about = "Postprocess wasm-bindgen output into a guarded, dual ESM/CommonJS package"
)]
struct Cli {
    /// Path to the project file.
    #[arg(short, long, default_value = "wasmglue.toml", env = "WASMGLUE_CONFIG")]
    config: PathBuf,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    /// Log format (pretty, compact, json, full). Overrides the project file.
    #[arg(long)]
    format: Option<LogFormat>,
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let config = Config::load(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;

    let mut log_config = to_log_config(&config);
    let ansi = match log_config.target {
        LogTarget::Stdout => std::io::stdout().is_terminal(),
        LogTarget::Stderr => std::io::stderr().is_terminal(),
    };
    log_config = log_config.with_ansi(ansi);
    if cli.verbose {
        "debug".clone_into(&mut log_config.level);
    }
    if let Some(format) = cli.format {
        log_config.format = format;
    }
    if let Err(e) = setup_logging(&log_config) {
        eprintln!("Failed to initialize logging: {e}");
    }

    let report = Pipeline::new(config).run()?;
    for target in &report.targets {
        info!(
            target = %target.name,
            symbols = target.symbols.len(),
            guarded = target.guarded.len(),
            "target written"
        );
    }
    if let Some(manifest) = &report.manifest {
        info!(path = %manifest.display(), "package ready");
    }
    Ok(())
}
