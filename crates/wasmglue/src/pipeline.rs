//! The postprocessing pipeline.
//!
//! For each build target: enrich declarations, guard the ESM glue, dualize
//! it to CommonJS, emit the loader, build the companions and write the
//! auxiliary declarations. The package manifest is assembled last.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use wasmglue_config::{Config, TargetSection};
use wasmglue_resolver::{LoaderSpec, locate_binary, render_loader};
use wasmglue_transform::symbols::names;
use wasmglue_transform::{
    CompanionSpec, ExportSymbol, GuardInjector, ModuleDualizer, SignatureEnricher, SourceModule,
    build_companion, ensure_commonjs_exports,
};

use crate::config_bridge::{to_guard_injector, to_install_location, to_retypes};
use crate::error::{BuildError, BuildResult};

/// Outcome of one build target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetReport {
    /// Target name.
    pub name: String,
    /// Output directory.
    pub dir: PathBuf,
    /// Canonical public surface of the target.
    pub symbols: Vec<ExportSymbol>,
    /// Entry points that received a guard in this run.
    pub guarded: Vec<String>,
    /// Where the loader will find the binary.
    pub binary: PathBuf,
}

/// Outcome of a whole run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    /// One report per target, in configuration order.
    pub targets: Vec<TargetReport>,
    /// Written package manifest, when `[package]` is configured.
    pub manifest: Option<PathBuf>,
}

/// Runs every pass over every target of one project.
#[derive(Debug)]
pub struct Pipeline {
    config: Config,
    enricher: SignatureEnricher,
    injector: GuardInjector,
}

impl Pipeline {
    /// Prepare a pipeline for `config`.
    #[must_use]
    pub fn new(config: Config) -> Self {
        let retypes = config.retype.iter().flat_map(to_retypes).collect();
        let injector = to_guard_injector(&config);
        Self {
            config,
            enricher: SignatureEnricher::new(retypes),
            injector,
        }
    }

    /// The project this pipeline runs.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run every pass. Stops at the first error; files written by earlier
    /// targets are left in place.
    ///
    /// # Errors
    ///
    /// Returns the first configuration, transform, resolve, package or I/O
    /// error.
    pub fn run(&self) -> BuildResult<BuildReport> {
        let mut report = BuildReport::default();

        for target in &self.config.targets {
            report.targets.push(self.process_target(target)?);
        }
        self.write_root_declarations()?;

        if let Some(package) = &self.config.package {
            report.manifest = Some(wasmglue_package::assemble(&self.config, package)?);
        }

        info!(targets = report.targets.len(), "build complete");
        Ok(report)
    }

    /// Run every per-target pass over `target`.
    ///
    /// # Errors
    ///
    /// Returns the first error of any pass.
    pub fn process_target(&self, target: &TargetSection) -> BuildResult<TargetReport> {
        let glue = &self.config.glue;
        let dir = self.config.target_dir(target);
        info!(target = %target.name, dir = %dir.display(), "processing target");

        // Declarations: retype in place and collect the public surface.
        let declarations = dir.join(glue.declarations_file());
        let enriched = self
            .enricher
            .enrich(&read(&declarations)?, &origin(&declarations))?;
        write(&declarations, &enriched.text)?;
        let symbols = enriched.symbols;
        debug!(target = %target.name, count = symbols.len(), "export symbols");

        // ESM glue: guard in place.
        let esm_path = dir.join(glue.esm_glue_file());
        let esm_origin = origin(&esm_path);
        let guarded = self.injector.inject(&read(&esm_path)?, &esm_origin)?;
        let module = SourceModule::parse(&guarded.text, &esm_origin)?;
        module.ensure_exports(&symbols, &esm_origin)?;
        write(&esm_path, &module.render_esm())?;
        info!(
            target = %target.name,
            guarded = guarded.report.guarded.len(),
            already_guarded = guarded.report.already_guarded.len(),
            "glue guarded"
        );

        // CommonJS glue, derived from a fresh parse of the guarded ESM.
        let cjs_path = dir.join(glue.cjs_glue_file());
        let cjs = ModuleDualizer::new().dualize(&module);
        ensure_commonjs_exports(&cjs, &symbols, &origin(&cjs_path))?;
        write(&cjs_path, &cjs)?;

        // Loader.
        let exports = names(&symbols);
        let location = to_install_location(&self.config, target);
        let glue_require = format!("./{}", glue.cjs_glue_file());
        let glue_import = format!("./{}", glue.esm_glue_file());
        let loader = render_loader(&LoaderSpec {
            glue_require: &glue_require,
            glue_import: &glue_import,
            setter: &glue.setter,
            location: &location,
            exports: &exports,
        });
        write(&dir.join(glue.loader_file()), &loader)?;
        let (binary, _) = locate_binary(&dir, &location)?;
        debug!(target = %target.name, binary = %binary.display(), "binary reachable from loader");

        self.build_companions(target, &dir, &symbols)?;

        write(
            &dir.join(format!("{}_bg.d.ts", glue.module)),
            &format!("export * from \"./{}\";\n", glue.module),
        )?;

        Ok(TargetReport {
            name: target.name.clone(),
            dir,
            symbols,
            guarded: guarded.report.guarded,
            binary,
        })
    }

    fn build_companions(
        &self,
        target: &TargetSection,
        dir: &Path,
        symbols: &[ExportSymbol],
    ) -> BuildResult<()> {
        let glue_stem = format!("./{}_bg", self.config.glue.module);
        let glue_cjs = format!("./{}", self.config.glue.cjs_glue_file());
        let glue_specifiers = vec![glue_stem.clone(), format!("{glue_stem}.js")];

        let mut rewrites: Vec<(String, String)> = glue_specifiers
            .iter()
            .map(|from| (from.clone(), glue_cjs.clone()))
            .collect();
        for companion in &self.config.companions {
            let to = format!("./{}.cjs", companion.name);
            rewrites.push((format!("./{}", companion.name), to.clone()));
            rewrites.push((format!("./{}.js", companion.name), to));
        }

        for companion in &self.config.companions {
            let source_path = self.config.resolve(&companion.source);
            let source = read(&source_path)?;
            let filename = source_path
                .file_name()
                .map_or_else(|| origin(&source_path), |n| n.to_string_lossy().into_owned());

            let output = build_companion(&CompanionSpec {
                name: &companion.name,
                source: &source,
                origin: &filename,
                glue_specifiers: &glue_specifiers,
                rewrites: &rewrites,
                forward: companion.forward_exports,
                binding_table: companion.binding_table.as_deref(),
                symbols,
            })?;

            write(&dir.join(format!("{}.js", companion.name)), &output.esm)?;
            write(&dir.join(format!("{}.cjs", companion.name)), &output.cjs)?;
            write(&dir.join(format!("{}.d.ts", companion.name)), &output.declarations)?;
            info!(target = %target.name, companion = %companion.name, "companion built");
        }
        Ok(())
    }

    /// `<dir>.d.ts` at the distribution root for every non-root target.
    fn write_root_declarations(&self) -> BuildResult<()> {
        let dist = self.config.dist_root();
        for target in self.config.targets.iter().filter(|t| !t.dir.is_empty()) {
            let path = dist.join(format!("{}.d.ts", target.dir));
            write(
                &path,
                &format!("export * from \"./{}/{}\";\n", target.dir, self.config.glue.module),
            )?;
        }
        Ok(())
    }
}

fn origin(path: &Path) -> String {
    path.display().to_string()
}

fn read(path: &Path) -> BuildResult<String> {
    fs::read_to_string(path).map_err(|e| BuildError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}

fn write(path: &Path, contents: &str) -> BuildResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| BuildError::Io {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }
    fs::write(path, contents).map_err(|e| BuildError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    debug!(path = %path.display(), bytes = contents.len(), "wrote");
    Ok(())
}
