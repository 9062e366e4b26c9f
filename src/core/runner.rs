// src/core/runner.rs

use std::time::SystemTime;
use thiserror::Error;

use crate::core::banner;
use crate::core::bundler::{BundleError, Bundler};
use crate::core::catalog::{LintTarget, Step, StepCatalog, Task};
use crate::core::copy::{self, CopyError};
use crate::core::interpolator::Interpolator;
use crate::core::livereload::LiveReload;
use crate::core::rewrite::{self, RewriteError};
use crate::core::server;
use crate::core::transpile::{self, TranspileError};
use crate::core::watch::{TimestampIndex, WatchLoop};
use crate::models::{BundleDescriptor, BundleKind, ResolvedConfig};
use crate::system::executor::{self, ExecutionError};
use crate::system::fs::{self, FsError, GlobSet};

#[derive(Error, Debug)]
pub enum StepError {
    #[error("{0}")]
    Fs(#[from] FsError),
    #[error("{0}")]
    Copy(#[from] CopyError),
    #[error("{0}")]
    Transpile(#[from] TranspileError),
    #[error("{0}")]
    Bundle(#[from] BundleError),
    #[error("{0}")]
    Rewrite(#[from] RewriteError),
    #[error("{0}")]
    Execution(#[from] ExecutionError),
    #[error("Error del servidor: {0}")]
    Server(#[from] std::io::Error),
    #[error("No existe ningún paso llamado '{0}'")]
    UnknownStep(String),
    #[error("No hay ningún bundle '{0}' configurado")]
    MissingBundle(BundleKind),
}

/// Un paso falló; la tarea se detiene ahí.
#[derive(Error, Debug)]
#[error("El paso '{step}' falló: {source}")]
pub struct TaskError {
    pub step: String,
    #[source]
    pub source: StepError,
}

/// Filtro "solo ficheros más nuevos que" que usa el bucle de vigilancia.
pub type Since = Option<SystemTime>;

/// Ejecuta tareas paso a paso, sin paralelismo, deteniéndose en el primer fallo.
pub struct Runner<'c> {
    config: &'c ResolvedConfig,
    catalog: StepCatalog,
}

impl<'c> Runner<'c> {
    pub fn new(config: &'c ResolvedConfig) -> Self {
        Self {
            config,
            catalog: StepCatalog::new(config),
        }
    }

    pub fn config(&self) -> &'c ResolvedConfig {
        self.config
    }

    pub fn run_task(&self, task: &Task) -> Result<(), TaskError> {
        log::info!("Iniciando tarea '{}'", task.name);
        for name in &task.steps {
            self.run_named(name, None)?;
        }
        println!("\n✔ Tarea '{}' completada.", task.name);
        Ok(())
    }

    /// Ejecuta un paso, o todos los pasos de un grupo (`clean`, `requirejs`...).
    pub fn run_named(&self, name: &str, since: Since) -> Result<(), TaskError> {
        let labels = self.catalog.expand(name);
        if labels.is_empty() {
            return Err(TaskError {
                step: name.to_string(),
                source: StepError::UnknownStep(name.to_string()),
            });
        }

        for label in labels {
            let Some(step) = self.catalog.get(label) else {
                continue;
            };
            println!("\n> {}", label);
            self.run_step(step, since).map_err(|source| TaskError {
                step: label.to_string(),
                source,
            })?;
        }
        Ok(())
    }

    fn bundle(&self, kind: BundleKind) -> Result<&'c BundleDescriptor, StepError> {
        self.config.bundle(kind).ok_or(StepError::MissingBundle(kind))
    }

    fn run_step(&self, step: &Step, since: Since) -> Result<(), StepError> {
        let root = &self.config.root;

        match step {
            Step::Lint(target) => self.run_lint(target),
            Step::Clean(patterns) => {
                let mut removed = 0;
                for rel in GlobSet::new(patterns)?.expand(root, true)? {
                    if fs::remove_path(&fs::join_slash(root, &rel))? {
                        removed += 1;
                    }
                }
                log::info!("{} ruta(s) eliminada(s)", removed);
                Ok(())
            }
            Step::Mkdir(dirs) => {
                for dir in dirs {
                    fs::create_dir_all(&fs::join_slash(root, dir))?;
                }
                Ok(())
            }
            Step::Copy(copy_spec) => {
                let count = copy::run_copy(root, copy_spec, since)?;
                log::info!("{} fichero(s) copiado(s)", count);
                Ok(())
            }
            Step::Transpile(mappings) => {
                let count = transpile::run_transpile(self.config, mappings, since)?;
                log::info!("{} componente(s) compilado(s)", count);
                Ok(())
            }
            Step::Bundle(kind) => {
                let descriptor = self.bundle(*kind)?;
                let bundler = Bundler::new(root, &self.config.bundler)?;
                let output = bundler.write_bundle(descriptor)?;
                println!(
                    "  {} ({} módulos)",
                    descriptor.out,
                    output.included.len()
                );
                Ok(())
            }
            Step::Rewrite { ruleset, files } => {
                rewrite::rewrite_files(root, *ruleset, files)?;
                Ok(())
            }
            Step::Banner(kind) => {
                let descriptor = self.bundle(*kind)?;
                let banner = banner::render_banner(self.config);
                banner::prepend_banner(&fs::join_slash(root, &descriptor.out), &banner)?;
                Ok(())
            }
            Step::Optimize(kind) => {
                let descriptor = self.bundle(*kind)?;
                let command = Interpolator::new(self.config)
                    .with("input", descriptor.manifest.clone())
                    .with("output", descriptor.optimizer_out.clone())
                    .interpolate(&self.config.tools.optimizer);
                executor::execute_command(&command, root)?;
                Ok(())
            }
            Step::Watch(targets) => {
                let index = TimestampIndex::starting_at(targets, SystemTime::now());
                let livereload = LiveReload::new();
                let mut watch = WatchLoop::new(self, targets, index)?;
                if let Some(port) = self.config.livereload_port {
                    let addr = format!("{}:{}", self.config.server.hostname, port);
                    match livereload.spawn(&addr) {
                        Ok(bound) => {
                            println!("LiveReload en ws://{}/livereload", bound);
                            watch = watch.with_notifier(&livereload);
                        }
                        Err(e) => log::warn!(
                            "No se pudo abrir LiveReload en {}: {}. Se vigila sin recarga.",
                            addr,
                            e
                        ),
                    }
                }
                watch.run();
                Ok(())
            }
            Step::Serve => Ok(server::serve(self.config)?),
        }
    }

    /// Los linters son opcionales; si hay uno configurado y falla, la tarea se detiene.
    fn run_lint(&self, target: &LintTarget) -> Result<(), StepError> {
        let Some(template) = self.config.tools.lint.get(&target.name) else {
            log::info!("Sin linter para '{}'; se omite.", target.name);
            return Ok(());
        };
        let files = fs::expand_files(&self.config.root, &target.patterns)?;
        if files.is_empty() {
            log::info!("'{}': no hay ficheros que analizar.", target.name);
            return Ok(());
        }

        let command = Interpolator::new(self.config)
            .with("files", files.join(" "))
            .interpolate(template);
        executor::execute_command(&command, &self.config.root)?;
        Ok(())
    }
}

/// Build de producción completo.
pub fn run_production(config: &ResolvedConfig) -> Result<(), TaskError> {
    Runner::new(config).run_task(&Task::production())
}

/// Build de desarrollo; termina en el bucle de vigilancia.
pub fn run_dev(config: &ResolvedConfig) -> Result<(), TaskError> {
    Runner::new(config).run_task(&Task::dev())
}

/// Listas de módulos por bundle para el optimizador externo.
pub fn run_optimizer_export(config: &ResolvedConfig) -> Result<(), TaskError> {
    Runner::new(config).run_task(&Task::optimizer_export())
}

pub fn run_server(config: &ResolvedConfig) -> Result<(), TaskError> {
    Runner::new(config).run_task(&Task::server())
}
