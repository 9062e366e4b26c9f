// src/core/watch.rs

use std::collections::HashMap;
use std::thread;
use std::time::SystemTime;

use crate::core::livereload::ReloadNotifier;
use crate::core::runner::Runner;
use crate::system::fs::{self, FsError, GlobSet};

/// Un grupo de ficheros vigilados y los pasos que se relanzan cuando cambian.
#[derive(Debug, Clone)]
pub struct WatchTarget {
    pub name: String,
    pub patterns: Vec<String>,
    pub steps: Vec<String>,
    /// Si es `true`, los pasos solo procesan los ficheros más nuevos que la última ejecución.
    pub newer: bool,
}

impl WatchTarget {
    fn new(name: &str, patterns: &[&str], steps: &[&str], newer: bool) -> Self {
        Self {
            name: name.to_string(),
            patterns: patterns.iter().map(|p| p.to_string()).collect(),
            steps: steps.iter().map(|s| s.to_string()).collect(),
            newer,
        }
    }

    pub fn defaults() -> Vec<Self> {
        vec![
            Self::new(
                "jsx",
                &["src/app/**/*.jsx", "src/app/storymaps/issue-checker/**/*.js"],
                &["babel"],
                true,
            ),
            Self::new("less", &["src/app/**/*.less"], &["copy:less-in-react"], true),
            Self::new("hbs", &["src/app/**/*.hbs"], &["copy:hbs-in-react"], true),
            // Sin pasos: solo se avisa al navegador.
            Self::new(
                "others",
                &["src/app/**/*.js", "src/app/**/*.css", "src/app/**/*.html"],
                &[],
                false,
            ),
            Self::new(
                "nlsforreact",
                &["src/resources/tpl/**/nls/*.js"],
                &["copy:commonResources4react"],
                false,
            ),
        ]
    }
}

/// Momento de la última ejecución de cada objetivo.
#[derive(Debug, Default, Clone)]
pub struct TimestampIndex {
    last_run: HashMap<String, SystemTime>,
}

impl TimestampIndex {
    /// Todos los objetivos arrancan con la misma marca.
    pub fn starting_at(targets: &[WatchTarget], at: SystemTime) -> Self {
        Self {
            last_run: targets.iter().map(|t| (t.name.clone(), at)).collect(),
        }
    }

    pub fn last_run(&self, target: &str) -> SystemTime {
        self.last_run
            .get(target)
            .copied()
            .unwrap_or(SystemTime::UNIX_EPOCH)
    }

    pub fn record(&mut self, target: &str, at: SystemTime) {
        self.last_run.insert(target.to_string(), at);
    }
}

/// Bucle de vigilancia por sondeo. Atiende un objetivo cada vez, hasta completarlo.
pub struct WatchLoop<'r, 'c> {
    runner: &'r Runner<'c>,
    targets: Vec<(WatchTarget, GlobSet)>,
    index: TimestampIndex,
    notifier: Option<&'r dyn ReloadNotifier>,
}

impl<'r, 'c> WatchLoop<'r, 'c> {
    pub fn new(
        runner: &'r Runner<'c>,
        targets: &[WatchTarget],
        index: TimestampIndex,
    ) -> Result<Self, FsError> {
        let targets = targets
            .iter()
            .map(|t| Ok((t.clone(), GlobSet::new(&t.patterns)?)))
            .collect::<Result<Vec<_>, FsError>>()?;
        Ok(Self {
            runner,
            targets,
            index,
            notifier: None,
        })
    }

    /// Avisa al navegador (LiveReload) de cada fichero cambiado cuando su objetivo termina bien.
    pub fn with_notifier(mut self, notifier: &'r dyn ReloadNotifier) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn index(&self) -> &TimestampIndex {
        &self.index
    }

    /// Revisa cada objetivo una vez y relanza los que tengan ficheros nuevos.
    /// Devuelve los nombres de los objetivos disparados.
    pub fn poll_once(&mut self, now: SystemTime) -> Result<Vec<String>, FsError> {
        let runner = self.runner;
        let root = &runner.config().root;
        let mut triggered = Vec::new();

        for (target, globs) in &self.targets {
            let since = self.index.last_run(&target.name);
            let mut changed = Vec::new();
            for rel in globs.expand(root, false)? {
                // Enlaces rotos o ficheros que desaparecen a mitad del sondeo.
                match fs::modified(&fs::join_slash(root, &rel)) {
                    Ok(mtime) if mtime > since => changed.push(rel),
                    Ok(_) => {}
                    Err(e) => log::warn!("Se ignora '{}': {}", rel, e),
                }
            }
            if changed.is_empty() {
                continue;
            }

            log::info!(
                "'{}': {} fichero(s) modificado(s), p. ej. {}",
                target.name,
                changed.len(),
                changed[0]
            );
            let filter = target.newer.then_some(since);
            let mut succeeded = true;
            for step in &target.steps {
                // Un fallo detiene esta secuencia, no la vigilancia.
                if let Err(e) = runner.run_named(step, filter) {
                    log::error!("{}", e);
                    succeeded = false;
                    break;
                }
            }
            if let Some(notifier) = self.notifier.filter(|_| succeeded) {
                for rel in &changed {
                    notifier.notify(rel);
                }
            }
            self.index.record(&target.name, now);
            triggered.push(target.name.clone());
        }
        Ok(triggered)
    }

    /// No termina por sí solo; solo lo para una señal externa.
    pub fn run(mut self) {
        let interval = self.runner.config().poll_interval;
        println!("\nVigilando cambios (cada {:?})...", interval);
        loop {
            if let Err(e) = self.poll_once(SystemTime::now()) {
                log::error!("Error al sondear los ficheros vigilados: {}", e);
            }
            thread::sleep(interval);
        }
    }
}
