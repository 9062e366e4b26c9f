// src/core/catalog.rs

//! Tabla de pasos con nombre (`grupo:objetivo`) y las tareas que los encadenan.

use crate::core::copy::{CopySpec, FileMapping, append_js_extension};
use crate::core::rewrite::Ruleset;
use crate::core::style_vars::{less_file_name, sass_to_less};
use crate::core::watch::WatchTarget;
use crate::models::{BundleKind, ResolvedConfig};

/// Objetivo de análisis estático. El comando sale de `[tools.lint]` con la misma clave.
#[derive(Debug, Clone)]
pub struct LintTarget {
    pub name: String,
    pub patterns: Vec<String>,
}

#[derive(Debug, Clone)]
pub enum Step {
    Lint(LintTarget),
    Clean(Vec<String>),
    Mkdir(Vec<String>),
    Copy(CopySpec),
    Transpile(Vec<FileMapping>),
    Bundle(BundleKind),
    Rewrite { ruleset: Ruleset, files: String },
    Banner(BundleKind),
    Optimize(BundleKind),
    Watch(Vec<WatchTarget>),
    Serve,
}

/// Una tarea: lista ordenada de etiquetas de pasos o de grupos (`clean` = todos los `clean:*`).
#[derive(Debug, Clone)]
pub struct Task {
    pub name: &'static str,
    pub steps: Vec<&'static str>,
}

impl Task {
    /// Build de producción completo hacia `deploy/`.
    pub fn production() -> Self {
        Self {
            name: "default",
            steps: vec![
                "jshint:nls-en",
                "jshint:nls-all",
                "eslint",
                "clean",
                "mkdir",
                "copy:fonts",
                "copy:fonts2",
                "copy:fonts3",
                "copy:youtube",
                "copy:calcite-vars",
                // Capa de componentes: se construye en `build/`
                "copy:less-in-react",
                "copy:hbs-in-react",
                "babel",
                "copy:commonResources4react",
                "requirejs",
                "regex-replace:js",
                "regex-replace:css",
                "concat",
                "copy:html",
                "copy:main",
                "regex-replace:main",
                "copy:config",
                "copy:resources",
                "copy:libsResources",
                "copy:fonts4",
                "clean:fonts",
                "copy:readme",
                "clean:jsapioptim",
                "clean:build",
            ],
        }
    }

    /// Desarrollo: prepara `build/` y se queda vigilando los fuentes.
    pub fn dev() -> Self {
        Self {
            name: "dev",
            steps: vec![
                "jshint:nls-en",
                "jshint:nls-all",
                "eslint",
                "clean",
                "mkdir",
                "copy:fonts",
                "copy:fonts2",
                "copy:fonts3",
                "copy:youtube",
                "copy:calcite-vars",
                "copy:less-in-react",
                "copy:hbs-in-react",
                "babel",
                "copy:commonResources4react",
                "watch",
            ],
        }
    }

    /// Genera las listas de módulos para el optimizador externo.
    pub fn optimizer_export() -> Self {
        Self {
            name: "jsapioptim",
            steps: vec![
                "clean",
                "mkdir",
                "copy:less-in-react",
                "copy:hbs-in-react",
                "babel",
                "copy:commonResources4react",
                "requirejs",
                "execute",
            ],
        }
    }

    pub fn server() -> Self {
        Self {
            name: "server",
            steps: vec!["connect"],
        }
    }
}

#[derive(Debug)]
pub struct StepCatalog {
    steps: Vec<(String, Step)>,
}

impl StepCatalog {
    pub fn new(config: &ResolvedConfig) -> Self {
        let mut steps: Vec<(String, Step)> = Vec::new();
        let mut add = |label: &str, step: Step| steps.push((label.to_string(), step));

        for (label, name, patterns) in [
            ("jshint:nls-en", "nls-en", vec!["src/resources/**/nls/*.js"]),
            ("jshint:nls-all", "nls-all", vec!["src/resources/**/nls/*/*.js"]),
            (
                "eslint",
                "eslint",
                vec![
                    "src/app/storymaps/**/*.js",
                    "src/app/storymaps/**/*.jsx",
                    "!src/app/storymaps/tpl/utils/UniteGallery.js",
                    "!src/app/storymaps/issue-checker/**/*.js",
                ],
            ),
        ] {
            add(
                label,
                Step::Lint(LintTarget {
                    name: name.to_string(),
                    patterns: strings(&patterns),
                }),
            );
        }

        add("clean:build", Step::Clean(strings(&["build/"])));
        add("clean:deploy", Step::Clean(strings(&["deploy/*"])));
        let mut transient: Vec<String> = Vec::new();
        for bundle in &config.bundles {
            transient.push(bundle.manifest.clone());
        }
        for bundle in &config.bundles {
            transient.push(bundle.optimizer_out.clone());
        }
        add("clean:jsapioptim", Step::Clean(transient));
        add(
            "clean:fonts",
            Step::Clean(strings(&[
                "deploy/resources/fonts/glyphicons-*.*",
                "deploy/resources/fonts/OpenSans-*.*",
                "deploy/resources/tpl/viewer/fonts",
            ])),
        );

        add("mkdir:all", Step::Mkdir(strings(&["deploy/app", "build"])));

        for kind in BundleKind::ALL {
            add(&format!("requirejs:{}", kind), Step::Bundle(kind));
        }

        for (label, ruleset, files) in [
            ("regex-replace:css", Ruleset::CssPaths, "deploy/app/*.css"),
            ("regex-replace:js", Ruleset::JsEnvFlag, "deploy/app/*.js"),
            (
                "regex-replace:main",
                Ruleset::MainConfigEnvFlag,
                "deploy/app/main-config.js",
            ),
        ] {
            add(
                label,
                Step::Rewrite {
                    ruleset,
                    files: files.to_string(),
                },
            );
        }

        for kind in [BundleKind::Viewer, BundleKind::Builder, BundleKind::Print] {
            add(&format!("concat:{}JS", kind), Step::Banner(kind));
        }
        for kind in [BundleKind::Viewer, BundleKind::Builder, BundleKind::Print] {
            add(&format!("execute:{}", kind), Step::Optimize(kind));
        }

        for (label, copy_spec) in copy_specs() {
            add(label, Step::Copy(copy_spec));
        }

        add(
            "babel:dev",
            Step::Transpile(vec![
                FileMapping::new("src/", &["app/storymaps/**/*.jsx"], "build/").ext(".js"),
                FileMapping::new(
                    "src/app/storymaps/issue-checker/src/",
                    &["**/*.js"],
                    "build/app/storymaps/issue-checker/",
                )
                .ext(".js"),
            ]),
        );

        add("watch", Step::Watch(WatchTarget::defaults()));
        add("connect:server", Step::Serve);

        Self { steps }
    }

    pub fn get(&self, label: &str) -> Option<&Step> {
        self.steps
            .iter()
            .find(|(name, _)| name == label)
            .map(|(_, step)| step)
    }

    /// Una etiqueta exacta, o todos los pasos del grupo en orden de declaración.
    pub fn expand<'s>(&'s self, name: &'s str) -> Vec<&'s str> {
        if self.get(name).is_some() {
            return vec![name];
        }
        let prefix = format!("{}:", name);
        self.steps
            .iter()
            .filter(|(label, _)| label.starts_with(&prefix))
            .map(|(label, _)| label.as_str())
            .collect()
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn copy_specs() -> Vec<(&'static str, CopySpec)> {
    vec![
        (
            "copy:html",
            CopySpec::files(vec![FileMapping::new("src", &["*.html"], "deploy/")]),
        ),
        (
            "copy:resources",
            CopySpec::files(vec![FileMapping::new("src", &["resources/**"], "deploy/")]),
        ),
        (
            "copy:commonResources4react",
            CopySpec::files(vec![FileMapping::new("src/resources/", &["**"], "build/resources/")]),
        ),
        (
            "copy:config",
            CopySpec::files(vec![FileMapping::new("src", &["app/config.js"], "deploy/")]),
        ),
        (
            "copy:main",
            CopySpec::files(vec![FileMapping::new(
                "src",
                &["app/main-app.js", "app/main-config.js", "app/custom-scripts.js"],
                "deploy/",
            )]),
        ),
        (
            "copy:readme",
            CopySpec::files(vec![FileMapping::new("", &["Readme.pdf", "Readme.txt"], "deploy/")]),
        ),
        (
            "copy:libsResources",
            CopySpec::files(vec![FileMapping::new(
                "src/lib/font-awesome/fonts/",
                &["**"],
                "deploy/resources/lib/font-awesome/fonts/",
            )]),
        ),
        (
            "copy:less-in-react",
            CopySpec::files(vec![FileMapping::new(
                "src/app/storymaps/",
                &["**/*.less", "**/*.css"],
                "build/app/storymaps/",
            )]),
        ),
        (
            "copy:hbs-in-react",
            CopySpec::files(vec![FileMapping::new(
                "src/app/storymaps/",
                &["**/*.hbs"],
                "build/app/storymaps/",
            )]),
        ),
        // Las fuentes de Calcite se reúnen en css/fonts, que es desde donde las carga su tema.
        (
            "copy:fonts",
            CopySpec::files(vec![FileMapping::new(
                "src/lib/calcite-bootstrap/fonts/",
                &["OpenSans-*.*"],
                "src/lib/calcite-bootstrap/css/fonts/",
            )]),
        ),
        (
            "copy:fonts2",
            CopySpec::files(vec![FileMapping::new(
                "src/resources/fonts/",
                &["OpenSans-*.*"],
                "src/lib/calcite-bootstrap/css/fonts/",
            )]),
        ),
        (
            "copy:fonts3",
            CopySpec::files(vec![FileMapping::new(
                "src/resources/fonts/",
                &["glyphicons-*.*"],
                "src/lib/calcite-bootstrap/css/fonts/",
            )]),
        ),
        (
            "copy:fonts4",
            CopySpec::files(vec![FileMapping::new(
                "src/lib/calcite-bootstrap/css/fonts/",
                &["*.*"],
                "deploy/resources/lib/calcite-bootstrap/fonts/",
            )]),
        ),
        (
            "copy:youtube",
            CopySpec::files(vec![
                FileMapping::new("src/lib/youtube-api/", &["index"], "src/lib/youtube-api/")
                    .rename(append_js_extension),
            ]),
        ),
        (
            "copy:calcite-vars",
            CopySpec::files(vec![
                FileMapping::new(
                    "src/lib/calcite-bootstrap/sass/calcite/",
                    &["_variables.scss", "_colors-default.scss"],
                    "src/resources/styles/calcite/",
                )
                .rename(less_file_name),
            ])
            .process(sass_to_less),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{CliOverrides, merge_config};
    use crate::models::{BuildConfigFile, PackageInfo};
    use std::path::PathBuf;

    fn catalog() -> StepCatalog {
        let config = merge_config(
            PathBuf::from("/p"),
            PackageInfo {
                name: "n".to_string(),
                version: "1".to_string(),
            },
            BuildConfigFile::default(),
            &CliOverrides::default(),
        );
        StepCatalog::new(&config)
    }

    #[test]
    fn every_task_step_resolves() {
        let catalog = catalog();
        for task in [Task::production(), Task::dev(), Task::optimizer_export(), Task::server()] {
            for name in &task.steps {
                assert!(
                    !catalog.expand(name).is_empty(),
                    "'{}' de la tarea '{}' no existe",
                    name,
                    task.name
                );
            }
        }
    }

    #[test]
    fn groups_expand_in_declaration_order() {
        let catalog = catalog();
        assert_eq!(
            catalog.expand("clean"),
            vec!["clean:build", "clean:deploy", "clean:jsapioptim", "clean:fonts"]
        );
        assert_eq!(
            catalog.expand("requirejs"),
            vec!["requirejs:builder", "requirejs:viewer", "requirejs:print"]
        );
        assert_eq!(catalog.expand("copy:main"), vec!["copy:main"]);
        assert!(catalog.expand("nope").is_empty());
    }

    #[test]
    fn exact_label_built_at_runtime() {
        let catalog = catalog();
        let name = format!("requirejs:{}", BundleKind::Viewer);
        let labels = catalog.expand(&name);
        assert_eq!(labels, vec![name.as_str()]);
    }

    #[test]
    fn production_cleans_before_building_and_transients_last() {
        let steps = Task::production().steps;
        let pos = |s: &str| steps.iter().position(|x| *x == s).unwrap();
        assert!(pos("eslint") < pos("clean"));
        assert!(pos("clean") < pos("requirejs"));
        assert!(pos("requirejs") < pos("regex-replace:js"));
        assert!(pos("regex-replace:css") < pos("concat"));
        assert_eq!(*steps.last().unwrap(), "clean:build");
    }
}
