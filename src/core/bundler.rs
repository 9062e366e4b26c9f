// src/core/bundler.rs

//! Trazado y concatenación del grafo de módulos AMD de cada bundle.

use regex::Regex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::constants::EMPTY_SENTINEL;
use crate::models::{BundleDescriptor, BundlerConfig};
use crate::system::fs::{self, FsError};

#[derive(Error, Debug)]
pub enum BundleError {
    #[error("Error de ficheros: {0}")]
    Fs(#[from] FsError),
    #[error("No se encontró el módulo '{id}' (buscado en '{path}')")]
    ModuleNotFound { id: String, path: String },
    #[error("Expresión inválida '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("El módulo raíz '{0}' está marcado como externo")]
    ExternalEntry(String),
    #[error("No se pudo incrustar el recurso '{id}' como texto: {source}")]
    Encode {
        id: String,
        #[source]
        source: serde_json::Error,
    },
}

type BundleResult<T> = Result<T, BundleError>;

/// Módulos que el cargador AMD resuelve por sí mismo.
const BUILTIN_MODULES: [&str; 3] = ["require", "exports", "module"];

fn compile(pattern: &str) -> BundleResult<Regex> {
    Regex::new(pattern).map_err(|source| BundleError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })
}

struct CompiledOverride {
    module: String,
    path_from: String,
    path_to: String,
    patch: Regex,
    replacement: String,
}

/// Resultado de un bundle, todavía en memoria.
#[derive(Debug, Default)]
pub struct BundleOutput {
    pub script: String,
    pub stylesheet: String,
    /// Nombres lógicos incluidos, en orden de emisión.
    pub included: Vec<String>,
}

#[derive(Default)]
struct TraceState {
    visited: HashSet<String>,
    output: BundleOutput,
}

impl TraceState {
    fn emit(&mut self, id: &str, content: &str) {
        self.output.script.push_str(content.trim_end());
        self.output.script.push_str("\n\n");
        self.output.included.push(id.to_string());
    }
}

pub struct Bundler<'a> {
    root: &'a Path,
    config: &'a BundlerConfig,
    external: Vec<Regex>,
    manifest_exclude: Regex,
    overrides: Vec<CompiledOverride>,
    dependency_array: Regex,
    string_literal: Regex,
    named_define: Regex,
    any_define: Regex,
}

impl<'a> Bundler<'a> {
    pub fn new(root: &'a Path, config: &'a BundlerConfig) -> BundleResult<Self> {
        let external = config
            .external_patterns
            .iter()
            .map(|p| compile(p))
            .collect::<BundleResult<Vec<_>>>()?;
        let overrides = config
            .overrides
            .iter()
            .map(|o| {
                Ok(CompiledOverride {
                    module: o.module.clone(),
                    path_from: o.path_from.clone(),
                    path_to: o.path_to.clone(),
                    patch: compile(&o.patch_pattern)?,
                    replacement: o.patch_replacement.clone(),
                })
            })
            .collect::<BundleResult<Vec<_>>>()?;

        Ok(Self {
            root,
            config,
            external,
            manifest_exclude: compile(&config.manifest_exclude)?,
            overrides,
            dependency_array: compile(
                r#"\b(define|require)\s*\(\s*(?:["'][^"']*["']\s*,\s*)?\[([^\]]*)\]"#,
            )?,
            string_literal: compile(r#"["']([^"']+)["']"#)?,
            named_define: compile(r#"\bdefine\s*\(\s*["']"#)?,
            any_define: compile(r"\bdefine\s*\(")?,
        })
    }

    /// Un nombre es externo si la tabla lo marca con `empty:` o casa con un patrón externo.
    pub fn is_external(&self, id: &str) -> bool {
        if self.external.iter().any(|re| re.is_match(id)) {
            return true;
        }
        matches!(self.lookup_path(id), Some((_, value)) if value == EMPTY_SENTINEL)
    }

    /// Entrada más larga de la tabla que es `id` o un prefijo `id/...`.
    fn lookup_path(&self, id: &str) -> Option<(&str, &str)> {
        self.config
            .paths
            .iter()
            .filter(|(key, _)| {
                id == key.as_str()
                    || id
                        .strip_prefix(key.as_str())
                        .is_some_and(|rest| rest.starts_with('/'))
            })
            .max_by_key(|(key, _)| key.len())
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// Ruta física de un nombre lógico. Los módulos llevan `.js`; los recursos de plugins no.
    pub fn resolve_path(&self, id: &str, is_module: bool) -> PathBuf {
        let mapped = match self.lookup_path(id) {
            Some((key, value)) => format!("{}{}", value.trim_end_matches('/'), &id[key.len()..]),
            None => id.to_string(),
        };
        let mut rel = format!("{}/{}", self.config.base_url.trim_end_matches('/'), mapped);
        if is_module && !rel.ends_with(".js") {
            rel.push_str(".js");
        }
        fs::join_slash(self.root, &rel)
    }

    /// Traza el grafo desde `entry` y concatena los módulos, dependencias primero.
    pub fn bundle(&self, entry: &str) -> BundleResult<BundleOutput> {
        if self.is_external(entry) {
            return Err(BundleError::ExternalEntry(entry.to_string()));
        }

        let mut state = TraceState::default();
        for excluded in self.excluded_closure()? {
            state.visited.insert(excluded);
        }
        self.visit(entry, &mut state)?;

        log::info!(
            "Bundle '{}': {} módulos incluidos",
            entry,
            state.output.included.len()
        );
        Ok(state.output)
    }

    /// Los módulos excluidos arrastran a todas sus dependencias.
    fn excluded_closure(&self) -> BundleResult<HashSet<String>> {
        let mut closure = HashSet::new();
        let mut pending: Vec<String> = self.config.exclude.clone();

        while let Some(id) = pending.pop() {
            if !closure.insert(id.clone()) || self.is_external(&id) || id.contains('!') {
                continue;
            }
            let path = self.resolve_path(&id, true);
            if !path.is_file() {
                log::debug!("Módulo excluido '{}' sin fichero; se excluye solo el nombre", id);
                continue;
            }
            let content = fs::read_to_string(&path)?;
            pending.extend(self.dependencies(&id, &content));
        }
        Ok(closure)
    }

    fn visit(&self, id: &str, state: &mut TraceState) -> BundleResult<()> {
        if !state.visited.insert(id.to_string()) || self.is_external(id) {
            return Ok(());
        }

        if let Some((plugin, resource)) = id.split_once('!') {
            return self.visit_plugin_resource(id, plugin, resource, state);
        }

        let content = self.load_module(id)?;
        for dep in self.dependencies(id, &content) {
            self.visit(&dep, state)?;
        }
        let named = self.name_anonymous_define(id, &content);
        state.emit(id, &named);
        Ok(())
    }

    fn visit_plugin_resource(
        &self,
        id: &str,
        plugin: &str,
        resource: &str,
        state: &mut TraceState,
    ) -> BundleResult<()> {
        if self.config.stub_modules.iter().any(|s| s == plugin) {
            if state.visited.insert(plugin.to_string()) {
                state.emit(plugin, &stub_plugin(plugin));
            }
            let text = self.read_resource(id, resource)?;
            let literal = serde_json::to_string(&text).map_err(|source| BundleError::Encode {
                id: id.to_string(),
                source,
            })?;
            state.emit(
                id,
                &format!("define(\"{}\", function () {{ return {}; }});", id, literal),
            );
            return Ok(());
        }

        if self.config.stylesheet_plugins.iter().any(|s| s == plugin) {
            let resource = if resource.ends_with(".css") {
                resource.to_string()
            } else {
                format!("{}.css", resource)
            };
            let css = self.read_resource(id, &resource)?;
            state.output.stylesheet.push_str(css.trim_end());
            state.output.stylesheet.push('\n');
            state.emit(id, &format!("define(\"{}\", function () {{}});", id));
            return Ok(());
        }

        // Plugin genérico: el plugin y el recurso se tratan como módulos normales.
        self.visit(plugin, state)?;
        self.visit(resource, state)
    }

    fn read_resource(&self, id: &str, resource: &str) -> BundleResult<String> {
        let path = self.resolve_path(resource, false);
        if !path.is_file() {
            return Err(BundleError::ModuleNotFound {
                id: id.to_string(),
                path: path.display().to_string(),
            });
        }
        Ok(fs::read_to_string(&path)?)
    }

    /// Lee el fichero del módulo, aplicando la sustitución configurada si la hay.
    fn load_module(&self, id: &str) -> BundleResult<String> {
        let mut path = self.resolve_path(id, true);
        let over = self.overrides.iter().find(|o| o.module == id);
        if let Some(over) = over {
            let swapped = path.to_string_lossy().replace(&over.path_from, &over.path_to);
            log::debug!("Sustituyendo '{}' por {}", id, swapped);
            path = PathBuf::from(swapped);
        }

        if !path.is_file() {
            return Err(BundleError::ModuleNotFound {
                id: id.to_string(),
                path: path.display().to_string(),
            });
        }
        let content = fs::read_to_string(&path)?;

        Ok(match over {
            Some(over) => over
                .patch
                .replacen(&content, 1, over.replacement.as_str())
                .into_owned(),
            None => content,
        })
    }

    /// Nombres (ya normalizados) de las dependencias declaradas en el módulo.
    fn dependencies(&self, id: &str, content: &str) -> Vec<String> {
        let has_define = self.any_define.is_match(content);
        let mut deps = Vec::new();

        for caps in self.dependency_array.captures_iter(content) {
            // `require([...])` solo cuenta en scripts sin `define`.
            if &caps[1] == "require" && has_define {
                continue;
            }
            for dep in self.string_literal.captures_iter(&caps[2]) {
                let dep = &dep[1];
                if BUILTIN_MODULES.contains(&dep) {
                    continue;
                }
                deps.push(normalize_id(id, dep));
            }
        }
        deps
    }

    fn name_anonymous_define(&self, id: &str, content: &str) -> String {
        if self.named_define.is_match(content) {
            return content.to_string();
        }
        let named = format!("define(\"{}\", ", id);
        self.any_define
            .replacen(content, 1, regex::NoExpand(&named))
            .into_owned()
    }

    /// Lista para el optimizador externo: los incluidos menos los que casan con la exclusión.
    pub fn manifest(&self, output: &BundleOutput) -> String {
        output
            .included
            .iter()
            .filter(|id| !self.manifest_exclude.is_match(id))
            .cloned()
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Construye el bundle del descriptor y escribe script, hoja de estilos y manifiesto.
    pub fn write_bundle(&self, descriptor: &BundleDescriptor) -> BundleResult<BundleOutput> {
        let output = self.bundle(&descriptor.entry)?;

        fs::write(&fs::join_slash(self.root, &descriptor.out), &output.script)?;
        if !output.stylesheet.is_empty() {
            fs::write(
                &fs::join_slash(self.root, &descriptor.stylesheet_out()),
                &output.stylesheet,
            )?;
        }
        fs::write(
            &fs::join_slash(self.root, &descriptor.manifest),
            self.manifest(&output),
        )?;
        Ok(output)
    }
}

fn stub_plugin(plugin: &str) -> String {
    format!(
        "define(\"{}\", {{load: function (id) {{ throw new Error(\"Dynamic load not allowed: \" + id); }}}});",
        plugin
    )
}

/// Resuelve `./` y `../` respecto al directorio del módulo que declara la dependencia.
pub fn normalize_id(from: &str, dep: &str) -> String {
    if let Some((plugin, resource)) = dep.split_once('!') {
        return format!("{}!{}", normalize_id(from, plugin), normalize_id(from, resource));
    }
    if !dep.starts_with("./") && !dep.starts_with("../") {
        return dep.to_string();
    }

    let mut parts: Vec<&str> = from.split('/').collect();
    parts.pop();
    for segment in dep.split('/') {
        match segment {
            "." | "" => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::default_bundler_config;

    fn write(root: &Path, rel: &str, content: &str) {
        fs::write(&fs::join_slash(root, rel), content).unwrap();
    }

    #[test]
    fn normalize_relative_ids() {
        assert_eq!(
            normalize_id("storymaps/tpl/core/MainView", "./Helper"),
            "storymaps/tpl/core/Helper"
        );
        assert_eq!(
            normalize_id("storymaps/tpl/core/MainView", "../utils/X"),
            "storymaps/tpl/utils/X"
        );
        assert_eq!(
            normalize_id("storymaps/tpl/core/MainView", "lib-build/text!./a.html"),
            "lib-build/text!storymaps/tpl/core/a.html"
        );
        assert_eq!(normalize_id("a/b", "dojo/topic"), "dojo/topic");
    }

    #[test]
    fn resolve_uses_longest_prefix() {
        let config = default_bundler_config();
        let root = Path::new("/p");
        let bundler = Bundler::new(root, &config).unwrap();
        assert_eq!(
            bundler.resolve_path("lib-build/tpl", true),
            fs::join_slash(root, "src/app/../lib-build/tpl.js")
        );
        assert_eq!(
            bundler.resolve_path("react", true),
            fs::join_slash(root, "src/app/../lib/react/react.min.js")
        );
        assert_eq!(
            bundler.resolve_path("storymaps/tpl/core/A", true),
            fs::join_slash(root, "src/app/storymaps/tpl/core/A.js")
        );
        assert!(bundler.is_external("esri/Map"));
        assert!(bundler.is_external("dojo"));
        assert!(!bundler.is_external("dojo-like/x"));
    }

    #[test]
    fn traces_dependencies_before_dependents() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(
            root,
            "src/app/storymaps/tpl/Main.js",
            "define([\"dojo/topic\", \"./A\", \"lib-build/text!./view.html\"], function (topic, A, view) {});",
        );
        write(root, "src/app/storymaps/tpl/A.js", "define([\"./B\"], function () {});");
        write(root, "src/app/storymaps/tpl/B.js", "define([], function () {});");
        write(root, "src/app/storymaps/tpl/view.html", "<div class=\"x\">\n</div>");
        write(root, "src/lib-build/text.js", "define({});");

        let mut config = default_bundler_config();
        config.stub_modules = vec!["lib-build/text".to_string()];
        let bundler = Bundler::new(root, &config).unwrap();
        let out = bundler.bundle("storymaps/tpl/Main").unwrap();

        assert_eq!(
            out.included,
            vec![
                "storymaps/tpl/B",
                "storymaps/tpl/A",
                "lib-build/text",
                "lib-build/text!storymaps/tpl/view.html",
                "storymaps/tpl/Main",
            ]
        );
        assert!(out.script.contains("define(\"storymaps/tpl/B\", [], function () {});"));
        assert!(out.script.contains(r#"return "<div class=\"x\">\n</div>";"#));
        assert!(!out.script.contains("define(\"dojo/topic\""));
        assert_eq!(
            bundler.manifest(&out),
            "storymaps/tpl/B\nstorymaps/tpl/A\nstorymaps/tpl/Main"
        );
    }

    #[test]
    fn define_lookalikes_are_not_defines() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(
            root,
            "src/app/storymaps/tpl/Main.js",
            "redefine(\"x\", [\"./Ghost\"]);\ndefine([\"./A\"], function (A) {});",
        );
        write(root, "src/app/storymaps/tpl/A.js", "define([], function () {});");

        let config = default_bundler_config();
        let bundler = Bundler::new(root, &config).unwrap();
        let out = bundler.bundle("storymaps/tpl/Main").unwrap();

        assert_eq!(out.included, vec!["storymaps/tpl/A", "storymaps/tpl/Main"]);
        assert!(out.script.contains("redefine(\"x\", [\"./Ghost\"]);"));
        assert!(out.script.contains("define(\"storymaps/tpl/Main\", [\"./A\"]"));
    }

    #[test]
    fn ignored_pattern_never_reaches_output() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(
            root,
            "src/app/storymaps/tpl/Main.js",
            "define([\"vendor/maps/Widget\", \"./A\"], function () {});",
        );
        write(root, "src/app/storymaps/tpl/A.js", "define([], function () {});");
        write(root, "src/app/vendor/maps/Widget.js", "define([], function () { return 1; });");

        let mut config = default_bundler_config();
        config.external_patterns.push("^vendor/maps/".to_string());
        let bundler = Bundler::new(root, &config).unwrap();
        let out = bundler.bundle("storymaps/tpl/Main").unwrap();

        assert!(!out.included.iter().any(|id| id.starts_with("vendor/maps")));
        assert!(!bundler.manifest(&out).contains("vendor/maps/Widget"));
        assert!(!out.script.contains("define(\"vendor/maps/Widget\""));
        assert!(!out.script.contains("return 1;"));
    }

    #[test]
    fn excluded_modules_drag_their_dependencies() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(
            root,
            "src/app/storymaps/tpl/Main.js",
            "define([\"underscore\", \"./Helper\"], function () {});",
        );
        write(root, "src/app/storymaps/tpl/Helper.js", "define([], function () {});");
        write(root, "src/lib-build/lodash.js", "define([\"storymaps/tpl/Helper\"], function () {});");

        let config = default_bundler_config();
        let bundler = Bundler::new(root, &config).unwrap();
        let out = bundler.bundle("storymaps/tpl/Main").unwrap();
        assert_eq!(out.included, vec!["storymaps/tpl/Main"]);
    }

    #[test]
    fn override_substitutes_runtime_file() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(
            root,
            "src/app/storymaps/tpl/Main.js",
            "define([\"Handlebars\"], function (H) {});",
        );
        write(root, "src/lib-build/hbs/handlebars.js", "define(function () { return 'compiler'; });");
        write(
            root,
            "src/lib-build/hbs/handlebars.runtime.js",
            "define(function () { return 'runtime'; });",
        );

        let config = default_bundler_config();
        let bundler = Bundler::new(root, &config).unwrap();
        let out = bundler.bundle("storymaps/tpl/Main").unwrap();
        assert!(out.script.contains("define(\"handlebars\", function () { return 'runtime'; });"));
        assert!(!out.script.contains("compiler"));
    }

    #[test]
    fn stylesheet_plugin_goes_to_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(
            root,
            "src/app/storymaps/tpl/Main.js",
            "define([\"lib-build/css!./main\"], function () {});",
        );
        write(root, "src/app/storymaps/tpl/main.css", ".a{background:url(../../../img/x.png)}");

        let config = default_bundler_config();
        let bundler = Bundler::new(root, &config).unwrap();
        let out = bundler.bundle("storymaps/tpl/Main").unwrap();
        assert_eq!(out.stylesheet, ".a{background:url(../../../img/x.png)}\n");
        assert!(!out.script.contains("background"));
    }

    #[test]
    fn missing_module_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "src/app/storymaps/tpl/Main.js", "define([\"./Nope\"], function () {});");

        let config = default_bundler_config();
        let bundler = Bundler::new(root, &config).unwrap();
        let err = bundler.bundle("storymaps/tpl/Main").unwrap_err();
        assert!(matches!(err, BundleError::ModuleNotFound { ref id, .. } if id == "storymaps/tpl/Nope"));
    }
}
