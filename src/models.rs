// src/models.rs

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{DEPLOY_DIR, TPL_NAME};

// --- MODELOS DE `storymap.toml` (Lo que se lee del archivo de configuración) ---
// Todos los campos son opcionales: lo que falte se toma de los valores por defecto.

/// Comandos externos usados por el build. Son plantillas ejecutadas por la shell.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct ToolsConfig {
    /// Compilador de componentes, con los tokens `{src}` y `{dest}`.
    pub transpiler: Option<String>,
    /// Optimizador externo, con los tokens `{input}` y `{output}`.
    pub optimizer: Option<String>,
    /// Linters por objetivo (`nls-en`, `nls-all`, `eslint`), con el token `{files}`.
    #[serde(default)]
    pub lint: BTreeMap<String, String>,
}

/// Sustitución de un módulo concreto por una variante alternativa.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ModuleOverride {
    /// Nombre lógico del módulo afectado.
    pub module: String,
    /// Fragmento de la ruta física que se reemplaza...
    pub path_from: String,
    /// ...por este otro.
    pub path_to: String,
    /// Expresión regular aplicada una vez al contenido sustituido.
    pub patch_pattern: String,
    pub patch_replacement: String,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct BundlerFileConfig {
    pub base_url: Option<String>,
    /// Se fusiona sobre la tabla por defecto; el archivo tiene prioridad.
    #[serde(default)]
    pub paths: BTreeMap<String, String>,
    pub external_patterns: Option<Vec<String>>,
    pub manifest_exclude: Option<String>,
    /// Si no está vacío, reemplaza la tabla de sustituciones por defecto.
    #[serde(default)]
    pub overrides: Vec<ModuleOverride>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct ServerFileConfig {
    pub port: Option<u16>,
    pub hostname: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct WatchFileConfig {
    pub poll_interval_ms: Option<u64>,
    /// `false` desactiva la recarga en vivo del navegador.
    pub livereload: Option<bool>,
    pub livereload_port: Option<u16>,
}

/// Representa la estructura deserializada de un archivo `storymap.toml`.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct BuildConfigFile {
    /// Plantilla del banner de licencia (`{name}`, `{version}`, `{date}`).
    pub banner: Option<String>,
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub bundler: BundlerFileConfig,
    #[serde(default)]
    pub server: ServerFileConfig,
    #[serde(default)]
    pub watch: WatchFileConfig,
}

/// Los campos de `package.json` que nos interesan.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PackageInfo {
    pub name: String,
    pub version: String,
}

// --- MODELOS DEL DOMINIO ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BundleKind {
    Builder,
    Viewer,
    Print,
}

impl BundleKind {
    /// En el orden en que se construyen.
    pub const ALL: [BundleKind; 3] = [BundleKind::Builder, BundleKind::Viewer, BundleKind::Print];

    pub fn name(self) -> &'static str {
        match self {
            BundleKind::Builder => "builder",
            BundleKind::Viewer => "viewer",
            BundleKind::Print => "print",
        }
    }

    fn entry_suffix(self) -> &'static str {
        match self {
            BundleKind::Builder => "BuildConfigBuilder",
            BundleKind::Viewer => "BuildConfigViewer",
            BundleKind::Print => "BuildConfigPrint",
        }
    }
}

impl fmt::Display for BundleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Un bundle distribuible: módulo raíz, salida y ficheros de manifiesto.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleDescriptor {
    pub kind: BundleKind,
    /// Nombre lógico del módulo raíz.
    pub entry: String,
    /// Script de salida, relativo a la raíz del proyecto.
    pub out: String,
    /// Manifiesto intermedio (`deploy/build-api-<kind>.tmp`).
    pub manifest: String,
    /// Lista final para el optimizador externo (`jsapi-optim-modules-<kind>.txt`).
    pub optimizer_out: String,
}

impl BundleDescriptor {
    pub fn for_kind(kind: BundleKind) -> Self {
        let name = kind.name();
        Self {
            kind,
            entry: format!("storymaps/{}/{}", TPL_NAME, kind.entry_suffix()),
            out: format!("{}/app/{}-min.js", DEPLOY_DIR, name),
            manifest: format!("{}/build-api-{}.tmp", DEPLOY_DIR, name),
            optimizer_out: format!("jsapi-optim-modules-{}.txt", name),
        }
    }

    /// La hoja de estilos separada que acompaña al script.
    pub fn stylesheet_out(&self) -> String {
        match self.out.strip_suffix(".js") {
            Some(stem) => format!("{}.css", stem),
            None => format!("{}.css", self.out),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BundlerConfig {
    /// Directorio base de los módulos, relativo a la raíz del proyecto.
    pub base_url: String,
    /// Nombre lógico (o prefijo) → ruta relativa a `base_url`, o `empty:`.
    pub paths: BTreeMap<String, String>,
    /// Plugins que se sustituyen por un stub; sus recursos se incrustan como texto.
    pub stub_modules: Vec<String>,
    /// Plugins cuyos recursos van a la hoja de estilos separada.
    pub stylesheet_plugins: Vec<String>,
    /// Módulos (y sus dependencias) que nunca se incluyen.
    pub exclude: Vec<String>,
    /// Expresiones regulares de nombres provistos externamente.
    pub external_patterns: Vec<String>,
    /// Los nombres que casan con esta expresión no aparecen en el manifiesto.
    pub manifest_exclude: String,
    pub overrides: Vec<ModuleOverride>,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub hostname: String,
}

#[derive(Debug, Clone)]
pub struct ResolvedTools {
    pub transpiler: Option<String>,
    pub optimizer: String,
    pub lint: BTreeMap<String, String>,
}

// --- MODELOS EN MEMORIA (Nuestra representación de trabajo interna) ---

/// La vista final y fusionada de la configuración.
/// Se construye una sola vez al arrancar y se pasa por referencia a cada paso.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub root: PathBuf,
    pub package: PackageInfo,
    pub banner: String,
    pub bundler: BundlerConfig,
    pub bundles: Vec<BundleDescriptor>,
    pub tools: ResolvedTools,
    pub server: ServerConfig,
    pub poll_interval: Duration,
    /// Puerto del canal de recarga en vivo; `None` si está desactivada.
    pub livereload_port: Option<u16>,
}

impl ResolvedConfig {
    pub fn bundle(&self, kind: BundleKind) -> Option<&BundleDescriptor> {
        self.bundles.iter().find(|b| b.kind == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_paths_follow_kind() {
        let viewer = BundleDescriptor::for_kind(BundleKind::Viewer);
        assert_eq!(viewer.entry, "storymaps/tpl/BuildConfigViewer");
        assert_eq!(viewer.out, "deploy/app/viewer-min.js");
        assert_eq!(viewer.manifest, "deploy/build-api-viewer.tmp");
        assert_eq!(viewer.optimizer_out, "jsapi-optim-modules-viewer.txt");
        assert_eq!(viewer.stylesheet_out(), "deploy/app/viewer-min.css");
    }

    #[test]
    fn config_file_fields_are_optional() {
        let parsed: BuildConfigFile = toml::from_str("[server]\nport = 9000\n").unwrap();
        assert_eq!(parsed.server.port, Some(9000));
        assert!(parsed.tools.transpiler.is_none());
        assert!(parsed.bundler.paths.is_empty());
    }
}
