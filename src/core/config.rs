// src/core/config.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::config as project_paths;
use crate::constants::{
    DEFAULT_LIVERELOAD_PORT, DEFAULT_POLL_INTERVAL_MS, DEFAULT_SERVER_PORT, EMPTY_SENTINEL,
};
use crate::models::{
    BuildConfigFile, BundleDescriptor, BundleKind, BundlerConfig, ModuleOverride, PackageInfo,
    ResolvedConfig, ResolvedTools, ServerConfig,
};
use crate::system::fs::{self, FsError};

pub const DEFAULT_BANNER: &str = "/*! {name} - v{version} - {date} - Copyright \u{00A9} 2016-2018 Esri \n\
This application is released under the Apache License V2.0 by Esri http://www.esri.com/ - \
https://github.com/Esri/story-map-cascade */";

pub const DEFAULT_OPTIMIZER: &str = "node src/lib-build/js-api-optimizer.js {input} {output}";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Error de ficheros: {0}")]
    Fs(#[from] FsError),
    #[error("Error al parsear TOML en '{path}': {source}")]
    TomlParse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("No se encontró '{path}'; es necesario para el banner de licencia.")]
    PackageNotFound { path: String },
    #[error("El archivo '{path}' está mal formado: {source}")]
    PackageParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

type ConfigResult<T> = Result<T, ConfigError>;

/// Ajustes que llegan desde la línea de comandos y tienen prioridad sobre el archivo.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub port: Option<u16>,
    pub poll_interval_ms: Option<u64>,
}

/// Carga `package.json` y el `storymap.toml` opcional, y los fusiona con los valores por defecto.
pub fn resolve_config(root: &Path, cli: &CliOverrides) -> ConfigResult<ResolvedConfig> {
    let package = load_package(root)?;
    let file = load_config_file(root)?;
    Ok(merge_config(root.to_path_buf(), package, file, cli))
}

fn load_package(root: &Path) -> ConfigResult<PackageInfo> {
    let path = project_paths::package_file_path(root);
    if !path.is_file() {
        return Err(ConfigError::PackageNotFound {
            path: path.display().to_string(),
        });
    }
    let content = fs::read_to_string(&path)?;
    serde_json::from_str(&content).map_err(|source| ConfigError::PackageParse {
        path: path.display().to_string(),
        source,
    })
}

/// Si `storymap.toml` no existe, devuelve una configuración vacía.
fn load_config_file(root: &Path) -> ConfigResult<BuildConfigFile> {
    let path = project_paths::config_file_path(root);
    if !path.exists() {
        log::debug!("Sin {:?}; se usan los valores por defecto.", path);
        return Ok(BuildConfigFile::default());
    }
    log::info!("Cargando configuración desde: {:?}", path);
    let content = fs::read_to_string(&path)?;
    toml::from_str(&content).map_err(|source| ConfigError::TomlParse {
        path: path.display().to_string(),
        source,
    })
}

/// Lógica de fusión: CLI > archivo > valores por defecto.
pub fn merge_config(
    root: PathBuf,
    package: PackageInfo,
    file: BuildConfigFile,
    cli: &CliOverrides,
) -> ResolvedConfig {
    let mut bundler = default_bundler_config();
    if let Some(base_url) = file.bundler.base_url {
        bundler.base_url = base_url;
    }
    bundler.paths.extend(file.bundler.paths);
    if let Some(patterns) = file.bundler.external_patterns {
        bundler.external_patterns = patterns;
    }
    if let Some(pattern) = file.bundler.manifest_exclude {
        bundler.manifest_exclude = pattern;
    }
    if !file.bundler.overrides.is_empty() {
        bundler.overrides = file.bundler.overrides;
    }

    let port = cli
        .port
        .or(file.server.port)
        .unwrap_or(DEFAULT_SERVER_PORT);
    let poll_ms = cli
        .poll_interval_ms
        .or(file.watch.poll_interval_ms)
        .unwrap_or(DEFAULT_POLL_INTERVAL_MS);
    let livereload_port = match file.watch.livereload {
        Some(false) => None,
        _ => Some(file.watch.livereload_port.unwrap_or(DEFAULT_LIVERELOAD_PORT)),
    };

    ResolvedConfig {
        root,
        package,
        banner: file.banner.unwrap_or_else(|| DEFAULT_BANNER.to_string()),
        bundler,
        bundles: BundleKind::ALL
            .iter()
            .map(|kind| BundleDescriptor::for_kind(*kind))
            .collect(),
        tools: ResolvedTools {
            transpiler: file.tools.transpiler,
            optimizer: file
                .tools
                .optimizer
                .unwrap_or_else(|| DEFAULT_OPTIMIZER.to_string()),
            lint: file.tools.lint,
        },
        server: ServerConfig {
            port,
            hostname: file
                .server
                .hostname
                .unwrap_or_else(|| "0.0.0.0".to_string()),
        },
        poll_interval: Duration::from_millis(poll_ms),
        livereload_port,
    }
}

/// La tabla de módulos de la plantilla. Los paquetes del framework de mapas se marcan como externos.
pub fn default_bundler_config() -> BundlerConfig {
    let mut paths = BTreeMap::new();
    for external in ["dojo", "esri", "esri4", "dijit", "dojox", "dgrid", "put-selector"] {
        paths.insert(external.to_string(), EMPTY_SENTINEL.to_string());
    }
    let local = [
        ("lib", "../lib/"),
        ("storymaps-react", "../../build/app/storymaps/"),
        ("issue-checker", "../../build/app/storymaps/issue-checker"),
        ("react", "../lib/react/react.min"),
        ("react-dom", "../lib/react/react-dom.min"),
        ("redux", "../lib/redux/index"),
        ("react-redux", "../lib/react-redux/index"),
        ("react-bootstrap", "../lib/react-bootstrap/react-bootstrap.min"),
        ("lib-build", "../lib-build/"),
        ("text", "../lib-build/text"),
        ("underscore", "../lib-build/lodash"),
        ("Handlebars", "../lib-build/hbs/handlebars"),
        ("i18n", "../lib-build/i18n"),
        ("resources", "../resources"),
    ];
    for (name, path) in local {
        paths.insert(name.to_string(), path.to_string());
    }

    BundlerConfig {
        base_url: "src/app/".to_string(),
        paths,
        stub_modules: vec!["text".to_string(), "lib-build/tpl".to_string()],
        stylesheet_plugins: vec!["lib-build/css".to_string(), "css".to_string()],
        exclude: vec![
            "underscore".to_string(),
            "lib-build/normalize".to_string(),
            "lib-build/i18n".to_string(),
        ],
        external_patterns: vec![r"^(?:https?:)?//".to_string()],
        manifest_exclude: "lib-".to_string(),
        overrides: vec![ModuleOverride {
            module: "Handlebars".to_string(),
            path_from: "handlebars.js".to_string(),
            path_to: "handlebars.runtime.js".to_string(),
            patch_pattern: r"(define\()(function)".to_string(),
            patch_replacement: r#"${1}"handlebars", ${2}"#.to_string(),
        }],
    }
}
