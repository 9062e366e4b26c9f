// src/config.rs

use std::env;
use std::path::{Path, PathBuf};

use crate::constants::{CONFIG_FILENAME, PACKAGE_FILENAME};

/// Devuelve la raíz del proyecto: la indicada en la CLI o el directorio actual.
pub fn project_root(explicit: Option<&Path>) -> std::io::Result<PathBuf> {
    let root = match explicit {
        Some(path) => path.to_path_buf(),
        None => env::current_dir()?,
    };
    log::info!("Raíz del proyecto: {:?}", root);
    Ok(root)
}

/// Devuelve la ruta al archivo storymap.toml (puede no existir).
pub fn config_file_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILENAME)
}

/// Devuelve la ruta al archivo package.json.
pub fn package_file_path(root: &Path) -> PathBuf {
    root.join(PACKAGE_FILENAME)
}
