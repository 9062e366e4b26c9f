// src/core/transpile.rs

use std::time::SystemTime;
use thiserror::Error;

use crate::core::copy::FileMapping;
use crate::core::interpolator::Interpolator;
use crate::models::ResolvedConfig;
use crate::system::executor::{self, ExecutionError};
use crate::system::fs::{self, FsError};

#[derive(Error, Debug)]
pub enum TranspileError {
    #[error("Error de ficheros: {0}")]
    Fs(#[from] FsError),
    #[error("Falló la compilación de '{file}': {source}")]
    Compiler {
        file: String,
        #[source]
        source: ExecutionError,
    },
}

/// Compila cada componente con el compilador externo configurado (`tools.transpiler`).
/// Sin compilador, el fichero se copia tal cual con la nueva extensión.
pub fn run_transpile(
    config: &ResolvedConfig,
    mappings: &[FileMapping],
    since: Option<SystemTime>,
) -> Result<usize, TranspileError> {
    if config.tools.transpiler.is_none() {
        log::warn!("No hay compilador configurado en [tools].transpiler; se copian los componentes sin compilar.");
    }

    let mut count = 0;
    for mapping in mappings {
        for (src, dest) in mapping.resolve(&config.root, since)? {
            let dest_path = fs::join_slash(&config.root, &dest);
            match &config.tools.transpiler {
                Some(template) => {
                    if let Some(parent) = dest_path.parent() {
                        fs::create_dir_all(parent)?;
                    }
                    let command = Interpolator::new(config)
                        .with("src", src.clone())
                        .with("dest", dest.clone())
                        .interpolate(template);
                    executor::execute_command(&command, &config.root)
                        .map_err(|source| TranspileError::Compiler {
                            file: src.clone(),
                            source,
                        })?;
                }
                None => fs::copy_file(&fs::join_slash(&config.root, &src), &dest_path)?,
            }
            count += 1;
        }
    }
    Ok(count)
}
