// src/cli.rs

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "storymap-build: construye, vigila y sirve la plantilla de story map.", long_about = None)]
pub struct Cli {
    /// Tarea a ejecutar ('default', 'dev', 'server', 'jsapioptim'). Sin tarea, build de producción.
    pub task: Option<String>,

    /// Raíz del proyecto (por defecto, el directorio actual).
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Puerto de la tarea 'server'.
    #[arg(long)]
    pub port: Option<u16>,

    /// Intervalo de sondeo de 'dev', en milisegundos.
    #[arg(long)]
    pub poll_ms: Option<u64>,
}
