// src/bin/storymap-build.rs

use anyhow::{Context, Result, anyhow};
use clap::Parser;

use storymap_build::cli::Cli;
use storymap_build::config as project_paths;
use storymap_build::core::config::{CliOverrides, resolve_config};
use storymap_build::core::runner;

/// El punto de entrada principal de la aplicación.
fn main() {
    // Inicializar el logger. Para ver los logs, ejecuta con `RUST_LOG=debug storymap-build ...`
    env_logger::init();

    let cli = Cli::parse();

    // Ejecutar la lógica principal y manejar cualquier error.
    if let Err(e) = run_cli(cli) {
        eprintln!("\nError: {:?}", e);
        std::process::exit(1);
    }
}

/// El despachador principal de la aplicación.
fn run_cli(cli: Cli) -> Result<()> {
    log::debug!("CLI args parsed: {:?}", cli);

    let task = cli.task.as_deref().unwrap_or("default");
    if !matches!(task, "default" | "dev" | "server" | "jsapioptim") {
        return Err(anyhow!(
            "Tarea desconocida '{}'. Tareas disponibles: default, dev, server, jsapioptim.",
            task
        ));
    }

    let root = project_paths::project_root(cli.root.as_deref())
        .context("No se pudo determinar la raíz del proyecto.")?;
    let overrides = CliOverrides {
        port: cli.port,
        poll_interval_ms: cli.poll_ms,
    };
    // La configuración se resuelve una sola vez y no cambia durante la ejecución.
    let config = resolve_config(&root, &overrides)
        .with_context(|| format!("No se pudo cargar la configuración de {}", root.display()))?;

    let result = match task {
        "dev" => runner::run_dev(&config),
        "server" => runner::run_server(&config),
        "jsapioptim" => runner::run_optimizer_export(&config),
        _ => runner::run_production(&config),
    };
    result.with_context(|| format!("La tarea '{}' no se completó", task))
}
