// src/system/executor.rs

use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::time::Instant;
use thiserror::Error;

/// Herramientas externas (linters, transpilador, optimizador) lanzadas a través de la shell.
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("No se pudo lanzar '{command}' en {cwd:?}: {source}")]
    Spawn {
        command: String,
        cwd: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("'{command}' terminó con {}", describe_status(.status))]
    Failed { command: String, status: ExitStatus },
}

fn describe_status(status: &ExitStatus) -> String {
    match status.code() {
        Some(code) => format!("código {}", code),
        None => "una señal".to_string(),
    }
}

fn shell() -> (&'static str, &'static str) {
    if cfg!(target_os = "windows") {
        ("cmd", "/C")
    } else {
        ("sh", "-c")
    }
}

/// Ejecuta una línea de comandos ya interpolada. La salida de la herramienta va directa a la terminal.
pub fn execute_command(command_line: &str, cwd: &Path) -> Result<(), ExecutionError> {
    log::info!("Ejecutando: '{}'", command_line);
    let started = Instant::now();

    let (program, flag) = shell();
    let status = Command::new(program)
        .arg(flag)
        .arg(command_line)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .map_err(|source| ExecutionError::Spawn {
            command: command_line.to_string(),
            cwd: cwd.to_path_buf(),
            source,
        })?;

    log::debug!("'{}' tardó {:?}", command_line, started.elapsed());
    if !status.success() {
        return Err(ExecutionError::Failed {
            command: command_line.to_string(),
            status,
        });
    }
    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn non_zero_exit_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = execute_command("exit 3", dir.path()).unwrap_err();
        match err {
            ExecutionError::Failed { status, .. } => assert_eq!(status.code(), Some(3)),
            other => panic!("error inesperado: {other}"),
        }
        assert!(
            execute_command("exit 3", dir.path())
                .unwrap_err()
                .to_string()
                .contains("código 3")
        );
    }

    #[test]
    fn runs_in_the_given_directory() {
        let dir = tempfile::tempdir().unwrap();
        execute_command("echo hola > marca.txt", dir.path()).unwrap();
        assert!(dir.path().join("marca.txt").is_file());
    }

    #[test]
    fn missing_directory_fails_to_spawn() {
        let dir = tempfile::tempdir().unwrap();
        let err = execute_command("true", &dir.path().join("no-existe")).unwrap_err();
        assert!(matches!(err, ExecutionError::Spawn { .. }));
    }
}
