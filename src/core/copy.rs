// src/core/copy.rs

use std::path::Path;
use std::time::SystemTime;
use thiserror::Error;

use crate::core::style_vars::StyleVarsError;
use crate::system::fs::{self, FsError};

#[derive(Error, Debug)]
pub enum CopyError {
    #[error("Error de ficheros: {0}")]
    Fs(#[from] FsError),
    #[error("No se pudo transformar '{file}': {source}")]
    Process {
        file: String,
        #[source]
        source: StyleVarsError,
    },
}

/// Calcula la ruta de destino a partir de `dest` y la ruta relativa del origen.
pub type RenameFn = fn(&str, &str) -> String;

/// Transforma el contenido de cada fichero copiado.
pub type ProcessFn = fn(&str) -> Result<String, StyleVarsError>;

/// Un grupo de ficheros: patrones relativos a `cwd`, copiados bajo `dest`.
#[derive(Debug, Clone)]
pub struct FileMapping {
    pub cwd: String,
    pub patterns: Vec<String>,
    pub dest: String,
    pub rename: Option<RenameFn>,
    /// Nueva extensión; reemplaza todo lo que sigue al primer punto del nombre.
    pub ext: Option<String>,
}

impl FileMapping {
    pub fn new(cwd: &str, patterns: &[&str], dest: &str) -> Self {
        Self {
            cwd: cwd.to_string(),
            patterns: patterns.iter().map(|p| p.to_string()).collect(),
            dest: dest.to_string(),
            rename: None,
            ext: None,
        }
    }

    pub fn rename(mut self, rename: RenameFn) -> Self {
        self.rename = Some(rename);
        self
    }

    pub fn ext(mut self, ext: &str) -> Self {
        self.ext = Some(ext.to_string());
        self
    }

    /// Ruta de destino (relativa a la raíz) para un origen relativo a `cwd`.
    pub fn destination(&self, rel: &str) -> String {
        let rel = match &self.ext {
            Some(ext) => replace_extension(rel, ext),
            None => rel.to_string(),
        };
        let dest = if self.dest.is_empty() || self.dest.ends_with('/') {
            self.dest.clone()
        } else {
            format!("{}/", self.dest)
        };
        match self.rename {
            Some(rename) => rename(&dest, &rel),
            None => format!("{}{}", dest, rel),
        }
    }

    /// Pares (origen, destino) relativos a la raíz, filtrados por fecha si se pide.
    pub fn resolve(&self, root: &Path, since: Option<SystemTime>) -> Result<Vec<(String, String)>, FsError> {
        let base = fs::join_slash(root, &self.cwd);
        let mut pairs = Vec::new();
        for rel in fs::expand_files(&base, &self.patterns)? {
            let src = join_rel(&self.cwd, &rel);
            if let Some(since) = since {
                if fs::modified(&fs::join_slash(root, &src))? <= since {
                    continue;
                }
            }
            pairs.push((src, self.destination(&rel)));
        }
        Ok(pairs)
    }
}

/// Una operación de copia con transformación opcional del contenido.
#[derive(Debug, Clone)]
pub struct CopySpec {
    pub mappings: Vec<FileMapping>,
    pub process: Option<ProcessFn>,
}

impl CopySpec {
    pub fn files(mappings: Vec<FileMapping>) -> Self {
        Self {
            mappings,
            process: None,
        }
    }

    pub fn process(mut self, process: ProcessFn) -> Self {
        self.process = Some(process);
        self
    }
}

/// Ejecuta la copia. Devuelve cuántos ficheros se copiaron.
pub fn run_copy(root: &Path, copy_spec: &CopySpec, since: Option<SystemTime>) -> Result<usize, CopyError> {
    let mut copied = 0;
    for mapping in &copy_spec.mappings {
        for (src, dest) in mapping.resolve(root, since)? {
            let from = fs::join_slash(root, &src);
            let to = fs::join_slash(root, &dest);
            match copy_spec.process {
                Some(process) => {
                    let content = fs::read_to_string(&from)?;
                    let processed = process(&content).map_err(|source| CopyError::Process {
                        file: src.clone(),
                        source,
                    })?;
                    fs::write(&to, processed)?;
                }
                None => fs::copy_file(&from, &to)?,
            }
            log::debug!("Copiado {} -> {}", src, dest);
            copied += 1;
        }
    }
    Ok(copied)
}

fn join_rel(cwd: &str, rel: &str) -> String {
    let cwd = cwd.trim_end_matches('/');
    if cwd.is_empty() || cwd == "." {
        rel.to_string()
    } else {
        format!("{}/{}", cwd, rel)
    }
}

fn replace_extension(rel: &str, ext: &str) -> String {
    let (dir, file) = match rel.rfind('/') {
        Some(slash) => rel.split_at(slash + 1),
        None => ("", rel),
    };
    let stem = match file.find('.') {
        Some(dot) => &file[..dot],
        None => file,
    };
    format!("{}{}{}", dir, stem, ext)
}

/// `index` → `index.js` (el shim de la API de YouTube se descarga sin extensión).
pub fn append_js_extension(dest: &str, src: &str) -> String {
    format!("{}{}.js", dest, src)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn destination_with_ext_and_rename() {
        let jsx = FileMapping::new("src/", &["app/storymaps/**/*.jsx"], "build/").ext(".js");
        assert_eq!(
            jsx.destination("app/storymaps/tpl/View.jsx"),
            "build/app/storymaps/tpl/View.js"
        );

        let youtube = FileMapping::new("src/lib/youtube-api/", &["index"], "src/lib/youtube-api/")
            .rename(append_js_extension);
        assert_eq!(youtube.destination("index"), "src/lib/youtube-api/index.js");
    }

    #[test]
    fn copy_keeps_relative_structure() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::write(&root.join("src/app/storymaps/tpl/a.less"), "a").unwrap();
        fs::write(&root.join("src/app/storymaps/tpl/b.js"), "b").unwrap();

        let copy_spec = CopySpec::files(vec![FileMapping::new(
            "src/app/storymaps/",
            &["**/*.less"],
            "build/app/storymaps/",
        )]);
        assert_eq!(run_copy(root, &copy_spec, None).unwrap(), 1);
        assert!(root.join("build/app/storymaps/tpl/a.less").is_file());
        assert!(!root.join("build/app/storymaps/tpl/b.js").exists());
    }

    #[test]
    fn newer_filter_skips_old_sources() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::write(&root.join("src/a.hbs"), "a").unwrap();

        let copy_spec = CopySpec::files(vec![FileMapping::new("src", &["*.hbs"], "build")]);
        let future = SystemTime::now() + std::time::Duration::from_secs(3600);
        assert_eq!(run_copy(root, &copy_spec, Some(future)).unwrap(), 0);
        assert_eq!(run_copy(root, &copy_spec, Some(SystemTime::UNIX_EPOCH)).unwrap(), 1);
        assert!(root.join("build/a.hbs").is_file());
    }

    #[test]
    fn process_failure_aborts_copy() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::write(&root.join("sass/_v.scss"), "$x: fade_in(0.5);").unwrap();

        let copy_spec = CopySpec::files(vec![FileMapping::new("sass", &["*.scss"], "less")])
            .process(crate::core::style_vars::sass_to_less);
        let err = run_copy(root, &copy_spec, None).unwrap_err();
        assert!(matches!(err, CopyError::Process { .. }));
    }
}
