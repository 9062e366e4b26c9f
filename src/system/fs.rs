// src/system/fs.rs

use regex::Regex;
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum FsError {
    #[error("Error de ficheros en '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("Patrón glob inválido '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("No se pudo recorrer '{path}': {source}")]
    Walk {
        path: String,
        #[source]
        source: walkdir::Error,
    },
}

impl FsError {
    fn io(path: &Path, source: io::Error) -> Self {
        FsError::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

type FsResult<T> = Result<T, FsError>;

/// Indica si la cadena contiene algún comodín glob.
pub fn has_glob_chars(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}

/// Traduce un patrón glob (`**`, `*`, `?`) a una expresión regular anclada.
/// Las rutas se comparan siempre con `/` como separador.
pub fn glob_to_regex(pattern: &str) -> FsResult<Regex> {
    let mut re = String::from("^");
    let chars: Vec<char> = pattern.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '*' if chars.get(i + 1) == Some(&'*') => {
                if chars.get(i + 2) == Some(&'/') {
                    // `**/` puede no consumir ningún directorio.
                    re.push_str("(?:.*/)?");
                    i += 3;
                } else {
                    re.push_str(".*");
                    i += 2;
                }
                continue;
            }
            '*' => re.push_str("[^/]*"),
            '?' => re.push_str("[^/]"),
            c => re.push_str(&regex::escape(&c.to_string())),
        }
        i += 1;
    }
    re.push('$');

    Regex::new(&re).map_err(|source| FsError::Pattern {
        pattern: pattern.to_string(),
        source,
    })
}

/// Separa la parte literal inicial de un patrón (el directorio desde el que hay que recorrer).
fn literal_prefix(pattern: &str) -> &str {
    match pattern.find(['*', '?', '[']) {
        Some(pos) => match pattern[..pos].rfind('/') {
            Some(slash) => &pattern[..slash],
            None => "",
        },
        None => pattern,
    }
}

fn normalize_pattern(pattern: &str) -> &str {
    let pattern = pattern.strip_prefix("./").unwrap_or(pattern);
    pattern.trim_end_matches('/')
}

/// Como en los globs de Grunt, un comodín no casa con segmentos ocultos (`.git`, `.#Main.js`)
/// salvo que el propio patrón nombre un segmento que empiece por punto.
fn matches_dot_segments(pattern: &str) -> bool {
    pattern.starts_with('.') || pattern.contains("/.")
}

fn has_hidden_segment(rel_path: &str) -> bool {
    rel_path.split('/').any(|segment| segment.starts_with('.'))
}

fn to_slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Conjunto de patrones con soporte para negaciones (`!patrón`).
#[derive(Debug)]
pub struct GlobSet {
    include: Vec<IncludePattern>,
    exclude: Vec<Regex>,
}

#[derive(Debug)]
struct IncludePattern {
    pattern: String,
    regex: Regex,
    dot: bool,
}

impl IncludePattern {
    fn is_match(&self, rel_path: &str) -> bool {
        (self.dot || !has_hidden_segment(rel_path)) && self.regex.is_match(rel_path)
    }
}

impl GlobSet {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> FsResult<Self> {
        let mut include = Vec::new();
        let mut exclude = Vec::new();

        for raw in patterns {
            let raw = raw.as_ref();
            if let Some(negated) = raw.strip_prefix('!') {
                exclude.push(glob_to_regex(normalize_pattern(negated))?);
            } else {
                let pattern = normalize_pattern(raw);
                include.push(IncludePattern {
                    pattern: pattern.to_string(),
                    regex: glob_to_regex(pattern)?,
                    dot: matches_dot_segments(pattern),
                });
            }
        }
        Ok(Self { include, exclude })
    }

    /// Comprueba una ruta relativa (con `/`) contra el conjunto.
    pub fn is_match(&self, rel_path: &str) -> bool {
        self.include.iter().any(|include| include.is_match(rel_path))
            && !self.exclude.iter().any(|re| re.is_match(rel_path))
    }

    /// Expande los patrones bajo `base`. Devuelve rutas relativas a `base`, ordenadas.
    /// Con `with_dirs` también se devuelven directorios (para borrar).
    pub fn expand(&self, base: &Path, with_dirs: bool) -> FsResult<Vec<String>> {
        let mut found = BTreeSet::new();

        for include in &self.include {
            let pattern = &include.pattern;
            let prefix = literal_prefix(pattern);
            let start = if prefix.is_empty() {
                base.to_path_buf()
            } else {
                base.join(prefix)
            };

            if !has_glob_chars(pattern) {
                // Un patrón literal solo puede coincidir consigo mismo.
                if start.is_file() || (with_dirs && start.is_dir()) {
                    found.insert(pattern.clone());
                }
                continue;
            }
            if !start.is_dir() {
                continue;
            }

            for entry in WalkDir::new(&start).min_depth(1).sort_by_file_name() {
                let entry = entry.map_err(|source| FsError::Walk {
                    path: start.display().to_string(),
                    source,
                })?;
                if !with_dirs && entry.file_type().is_dir() {
                    continue;
                }
                let Ok(rel) = entry.path().strip_prefix(base) else {
                    continue;
                };
                let rel = to_slash_path(rel);
                if include.is_match(&rel) {
                    found.insert(rel);
                }
            }
        }

        Ok(found
            .into_iter()
            .filter(|rel| !self.exclude.iter().any(|re| re.is_match(rel)))
            .collect())
    }
}

/// Atajo para expandir una lista de patrones a ficheros bajo `base`.
pub fn expand_files<S: AsRef<str>>(base: &Path, patterns: &[S]) -> FsResult<Vec<String>> {
    GlobSet::new(patterns)?.expand(base, false)
}

pub fn read_to_string(path: &Path) -> FsResult<String> {
    fs::read_to_string(path).map_err(|e| FsError::io(path, e))
}

/// Escribe el fichero creando los directorios padre que falten.
pub fn write(path: &Path, contents: impl AsRef<[u8]>) -> FsResult<()> {
    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }
    fs::write(path, contents).map_err(|e| FsError::io(path, e))
}

pub fn copy_file(from: &Path, to: &Path) -> FsResult<()> {
    if let Some(parent) = to.parent() {
        create_dir_all(parent)?;
    }
    fs::copy(from, to).map_err(|e| FsError::io(from, e))?;
    Ok(())
}

pub fn create_dir_all(path: &Path) -> FsResult<()> {
    fs::create_dir_all(path).map_err(|e| FsError::io(path, e))
}

/// Borra un fichero o un directorio completo. Devuelve `false` si no existía.
pub fn remove_path(path: &Path) -> FsResult<bool> {
    let result = if path.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };

    match result {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(FsError::io(path, e)),
    }
}

pub fn modified(path: &Path) -> FsResult<SystemTime> {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .map_err(|e| FsError::io(path, e))
}

/// Une una ruta relativa con `/` a una base del sistema.
pub fn join_slash(base: &Path, rel: &str) -> PathBuf {
    rel.split('/')
        .filter(|part| !part.is_empty() && *part != ".")
        .fold(base.to_path_buf(), |acc, part| acc.join(part))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn double_star_matches_any_depth() {
        let re = glob_to_regex("**/*.less").unwrap();
        assert!(re.is_match("a.less"));
        assert!(re.is_match("tpl/core/a.less"));
        assert!(!re.is_match("tpl/core/a.less.bak"));
    }

    #[test]
    fn single_star_stays_in_segment() {
        let re = glob_to_regex("deploy/app/*.css").unwrap();
        assert!(re.is_match("deploy/app/viewer-min.css"));
        assert!(!re.is_match("deploy/app/sub/viewer-min.css"));
    }

    #[test]
    fn literal_prefix_stops_at_first_wildcard() {
        assert_eq!(literal_prefix("src/resources/fonts/OpenSans-*.*"), "src/resources/fonts");
        assert_eq!(literal_prefix("*.html"), "");
        assert_eq!(literal_prefix("Readme.txt"), "Readme.txt");
    }

    #[test]
    fn expand_honours_negations() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir.path().join("a/keep.js"), "1").unwrap();
        write(&dir.path().join("a/skip/drop.js"), "2").unwrap();

        let files = expand_files(dir.path(), &["a/**/*.js", "!a/skip/**"]).unwrap();
        assert_eq!(files, vec!["a/keep.js".to_string()]);
    }

    #[test]
    fn wildcards_skip_hidden_segments() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir.path().join("app/Main.js"), "1").unwrap();
        write(&dir.path().join("app/.#Main.js"), "2").unwrap();
        write(&dir.path().join("app/.cache/old.js"), "3").unwrap();

        let files = expand_files(dir.path(), &["app/**/*.js"]).unwrap();
        assert_eq!(files, vec!["app/Main.js".to_string()]);

        let hidden = expand_files(dir.path(), &["app/.cache/*.js"]).unwrap();
        assert_eq!(hidden, vec!["app/.cache/old.js".to_string()]);
    }

    #[test]
    fn expand_missing_base_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let files = expand_files(dir.path(), &["nope/**"]).unwrap();
        assert!(files.is_empty());
    }
}
