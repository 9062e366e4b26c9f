// src/core/banner.rs

use chrono::Local;
use std::path::Path;

use crate::core::interpolator::Interpolator;
use crate::models::ResolvedConfig;
use crate::system::fs::{self, FsError};

/// Formato de fecha del banner: `2018-03-07, 04:21:09 PM`.
const BANNER_DATE_FORMAT: &str = "%Y-%m-%d, %I:%M:%S %p";

/// El banner de licencia con nombre, versión y fecha ya sustituidos.
pub fn render_banner(config: &ResolvedConfig) -> String {
    let date = Local::now().format(BANNER_DATE_FORMAT).to_string();
    Interpolator::new(config)
        .with("date", date)
        .interpolate(&config.banner)
}

/// Quita un comentario de bloque inicial, salvo los que empiezan por `/*!`.
fn strip_banner(content: &str) -> &str {
    let trimmed = content.trim_start();
    if trimmed.starts_with("/*") && !trimmed.starts_with("/*!") {
        if let Some(end) = trimmed.find("*/") {
            return trimmed[end + 2..].trim_start();
        }
    }
    content
}

/// Antepone el banner al fichero, en su sitio.
pub fn prepend_banner(path: &Path, banner: &str) -> Result<(), FsError> {
    let content = fs::read_to_string(path)?;
    let body = strip_banner(&content);
    fs::write(path, format!("{}\n{}", banner, body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_plain_leading_comment_only() {
        assert_eq!(strip_banner("/* old */\ncode();"), "code();");
        assert_eq!(strip_banner("/*! keep */code();"), "/*! keep */code();");
        assert_eq!(strip_banner("code(); /* late */"), "code(); /* late */");
    }

    #[test]
    fn prepends_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("viewer-min.js");
        fs::write(&path, "/* build */define(\"a\",[],function(){});").unwrap();

        prepend_banner(&path, "/*! cascade - v1.0.0 */").unwrap();
        let out = std::fs::read_to_string(&path).unwrap();
        assert_eq!(out, "/*! cascade - v1.0.0 */\ndefine(\"a\",[],function(){});");
    }
}
