// src/core/rewrite.rs

use regex::{NoExpand, Regex};
use std::borrow::Cow;
use std::fmt;
use std::path::Path;
use thiserror::Error;

use crate::system::fs::{self, FsError};

#[derive(Error, Debug)]
pub enum RewriteError {
    #[error("Error de ficheros: {0}")]
    Fs(#[from] FsError),
    #[error("La regla '{rule}' tiene una expresión inválida: {source}")]
    InvalidRule {
        rule: &'static str,
        #[source]
        source: regex::Error,
    },
}

#[derive(Debug, Clone, Copy)]
pub enum RulePattern {
    Literal(&'static str),
    Regex(&'static str),
}

/// Una regla de búsqueda y reemplazo. Sin `global` solo se toca la primera coincidencia.
#[derive(Debug, Clone, Copy)]
pub struct RewriteRule {
    pub name: &'static str,
    pub pattern: RulePattern,
    pub replacement: &'static str,
    pub global: bool,
}

const CSS_PATHS: &[RewriteRule] = &[
    RewriteRule {
        name: "Project images path",
        pattern: RulePattern::Regex(r"(?:\.\./){2,}"),
        replacement: "../",
        global: true,
    },
    // Solo la carpeta build raíz; las que aparecen más adelante en la ruta se quedan.
    RewriteRule {
        name: "Remove build folder from image path",
        pattern: RulePattern::Literal("../build/"),
        replacement: "../",
        global: false,
    },
    RewriteRule {
        name: "Font Awesome path",
        pattern: RulePattern::Literal("../lib/font-awesome/fonts/"),
        replacement: "../resources/lib/font-awesome/fonts/",
        global: true,
    },
    RewriteRule {
        name: "Calcite fonts",
        pattern: RulePattern::Literal("../lib/calcite-bootstrap/css/fonts/"),
        replacement: "../resources/lib/calcite-bootstrap/fonts/",
        global: true,
    },
];

const JS_ENV_FLAG: &[RewriteRule] = &[RewriteRule {
    name: "JS isProduction flag",
    pattern: RulePattern::Literal("TPL_ENV_DEV"),
    replacement: "TPL_ENV_PRODUCTION",
    global: true,
}];

const MAIN_CONFIG_ENV_FLAG: &[RewriteRule] = &[RewriteRule {
    name: "Index.html isProduction flag",
    pattern: RulePattern::Literal("app.isProduction = false"),
    replacement: "app.isProduction = true",
    global: false,
}];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ruleset {
    CssPaths,
    JsEnvFlag,
    MainConfigEnvFlag,
}

impl Ruleset {
    pub fn rules(self) -> &'static [RewriteRule] {
        match self {
            Ruleset::CssPaths => CSS_PATHS,
            Ruleset::JsEnvFlag => JS_ENV_FLAG,
            Ruleset::MainConfigEnvFlag => MAIN_CONFIG_ENV_FLAG,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Ruleset::CssPaths => "css-paths",
            Ruleset::JsEnvFlag => "js-env-flag",
            Ruleset::MainConfigEnvFlag => "main-config-env-flag",
        }
    }

    /// Aplica todas las reglas, en orden, sobre el mismo texto.
    pub fn apply(self, text: &str) -> Result<String, RewriteError> {
        let mut current = text.to_string();
        for rule in self.rules() {
            current = apply_rule(rule, &current)?.into_owned();
        }
        Ok(current)
    }
}

impl fmt::Display for Ruleset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn apply_rule<'t>(rule: &RewriteRule, text: &'t str) -> Result<Cow<'t, str>, RewriteError> {
    let source = match rule.pattern {
        RulePattern::Literal(lit) => regex::escape(lit),
        RulePattern::Regex(re) => re.to_string(),
    };
    let re = Regex::new(&source).map_err(|source| RewriteError::InvalidRule {
        rule: rule.name,
        source,
    })?;

    let limit = if rule.global { 0 } else { 1 };
    let result = re.replacen(text, limit, NoExpand(rule.replacement));
    if matches!(result, Cow::Borrowed(_)) {
        log::debug!("Regla '{}' sin coincidencias", rule.name);
    }
    Ok(result)
}

/// Reescribe en su sitio cada fichero que case con `pattern` (relativo a `root`).
/// Devuelve cuántos ficheros se han procesado.
pub fn rewrite_files(root: &Path, ruleset: Ruleset, pattern: &str) -> Result<usize, RewriteError> {
    let files = fs::expand_files(root, &[pattern])?;
    if files.is_empty() {
        log::warn!("'{}': ningún fichero coincide con '{}'", ruleset, pattern);
    }

    for rel in &files {
        let path = fs::join_slash(root, rel);
        let original = fs::read_to_string(&path)?;
        let rewritten = ruleset.apply(&original)?;
        fs::write(&path, rewritten)?;
        log::debug!("'{}' aplicado a {}", ruleset, rel);
    }
    Ok(files.len())
}
