// src/core/interpolator.rs

use crate::models::ResolvedConfig;

/// Sustituye tokens `{clave}` en plantillas de banner y de comandos.
pub struct Interpolator<'a> {
    config: &'a ResolvedConfig,
    params: Vec<(&'a str, String)>,
}

impl<'a> Interpolator<'a> {
    pub fn new(config: &'a ResolvedConfig) -> Self {
        Self {
            config,
            params: Vec::new(),
        }
    }

    /// Añade un token propio de la invocación (`{src}`, `{dest}`, `{files}`...).
    pub fn with(mut self, key: &'a str, value: impl Into<String>) -> Self {
        self.params.push((key, value.into()));
        self
    }

    /// Interpola una cadena de texto, reemplazando todos los tokens conocidos.
    pub fn interpolate(&self, input: &str) -> String {
        let pass1 = self.interpolate_reserved(input);
        self.interpolate_params(&pass1)
    }

    /// Reemplaza tokens reservados y metadatos del proyecto.
    fn interpolate_reserved(&self, input: &str) -> String {
        let mut result = input.to_string();

        if let Some(root_str) = self.config.root.to_str() {
            result = result.replace("{root}", root_str);
        }
        result = result.replace("{name}", &self.config.package.name);
        result.replace("{version}", &self.config.package.version)
    }

    fn interpolate_params(&self, input: &str) -> String {
        let mut result = input.to_string();
        for (key, value) in &self.params {
            let token = format!("{{{}}}", key);
            result = result.replace(&token, value);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{CliOverrides, merge_config};
    use crate::models::{BuildConfigFile, PackageInfo};
    use std::path::PathBuf;

    fn config() -> ResolvedConfig {
        merge_config(
            PathBuf::from("/proj"),
            PackageInfo {
                name: "cascade".to_string(),
                version: "1.0.0".to_string(),
            },
            BuildConfigFile::default(),
            &CliOverrides::default(),
        )
    }

    #[test]
    fn reserved_and_params() {
        let config = config();
        let out = Interpolator::new(&config)
            .with("src", "a.jsx")
            .with("dest", "a.js")
            .interpolate("{name}@{version}: babel {src} -o {dest} ({root})");
        assert_eq!(out, "cascade@1.0.0: babel a.jsx -o a.js (/proj)");
    }

    #[test]
    fn unknown_tokens_are_left_alone() {
        let config = config();
        assert_eq!(Interpolator::new(&config).interpolate("{nope}"), "{nope}");
    }
}
