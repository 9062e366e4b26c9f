// src/core/style_vars.rs

//! Convierte los ficheros de variables de Calcite (Sass) a variables Less.

use regex::Regex;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StyleVarsError {
    #[error("Literal decimal mal formado en '{call}'")]
    MalformedFraction { call: String },
    #[error("La llamada '{call}' no tiene argumento de color")]
    MissingColor { call: String },
    #[error("Expresión regular inválida: {0}")]
    Regex(#[from] regex::Error),
}

type StyleVarsResult<T> = Result<T, StyleVarsError>;

/// Los dos identificadores de Calcite cuya grafía cambia entre versiones.
const IDENTIFIER_FIXES: [(&str, &str); 2] = [
    ("Calcite-Highlight-Blue-350", "Calcite_Highlight_Blue_350"),
    ("Calcite_Highlight-Blue", "Calcite_Highlight_Blue"),
];

/// Aplica las reglas en orden, una sola pasada cada una, sobre el texto completo.
/// Los dos cambios de identificador solo tocan la primera aparición, así que una segunda
/// pasada puede seguir cambiando el texto.
pub fn sass_to_less(content: &str) -> StyleVarsResult<String> {
    let mut text = content.replace('$', "@");
    text = text.replace(" !default", "");
    for (from, to) in IDENTIFIER_FIXES {
        text = text.replacen(from, to, 1);
    }

    let fade_in = Regex::new(r"(?:fade-in\(|fade_in\().+?\.[0-9]+\s*\)")?;
    text = replace_all_fallible(&fade_in, &text, |call| rewrite_call(call, "fadein"))?;

    let rgba = Regex::new(r"rgba\(#(?:[0-9a-fA-F]{3}){1,2},\s*0*\.[0-9]+\s*\)")?;
    replace_all_fallible(&rgba, &text, |call| rewrite_call(call, "fade"))
}

/// `fn(color, .35)` → `<name>(color, 35%)`.
fn rewrite_call(call: &str, name: &str) -> StyleVarsResult<String> {
    let percent = fraction_to_percent(call)?;
    let open = call.find('(').ok_or_else(|| StyleVarsError::MissingColor {
        call: call.to_string(),
    })?;
    let comma = call.find(',').ok_or_else(|| StyleVarsError::MissingColor {
        call: call.to_string(),
    })?;
    Ok(format!("{}{} {}%)", name, &call[open..=comma], percent))
}

/// Toma el decimal 0-1 final de la llamada y lo pasa a un porcentaje entero redondeado.
fn fraction_to_percent(call: &str) -> StyleVarsResult<i64> {
    let malformed = || StyleVarsError::MalformedFraction {
        call: call.to_string(),
    };
    let dot = call.rfind('.').ok_or_else(malformed)?;
    let close = call.rfind(')').ok_or_else(malformed)?;
    if close < dot {
        return Err(malformed());
    }
    let fraction: f64 = call[dot..close].trim().parse().map_err(|_| malformed())?;
    Ok((fraction * 100.0).round() as i64)
}

fn replace_all_fallible<F>(re: &Regex, text: &str, mut rewrite: F) -> StyleVarsResult<String>
where
    F: FnMut(&str) -> StyleVarsResult<String>,
{
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for m in re.find_iter(text) {
        out.push_str(&text[last..m.start()]);
        out.push_str(&rewrite(m.as_str())?);
        last = m.end();
    }
    out.push_str(&text[last..]);
    Ok(out)
}

/// `_variables.scss` → `variables.less`.
pub fn less_file_name(dest: &str, src: &str) -> String {
    let file = src.rsplit('/').next().unwrap_or(src);
    let stem = match file.rfind('.') {
        Some(dot) => &file[..dot],
        None => file,
    };
    let stem = stem.strip_prefix('_').unwrap_or(stem);
    format!("{}{}.less", dest, stem)
}
