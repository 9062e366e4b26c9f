// src/constants.rs

/// El archivo opcional con la configuración del build (en la raíz del proyecto).
pub const CONFIG_FILENAME: &str = "storymap.toml";

/// Metadatos del proyecto, usados solo para el banner de licencia.
pub const PACKAGE_FILENAME: &str = "package.json";

/// Nombre de la plantilla dentro de `src/app/storymaps/`.
pub const TPL_NAME: &str = "tpl";

/// Directorio de artefactos intermedios.
pub const BUILD_DIR: &str = "build";

/// Directorio de artefactos finales.
pub const DEPLOY_DIR: &str = "deploy";

/// Puerto por defecto de la tarea `server`.
pub const DEFAULT_SERVER_PORT: u16 = 8081;

/// Intervalo de sondeo por defecto del bucle `watch`, en milisegundos.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

/// Puerto estándar del protocolo LiveReload.
pub const DEFAULT_LIVERELOAD_PORT: u16 = 35729;

/// Marca de la tabla de rutas para "módulo provisto externamente".
pub const EMPTY_SENTINEL: &str = "empty:";

/// Desplazamiento vertical (px) que resta el navegador de secciones al hacer scroll.
pub const SECTION_SCROLL_OFFSET: f64 = 50.0;
