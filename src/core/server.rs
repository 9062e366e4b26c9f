// src/core/server.rs

use axum::Router;
use tower_http::services::ServeDir;

use crate::constants::DEPLOY_DIR;
use crate::models::ResolvedConfig;

/// Sirve `deploy/` (o el árbol de trabajo si aún no hay build) hasta que maten el proceso.
pub fn serve(config: &ResolvedConfig) -> std::io::Result<()> {
    let deploy = config.root.join(DEPLOY_DIR);
    let dir = if deploy.is_dir() {
        deploy
    } else {
        log::warn!("No existe {:?}; se sirve la raíz del proyecto.", deploy);
        config.root.clone()
    };
    let addr = format!("{}:{}", config.server.hostname, config.server.port);

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async move {
        let app = Router::new().fallback_service(ServeDir::new(&dir));
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        println!("\nSirviendo {} en http://{}", dir.display(), addr);
        axum::serve(listener, app).await
    })
}
