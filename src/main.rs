use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;

use event_rag_backend::core::config::AppPaths;
use event_rag_backend::core::logging;
use event_rag_backend::server;
use event_rag_backend::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(err) = dotenvy::dotenv() {
        if !err.not_found() {
            eprintln!("Failed to load .env: {}", err);
        }
    }

    let paths = Arc::new(AppPaths::new());
    logging::init(&paths);
    let state = AppState::initialize(paths).await?;

    if state.settings.ingest.build_on_startup {
        state.ingestor.warm_up().await;
    }

    let bind_addr = format!("{}:{}", state.settings.server.host, state.settings.server.port);
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    let addr = listener.local_addr()?;
    tracing::info!("Server running at http://{}", addr);

    let app: Router = server::router::router(Arc::clone(&state));
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("Server error")?;

    Ok(())
}
