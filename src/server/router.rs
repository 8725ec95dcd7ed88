use axum::http::{header, HeaderName, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::history::CONVERSATION_ID_HEADER;
use crate::server::handlers::{config, health, ingest, query, sessions};
use crate::server::ws::handler::ws_handler;
use crate::state::AppState;

/// Creates the application router with all routes and middleware.
///
/// - CORS and request tracing
/// - Ingestion, query and conversation reset endpoints
/// - Health and redacted configuration
/// - WebSocket chat at `/ws`
/// - Static files from `public/` for anything else
pub fn router(state: Arc<AppState>) -> Router {
    let cors_layer = build_cors_layer(&state.settings.server.cors_allowed_origins);
    let static_files = ServeDir::new(&state.paths.public_dir);

    Router::new()
        .route(
            "/pre_processing_for_embedding",
            post(ingest::pre_processing_for_embedding),
        )
        .route("/query_with_embedding", post(query::query_with_embedding))
        .route("/reset_conversation", post(sessions::reset_conversation))
        .route("/health", get(health::health))
        .route("/api/config", get(config::get_config))
        .route("/ws", get(ws_handler))
        .fallback_service(static_files)
        .with_state(state)
        .layer(cors_layer)
        .layer(TraceLayer::new_for_http())
}

fn build_cors_layer(configured: &[String]) -> CorsLayer {
    let origins = resolve_allowed_origins(configured);
    let allow_origin = if origins.is_empty() {
        AllowOrigin::mirror_request()
    } else {
        AllowOrigin::list(
            origins
                .into_iter()
                .filter_map(|origin| HeaderValue::from_str(&origin).ok())
                .collect::<Vec<_>>(),
        )
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::ACCEPT,
            header::CONTENT_TYPE,
            HeaderName::from_static(CONVERSATION_ID_HEADER),
        ])
}

/// Empty means any origin; so does a `"*"` entry.
fn resolve_allowed_origins(configured: &[String]) -> Vec<String> {
    let origins: Vec<String> = configured
        .iter()
        .map(|item| item.trim())
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect();

    if origins.iter().any(|origin| origin == "*") {
        return Vec::new();
    }
    origins
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_or_empty_allows_any_origin() {
        assert!(resolve_allowed_origins(&[]).is_empty());
        assert!(resolve_allowed_origins(&["http://a.test".to_string(), "*".to_string()]).is_empty());
    }

    #[test]
    fn explicit_origins_are_trimmed() {
        let origins = resolve_allowed_origins(&[" http://localhost:5173 ".to_string(), "".to_string()]);
        assert_eq!(origins, vec!["http://localhost:5173"]);
    }
}
