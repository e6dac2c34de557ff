//! Axum router: the health probe plus the configured webhook route.
//!
//! The webhook route accepts both GET and POST; everything else about the
//! request is judged by the gateway.

use axum::Router;
use axum::routing::get;
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

pub const HEALTH_PATH: &str = "/health";

pub fn build_router(state: AppState) -> Router {
    let webhook_path = normalize_path(&state.config.server.path);

    Router::new()
        .route(HEALTH_PATH, get(handlers::health::health))
        .route(
            &webhook_path,
            get(handlers::webhook::receive).post(handlers::webhook::receive),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Route path for a configured webhook path: trimmed, with a leading `/`.
pub fn normalize_path(path: &str) -> String {
    let trimmed = path.trim();
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}
