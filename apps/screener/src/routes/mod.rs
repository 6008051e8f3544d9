pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower::limit::ConcurrencyLimitLayer;

use crate::screening::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let max_upload_bytes = state.config.max_upload_bytes;
    let max_concurrent = state.config.max_concurrent_analyses;

    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/api/v1/analyze",
            post(handlers::handle_analyze).layer(ConcurrencyLimitLayer::new(max_concurrent)),
        )
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state)
}
