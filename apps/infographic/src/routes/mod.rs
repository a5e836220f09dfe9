pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::infographic::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Infographic API
        .route("/api/v1/infographics", post(handlers::handle_generate))
        .route("/api/v1/infographics/edit", post(handlers::handle_edit))
        .route("/api/v1/graphs", post(handlers::handle_render_graph))
        .route("/api/v1/text/fit", post(handlers::handle_fit_text))
        // Object store passthrough
        .route("/api/v1/blobs/*key", get(handlers::handle_download))
        .with_state(state)
}
