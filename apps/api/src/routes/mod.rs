pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::analysis::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Analysis API
        .route("/api/v1/analysis", post(handlers::handle_analyze))
        .route(
            "/api/v1/analysis/results",
            get(handlers::handle_list_results),
        )
        .route(
            "/api/v1/analysis/results/:name",
            get(handlers::handle_get_result),
        )
        .with_state(state)
}
