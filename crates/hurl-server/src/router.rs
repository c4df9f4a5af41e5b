use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handler;
use crate::state::AppState;

/// Build the application router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/sync", post(handler::api_sync))
        .route("/api/search", post(handler::api_search))
        .route("/api/info", post(handler::api_info))
        .route("/v1/health", get(handler::health_handler))
        .route("/v1/branches", get(handler::branches_handler))
        .route("/v1/packages", get(handler::packages_handler))
        .route("/v1/branch/*branch", get(handler::branch_handler))
        .route("/v1/branch-log/*branch", get(handler::branch_log_handler))
        .route("/v1/package/*ident", get(handler::package_handler))
        .route("/v1/package-log/*ident", get(handler::package_log_handler))
        .route("/v1/package-branches/:name", get(handler::package_branches_handler))
        .route("/v1/file/*path", get(handler::file_handler))
        .route("/v1/readme/*branch", get(handler::readme_handler))
        .route("/v1/search", get(handler::search_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
