use crate::api::{handlers, AppState};
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};

/// Build the main API router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health endpoints
        .route("/health", get(handlers::health_check))
        .route("/health/live", get(handlers::health_check))
        .route("/health/ready", get(handlers::health_check))
        // Metrics
        .route("/metrics", get(handlers::metrics_export))
        // Item submission and results
        .route("/v1/boms/:bom_id/items", post(handlers::submit_items))
        .route(
            "/v1/boms/:bom_id/items/:item_id",
            get(handlers::get_item_result),
        )
        // Progress: snapshot + live stream
        .route("/v1/boms/:bom_id/status", get(handlers::bom_status))
        .route("/v1/boms/:bom_id/progress", get(handlers::stream_progress))
        // Catalog lookups
        .route("/v1/components", get(handlers::find_component))
        .route("/v1/components/:id", get(handlers::get_component))
        // Add state
        .with_state(state)
        // Add middleware
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(true))
                .on_response(DefaultOnResponse::new().include_headers(true)),
        )
        .layer(CorsLayer::permissive())
}
