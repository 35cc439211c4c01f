// ABOUTME: Route definitions for the cassncase HTTP API.
// ABOUTME: Assembles all API routes into a single Axum Router with shared state and request tracing.

use axum::Router;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use crate::api;
use crate::app_state::SharedState;

/// Build the complete Axum router with all routes and shared state.
pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/orders", get(api::orders::list_orders))
        .route("/api/orders/{id}/state", get(api::orders::get_order_state))
        .route("/api/orders/{id}/actions", post(api::actions::record_action))
        .route("/api/search", get(api::orders::search))
        .route("/api/search/all", get(api::orders::search_all))
        .route("/api/logs", get(api::orders::list_logs))
        .route("/api/admin/import", post(api::admin::import_orders))
        .route("/api/admin/clear", post(api::admin::clear_all))
        .route("/api/admin/audit", get(api::admin::audit))
        .route("/api/events/stream", get(api::stream::event_stream))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check handler. Returns 200 OK with a simple JSON body.
async fn health() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({ "status": "ok" }))
}
