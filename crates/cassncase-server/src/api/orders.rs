// ABOUTME: Read-side API handlers: order listing, computed state, lookup search, and the action log.
// ABOUTME: Every state returned here is recomputed from the log on request.

use axum::Json;
use axum::extract::{Path, Query, State};
use cassncase_core::{ComputedState, LogEntry, MasterRecord};
use serde::Deserialize;

use crate::api::ApiError;
use crate::app_state::SharedState;

/// Query string for the search endpoints.
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
}

/// GET /api/orders - List every master record in order id order.
pub async fn list_orders(
    State(state): State<SharedState>,
) -> Result<Json<Vec<MasterRecord>>, ApiError> {
    Ok(Json(state.ledger.list_orders().await?))
}

/// GET /api/orders/{id}/state - Compute the current state of one order.
pub async fn get_order_state(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<ComputedState>, ApiError> {
    state
        .ledger
        .compute_state(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("order not found: {}", id)))
}

/// GET /api/search?q= - Resolve a buyer's email, phone, or order id.
pub async fn search(
    State(state): State<SharedState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<ComputedState>, ApiError> {
    state
        .ledger
        .search(&params.q)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("no matching order".to_string()))
}

/// GET /api/search/all?q= - Every order matching the lookup.
pub async fn search_all(
    State(state): State<SharedState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<ComputedState>>, ApiError> {
    Ok(Json(state.ledger.search_all(&params.q).await?))
}

/// GET /api/logs - All log entries in insertion order.
pub async fn list_logs(State(state): State<SharedState>) -> Result<Json<Vec<LogEntry>>, ApiError> {
    Ok(Json(state.ledger.list_logs().await?))
}

#[cfg(test)]
mod tests {
    use crate::app_state::{AppState, SharedState};
    use crate::routes::create_router;
    use axum::body::Body;
    use axum::http::StatusCode;
    use cassncase_store::{BuiltinSeed, OrderLedger};
    use http::Request;
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn test_state() -> SharedState {
        let ledger = OrderLedger::open_in_memory(&BuiltinSeed).await.unwrap();
        Arc::new(AppState::new(ledger))
    }

    async fn get(state: &SharedState, uri: &str) -> (StatusCode, serde_json::Value) {
        let resp = create_router(Arc::clone(state))
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn list_orders_returns_seeded_records() {
        let state = test_state().await;
        let (status, json) = get(&state, "/api/orders").await;

        assert_eq!(status, StatusCode::OK);
        let orders = json.as_array().unwrap();
        assert_eq!(orders.len(), 10);
        assert_eq!(orders[0]["order_id"], "CN-0001");
    }

    #[tokio::test]
    async fn order_state_is_flat_record() {
        let state = test_state().await;
        let (status, json) = get(&state, "/api/orders/CN-0003/state").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["order_id"], "CN-0003");
        assert_eq!(json["status"], "Pending");
        assert!(json.get("anomalies").is_none());
    }

    #[tokio::test]
    async fn unknown_order_is_404() {
        let state = test_state().await;
        let (status, json) = get(&state, "/api/orders/CN-9999/state").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(json["error"].as_str().unwrap().contains("CN-9999"));
    }

    #[tokio::test]
    async fn search_by_phone_finds_order() {
        let state = test_state().await;
        let (status, json) = get(&state, "/api/search?q=0917-123-4567").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["order_id"], "CN-0001");
    }

    #[tokio::test]
    async fn search_without_match_is_404() {
        let state = test_state().await;
        let (status, _) = get(&state, "/api/search?q=nobody%40example.com").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = get(&state, "/api/search").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn search_all_lists_candidates() {
        let state = test_state().await;
        let (status, json) = get(&state, "/api/search/all?q=CN-0005").await;

        assert_eq!(status, StatusCode::OK);
        let states = json.as_array().unwrap();
        assert_eq!(states.len(), 1);
        assert_eq!(states[0]["order_id"], "CN-0005");
    }

    #[tokio::test]
    async fn logs_start_empty() {
        let state = test_state().await;
        let (status, json) = get(&state, "/api/logs").await;

        assert_eq!(status, StatusCode::OK);
        assert!(json.as_array().unwrap().is_empty());
    }
}
