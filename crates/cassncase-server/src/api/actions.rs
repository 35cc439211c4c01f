// ABOUTME: Action submission handler: records a CONFIRM or UPDATE against an order.
// ABOUTME: Returns the stored log entry; observers are notified by the ledger after commit.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use cassncase_core::{ActionSource, ActionType, Changes, LogEntry};
use serde::Deserialize;

use crate::api::ApiError;
use crate::app_state::SharedState;

/// Request body for recording an action.
#[derive(Debug, Deserialize)]
pub struct RecordActionRequest {
    pub action_type: ActionType,
    #[serde(default)]
    pub changes: Changes,
    #[serde(default)]
    pub source: ActionSource,
}

/// POST /api/orders/{id}/actions - Append an action to an order's log.
pub async fn record_action(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(req): Json<RecordActionRequest>,
) -> Result<(StatusCode, Json<LogEntry>), ApiError> {
    let entry = state
        .ledger
        .record(&id, req.action_type, req.changes, req.source)
        .await?;
    Ok((StatusCode::CREATED, Json(entry)))
}
