// ABOUTME: Admin API handlers: bulk import of master records, clearing the store, and the mirror audit.
// ABOUTME: Import and clear publish a change notice through the ledger.

use axum::Json;
use axum::extract::State;
use cassncase_core::ImportRecord;
use cassncase_store::AuditReport;
use serde::Serialize;

use crate::api::ApiError;
use crate::app_state::SharedState;

/// Response body after a bulk import.
#[derive(Debug, Serialize)]
pub struct ImportResponse {
    pub imported: usize,
}

/// POST /api/admin/import - Upsert a JSON array of buyer records.
pub async fn import_orders(
    State(state): State<SharedState>,
    Json(rows): Json<Vec<serde_json::Value>>,
) -> Result<Json<ImportResponse>, ApiError> {
    let submitted = rows.len();
    let imported = state
        .ledger
        .bulk_import(ImportRecord::decode_rows(rows))
        .await?;
    tracing::info!("admin import wrote {} of {} records", imported, submitted);
    Ok(Json(ImportResponse { imported }))
}

/// POST /api/admin/clear - Delete every order and log entry.
pub async fn clear_all(State(state): State<SharedState>) -> Result<Json<serde_json::Value>, ApiError> {
    state.ledger.clear_all().await?;
    Ok(Json(serde_json::json!({ "status": "cleared" })))
}

/// GET /api/admin/audit - Compare each master record with a fold of its log.
pub async fn audit(State(state): State<SharedState>) -> Result<Json<AuditReport>, ApiError> {
    Ok(Json(state.ledger.audit().await?))
}
