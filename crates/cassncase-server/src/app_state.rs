// ABOUTME: Shared application state for the cassncase HTTP server.
// ABOUTME: Wraps the opened OrderLedger so every handler works against the same store.

use std::sync::Arc;

use cassncase_store::OrderLedger;

/// Shared application state accessible by all Axum handlers.
pub struct AppState {
    pub ledger: OrderLedger,
}

/// Type alias for the Arc-wrapped state used with Axum's State extractor.
pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(ledger: OrderLedger) -> Self {
        Self { ledger }
    }
}
