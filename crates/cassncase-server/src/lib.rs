// ABOUTME: HTTP server for cassncase, exposing the order ledger as a JSON API with an SSE change stream.
// ABOUTME: Uses Axum with a shared ledger handle; configuration comes from the environment.

pub mod api;
pub mod app_state;
pub mod config;
pub mod routes;

pub use app_state::{AppState, SharedState};
pub use config::{AppConfig, ConfigError};
pub use routes::create_router;
