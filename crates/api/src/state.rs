use std::sync::Arc;

use verimail_db::DbConfig;
use verimail_events::Orchestrator;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; everything is behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Runs one verification event per push request.
    pub orchestrator: Arc<Orchestrator>,
    /// Used by the health check to open a short-lived connection.
    pub db: Arc<DbConfig>,
}
