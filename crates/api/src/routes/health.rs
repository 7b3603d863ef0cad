use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;
use sqlx::Connection;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Overall service status.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    /// Whether the database is reachable.
    pub db_healthy: bool,
}

/// GET /health -- returns service and database health.
///
/// Opens and closes its own connection; there is no pool to inspect.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let db_healthy = match verimail_db::connect(&state.db).await {
        Ok(mut conn) => {
            let ok = verimail_db::health_check(&mut conn).await.is_ok();
            let _ = conn.close().await;
            ok
        }
        Err(e) => {
            tracing::warn!(error = %e, "Health check could not reach database");
            false
        }
    };

    let status = if db_healthy { "ok" } else { "degraded" };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        db_healthy,
    })
}

/// Mount health check routes.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
