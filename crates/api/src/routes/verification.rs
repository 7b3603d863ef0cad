use axum::routing::post;
use axum::Router;

use crate::handlers::verification;
use crate::state::AppState;

/// Mount the push endpoint for verification events.
pub fn router() -> Router<AppState> {
    Router::new().route("/pubsub/verification", post(verification::receive))
}
