//! Push delivery of verification events.

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Envelope the trigger infrastructure POSTs around each message.
#[derive(Debug, Deserialize)]
pub struct PushEnvelope {
    pub message: PushMessage,
    #[serde(default)]
    pub subscription: Option<String>,
}

/// One published message. `data` is the verification payload.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushMessage {
    #[serde(default)]
    pub data: String,
    #[serde(default)]
    pub message_id: Option<String>,
    #[serde(default)]
    pub attributes: HashMap<String, String>,
    #[serde(default)]
    pub publish_time: Option<String>,
}

impl PushEnvelope {
    /// Identifier of the resource that triggered the delivery, for logs.
    pub fn resource(&self) -> &str {
        self.subscription
            .as_deref()
            .or(self.message.message_id.as_deref())
            .unwrap_or("unknown")
    }
}

/// POST /pubsub/verification
///
/// Acknowledges with 204 once the email is sent and recorded. Any other
/// outcome returns an error status so the message is redelivered.
///
/// The invocation runs on its own task. A request timeout or a client
/// disconnect drops this handler future, but the task still finishes and
/// logs its outcome, so a sent email is never left without its insert
/// attempt.
pub async fn receive(State(state): State<AppState>, body: Bytes) -> AppResult<StatusCode> {
    let envelope: PushEnvelope = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("Invalid push envelope: {e}")))?;

    tracing::debug!(
        message_id = ?envelope.message.message_id,
        publish_time = ?envelope.message.publish_time,
        attributes = envelope.message.attributes.len(),
        "Push message received"
    );

    let orchestrator = Arc::clone(&state.orchestrator);
    let resource = envelope.resource().to_string();
    let payload = envelope.message.data.into_bytes();
    let invocation =
        tokio::spawn(async move { orchestrator.handle(&resource, &payload).await });

    match invocation.await {
        Ok(outcome) => {
            outcome?;
        }
        Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
        Err(e) => return Err(AppError::Internal(format!("Invocation task failed: {e}"))),
    }

    Ok(StatusCode::NO_CONTENT)
}
