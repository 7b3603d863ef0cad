use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use verimail_events::VerificationError;

/// Application-level error type for HTTP handlers.
///
/// Every variant maps to a non-2xx status so the trigger redelivers the
/// event. Failures after the email went out get their own code so they
/// can be reconciled instead of blindly replayed.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A failed verification invocation.
    #[error(transparent)]
    Verification(#[from] VerificationError),

    /// The push envelope itself could not be read.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The invocation task ended without an outcome.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = match &self {
            AppError::BadRequest(msg) => json!({
                "error": msg,
                "code": "BAD_REQUEST",
            }),
            AppError::Internal(msg) => json!({
                "error": msg,
                "code": "INTERNAL_ERROR",
            }),
            AppError::Verification(VerificationError::Decode(e)) => json!({
                "error": e.to_string(),
                "code": "DECODE_ERROR",
            }),
            AppError::Verification(VerificationError::Dispatch(e)) => json!({
                "error": e.to_string(),
                "code": "DISPATCH_ERROR",
            }),
            AppError::Verification(VerificationError::SentNotRecorded { record, source }) => {
                json!({
                    "error": format!("Verification email sent but not recorded ({} phase)", source.phase),
                    "code": "SENT_NOT_RECORDED",
                    "email": record.email,
                    "expiry": record.expiry,
                })
            }
        };

        (self.status(), axum::Json(body)).into_response()
    }
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Verification(VerificationError::Decode(_)) => StatusCode::BAD_REQUEST,
            AppError::Verification(VerificationError::Dispatch(_)) => StatusCode::BAD_GATEWAY,
            AppError::Verification(VerificationError::SentNotRecorded { .. }) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}
