//! Tests for `AppError` → HTTP response mapping.
//!
//! These call `IntoResponse` directly on `AppError` values; no server needed.

use assert_matches::assert_matches;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::TimeZone;
use http_body_util::BodyExt;
use verimail_api::error::AppError;
use verimail_core::VerificationRecord;
use verimail_events::{DispatchError, EventDecoder, PersistError, VerificationError};

/// Helper: convert an `AppError` into its status code and parsed JSON body.
async fn error_to_response(err: AppError) -> (StatusCode, serde_json::Value) {
    let response = err.into_response();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    (status, json)
}

#[tokio::test]
async fn bad_request_returns_400() {
    let (status, json) = error_to_response(AppError::BadRequest("no message".into())).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "BAD_REQUEST");
    assert_eq!(json["error"], "no message");
}

#[tokio::test]
async fn decode_error_returns_400() {
    let decode_err = EventDecoder::decode(b"{").unwrap_err();
    let err = AppError::from(VerificationError::from(decode_err));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "DECODE_ERROR");
}

#[tokio::test]
async fn config_fault_returns_502() {
    let err = AppError::from(VerificationError::from(DispatchError::Config(
        "SENDGRID_API_KEY is not set",
    )));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json["code"], "DISPATCH_ERROR");
    assert_eq!(
        json["error"],
        "Email delivery not configured: SENDGRID_API_KEY is not set"
    );
}

#[tokio::test]
async fn sent_not_recorded_returns_500_with_record_details() {
    let expiry = chrono::Utc.with_ymd_and_hms(2024, 3, 1, 12, 2, 0).unwrap();
    let err = AppError::from(VerificationError::SentNotRecorded {
        record: VerificationRecord {
            email: "user@example.com".into(),
            token: "abc123".into(),
            expiry,
        },
        source: PersistError::insert(sqlx::Error::RowNotFound),
    });
    assert_matches!(&err, AppError::Verification(e) if e.email_sent());

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["code"], "SENT_NOT_RECORDED");
    assert_eq!(json["email"], "user@example.com");
    assert_eq!(json["expiry"], "2024-03-01T12:02:00Z");
    assert!(json["error"].as_str().unwrap().contains("insert phase"));
}

#[tokio::test]
async fn internal_error_returns_500() {
    let (status, json) = error_to_response(AppError::Internal("task cancelled".into())).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["code"], "INTERNAL_ERROR");
}
