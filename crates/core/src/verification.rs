//! Verification request and record types.

use std::fmt;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

/// Default validity window for an issued token, in seconds.
pub const DEFAULT_VALIDITY_WINDOW_SECS: i64 = 120;

/// A request to send one verification email, decoded from an inbound event.
///
/// Both fields are required on the wire; a payload missing either one is
/// rejected at decode time.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationRequest {
    /// Recipient address.
    pub email: String,
    /// Opaque token issued upstream.
    #[serde(rename = "verificationToken")]
    pub token: String,
}

impl VerificationRequest {
    pub fn new(email: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            token: token.into(),
        }
    }
}

// The token is a bearer credential until it expires; keep it out of logs.
impl fmt::Debug for VerificationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerificationRequest")
            .field("email", &self.email)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// A record of one issued token, written after the provider accepted the send.
#[derive(Clone, PartialEq, Eq)]
pub struct VerificationRecord {
    pub email: String,
    pub token: String,
    /// Absolute time after which the token is no longer valid.
    pub expiry: Timestamp,
}

impl VerificationRecord {
    /// Build the record for a request dispatched at `sent_at`.
    pub fn issue(request: &VerificationRequest, sent_at: Timestamp, validity: Duration) -> Self {
        Self {
            email: request.email.clone(),
            token: request.token.clone(),
            expiry: sent_at + validity,
        }
    }
}

impl fmt::Debug for VerificationRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerificationRecord")
            .field("email", &self.email)
            .field("token", &"<redacted>")
            .field("expiry", &self.expiry)
            .finish()
    }
}

/// Build the link embedded in the verification email.
///
/// The token is appended verbatim; upstream tokens are URL-safe.
pub fn verification_url(base_url: &str, token: &str) -> String {
    format!("{base_url}?token={token}")
}
