//! Inbound payload decoding.
//!
//! Publishers are inconsistent about encoding: some send the JSON body
//! base64-encoded, some send it raw. [`EventDecoder`] accepts both.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use verimail_core::VerificationRequest;

/// Error returned when a payload is not a valid verification request.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The payload (after optional base64 decoding) is not the expected JSON.
    #[error("Malformed verification payload: {0}")]
    Json(#[from] serde_json::Error),
}

/// Stateless decoder for verification event payloads.
pub struct EventDecoder;

impl EventDecoder {
    /// Decode a raw payload into a [`VerificationRequest`].
    ///
    /// Base64 (standard alphabet, line breaks ignored) is tried first. If
    /// that fails the bytes are parsed as JSON directly.
    pub fn decode(payload: &[u8]) -> Result<VerificationRequest, DecodeError> {
        let compact: Vec<u8> = payload
            .iter()
            .copied()
            .filter(|b| *b != b'\r' && *b != b'\n')
            .collect();

        let data = match STANDARD.decode(&compact) {
            Ok(decoded) => {
                tracing::debug!(
                    data = %String::from_utf8_lossy(&decoded),
                    "Received base64 encoded payload"
                );
                decoded
            }
            Err(e) => {
                tracing::warn!(error = %e, "Assuming payload is not base64 encoded");
                payload.to_vec()
            }
        };

        serde_json::from_slice(&data).map_err(|e| {
            tracing::error!(error = %e, "Failed to parse verification payload");
            DecodeError::from(e)
        })
    }
}
