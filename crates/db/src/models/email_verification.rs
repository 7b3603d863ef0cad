//! Email verification model and DTOs.

use sqlx::FromRow;
use verimail_core::types::{DbId, Timestamp};

/// A row from the `email_verifications` table.
#[derive(Debug, Clone, FromRow)]
pub struct EmailVerification {
    pub id: DbId,
    pub email: String,
    /// The verification token (column name kept from the original schema).
    pub uuid: String,
    pub expiry_time: Timestamp,
    pub created_at: Timestamp,
}

/// DTO for inserting a new verification row.
pub struct CreateEmailVerification<'a> {
    pub email: &'a str,
    pub token: &'a str,
    pub expiry_time: Timestamp,
}
