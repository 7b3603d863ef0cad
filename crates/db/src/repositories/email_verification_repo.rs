//! Repository for the `email_verifications` table.

use sqlx::PgConnection;

use crate::models::email_verification::{CreateEmailVerification, EmailVerification};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, email, uuid, expiry_time, created_at";

/// Insert and lookup for issued verification tokens.
///
/// Rows are append-only: there is no update or upsert.
pub struct EmailVerificationRepo;

impl EmailVerificationRepo {
    /// Insert a new row, returning it.
    pub async fn insert(
        conn: &mut PgConnection,
        input: &CreateEmailVerification<'_>,
    ) -> Result<EmailVerification, sqlx::Error> {
        let query = format!(
            "INSERT INTO email_verifications (email, uuid, expiry_time)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, EmailVerification>(&query)
            .bind(input.email)
            .bind(input.token)
            .bind(input.expiry_time)
            .fetch_one(conn)
            .await
    }

    /// All rows for an address, oldest first.
    pub async fn list_by_email(
        conn: &mut PgConnection,
        email: &str,
    ) -> Result<Vec<EmailVerification>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM email_verifications
             WHERE email = $1
             ORDER BY id"
        );
        sqlx::query_as::<_, EmailVerification>(&query)
            .bind(email)
            .fetch_all(conn)
            .await
    }
}
