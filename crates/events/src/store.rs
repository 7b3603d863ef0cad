//! Durable record of issued tokens.
//!
//! [`PgRecordStore`] opens one connection per insert and closes it before
//! returning, whatever the outcome. Nothing is pooled between invocations.
//! Connecting is bounded by the configured connect timeout.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::PgConnectOptions;
use sqlx::Connection;
use verimail_core::VerificationRecord;
use verimail_db::models::email_verification::CreateEmailVerification;
use verimail_db::repositories::EmailVerificationRepo;
use verimail_db::DbConfig;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Which step of a persist call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistPhase {
    Connect,
    Insert,
}

impl fmt::Display for PersistPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connect => f.write_str("connect"),
            Self::Insert => f.write_str("insert"),
        }
    }
}

/// Error type for record persistence failures.
#[derive(Debug, thiserror::Error)]
#[error("Record store {phase} failed: {source}")]
pub struct PersistError {
    pub phase: PersistPhase,
    #[source]
    pub source: sqlx::Error,
}

impl PersistError {
    pub fn connect(source: sqlx::Error) -> Self {
        Self {
            phase: PersistPhase::Connect,
            source,
        }
    }

    pub fn insert(source: sqlx::Error) -> Self {
        Self {
            phase: PersistPhase::Insert,
            source,
        }
    }
}

// ---------------------------------------------------------------------------
// RecordStore
// ---------------------------------------------------------------------------

/// Writes one verification record. Inserts are unconditional.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn insert(&self, record: &VerificationRecord) -> Result<(), PersistError>;
}

/// Postgres-backed [`RecordStore`] writing to `email_verifications`.
pub struct PgRecordStore {
    options: PgConnectOptions,
    connect_timeout: Duration,
}

impl PgRecordStore {
    pub fn new(config: &DbConfig) -> Self {
        Self::with_options(config.connect_options(), config.connect_timeout)
    }

    /// Build a store from ready-made connect options.
    pub fn with_options(options: PgConnectOptions, connect_timeout: Duration) -> Self {
        Self {
            options,
            connect_timeout,
        }
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn insert(&self, record: &VerificationRecord) -> Result<(), PersistError> {
        let mut conn = verimail_db::connect_with(&self.options, self.connect_timeout)
            .await
            .map_err(PersistError::connect)?;

        let result = EmailVerificationRepo::insert(
            &mut conn,
            &CreateEmailVerification {
                email: &record.email,
                token: &record.token,
                expiry_time: record.expiry,
            },
        )
        .await;

        if let Err(e) = conn.close().await {
            tracing::warn!(error = %e, "Failed to close record store connection");
        }

        let row = result.map_err(PersistError::insert)?;
        tracing::info!(
            id = row.id,
            email = %row.email,
            expiry = %row.expiry_time,
            "Email verification record inserted"
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn persist_error_display_includes_phase() {
        let err = PersistError::insert(sqlx::Error::RowNotFound);
        assert!(err.to_string().starts_with("Record store insert failed"));
        assert_eq!(err.phase, PersistPhase::Insert);
    }

    #[tokio::test]
    async fn unreachable_database_fails_in_connect_phase() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let store = PgRecordStore::new(&DbConfig {
            host: "127.0.0.1".into(),
            port,
            user: "postgres".into(),
            name: "postgres".into(),
            password: String::new(),
            connect_timeout: verimail_db::DEFAULT_CONNECT_TIMEOUT,
        });

        let err = store.insert(&record()).await.unwrap_err();
        assert_matches!(err.phase, PersistPhase::Connect);
    }

    #[tokio::test]
    async fn stalled_handshake_fails_in_connect_phase() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let _accept = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let options = PgConnectOptions::new()
            .host("127.0.0.1")
            .port(port)
            .username("postgres")
            .database("postgres");
        let store = PgRecordStore::with_options(options, Duration::from_millis(200));

        let started = std::time::Instant::now();
        let err = store.insert(&record()).await.unwrap_err();
        assert_matches!(err.phase, PersistPhase::Connect);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    fn record() -> VerificationRecord {
        VerificationRecord {
            email: "user@example.com".into(),
            token: "abc123".into(),
            expiry: chrono::Utc::now(),
        }
    }
}
