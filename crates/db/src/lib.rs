//! Postgres access for verification records.
//!
//! Connections are opened per call with [`connect`] and closed by the
//! caller; there is no shared pool.

use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgSslMode};
use sqlx::{Connection, PgConnection};

pub mod models;
pub mod repositories;

/// Default Postgres port when `DB_PORT` is not set.
const DEFAULT_DB_PORT: u16 = 5432;

/// Default connect timeout when `DB_CONNECT_TIMEOUT_SECS` is not set.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Connection settings for the verification database.
#[derive(Clone)]
pub struct DbConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub name: String,
    pub password: String,
    /// Upper bound on establishing a connection.
    pub connect_timeout: Duration,
}

impl DbConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable      | Default     |
    /// |---------------|-------------|
    /// | `DB_HOST`     | `localhost` |
    /// | `DB_PORT`     | `5432`      |
    /// | `DB_USER`     | `postgres`  |
    /// | `DB_NAME`     | `postgres`  |
    /// | `DB_PASSWORD` | empty       |
    /// | `DB_CONNECT_TIMEOUT_SECS` | `5` |
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("DB_HOST").unwrap_or_else(|_| "localhost".into()),
            port: std::env::var("DB_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_DB_PORT),
            user: std::env::var("DB_USER").unwrap_or_else(|_| "postgres".into()),
            name: std::env::var("DB_NAME").unwrap_or_else(|_| "postgres".into()),
            password: std::env::var("DB_PASSWORD").unwrap_or_default(),
            connect_timeout: std::env::var("DB_CONNECT_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_CONNECT_TIMEOUT),
        }
    }

    /// Connection options with TLS disabled.
    pub fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .database(&self.name)
            .password(&self.password)
            .ssl_mode(PgSslMode::Disable)
    }
}

impl std::fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("name", &self.name)
            .field("connect_timeout", &self.connect_timeout)
            .finish_non_exhaustive()
    }
}

/// Open a single connection. The caller owns it and should `close()` it.
pub async fn connect(config: &DbConfig) -> Result<PgConnection, sqlx::Error> {
    connect_with(&config.connect_options(), config.connect_timeout).await
}

/// Open a single connection, giving up after `timeout`.
///
/// An elapsed timeout is reported as an `Io` error of kind `TimedOut`.
pub async fn connect_with(
    options: &PgConnectOptions,
    timeout: Duration,
) -> Result<PgConnection, sqlx::Error> {
    match tokio::time::timeout(timeout, PgConnection::connect_with(options)).await {
        Ok(result) => result,
        Err(_) => Err(sqlx::Error::Io(std::io::Error::new(
            std::io::ErrorKind::TimedOut,
            format!("database connect timed out after {timeout:?}"),
        ))),
    }
}

/// Verify the connection can execute a trivial query.
pub async fn health_check(conn: &mut PgConnection) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(conn).await?;
    Ok(())
}

/// Apply pending migrations from `db/migrations`.
pub async fn run_migrations(conn: &mut PgConnection) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../db/migrations").run(conn).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_omits_password() {
        let config = DbConfig {
            host: "db".into(),
            port: 5432,
            user: "app".into(),
            name: "verify".into(),
            password: "hunter2".into(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        };
        let out = format!("{config:?}");
        assert!(out.contains("db"));
        assert!(!out.contains("hunter2"));
    }

    #[test]
    fn connect_options_carry_host_and_database() {
        let config = DbConfig {
            host: "db.internal".into(),
            port: 6543,
            user: "app".into(),
            name: "verify".into(),
            password: String::new(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        };
        let opts = config.connect_options();
        assert_eq!(opts.get_host(), "db.internal");
        assert_eq!(opts.get_port(), 6543);
        assert_eq!(opts.get_database(), Some("verify"));
        assert_eq!(opts.get_username(), "app");
    }

    /// A server that accepts the TCP connection but never answers the
    /// startup handshake must not hang the caller.
    #[tokio::test]
    async fn connect_gives_up_on_unresponsive_server() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let _accept = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let config = DbConfig {
            host: "127.0.0.1".into(),
            port,
            user: "app".into(),
            name: "verify".into(),
            password: String::new(),
            connect_timeout: Duration::from_millis(200),
        };

        let err = connect(&config).await.unwrap_err();
        assert!(
            matches!(&err, sqlx::Error::Io(e) if e.kind() == std::io::ErrorKind::TimedOut),
            "expected timeout, got {err}"
        );
    }
}
