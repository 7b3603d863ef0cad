/// Default validity window for issued tokens.
const DEFAULT_VERIFICATION_TTL_SECS: i64 = verimail_core::verification::DEFAULT_VALIDITY_WINDOW_SECS;

/// Longest accepted validity window (30 days).
pub const MAX_VERIFICATION_TTL_SECS: i64 = 30 * 24 * 60 * 60;

/// Server configuration loaded from environment variables.
///
/// Provider and database settings live in
/// [`EmailConfig`](verimail_events::EmailConfig) and
/// [`DbConfig`](verimail_db::DbConfig).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `8080`).
    pub port: u16,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long an issued token stays valid, in seconds (default: `120`,
    /// range `1..=MAX_VERIFICATION_TTL_SECS`).
    pub verification_ttl_secs: i64,
    /// Apply migrations at startup (default: `false`).
    pub run_migrations: bool,
    /// Emit JSON log lines instead of the human-readable format.
    pub log_json: bool,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default   |
    /// |-------------------------|-----------|
    /// | `HOST`                  | `0.0.0.0` |
    /// | `PORT`                  | `8080`    |
    /// | `REQUEST_TIMEOUT_SECS`  | `30`      |
    /// | `VERIFICATION_TTL_SECS` | `120`     |
    /// | `RUN_MIGRATIONS`        | `false`   |
    /// | `LOG_FORMAT`            | `text`    |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "8080".into())
            .parse()
            .expect("PORT must be a valid u16");

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let verification_ttl_secs = std::env::var("VERIFICATION_TTL_SECS")
            .map(|v| parse_verification_ttl(&v).expect("Invalid VERIFICATION_TTL_SECS"))
            .unwrap_or(DEFAULT_VERIFICATION_TTL_SECS);

        let run_migrations = std::env::var("RUN_MIGRATIONS")
            .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let log_json = std::env::var("LOG_FORMAT")
            .map(|v| v.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        Self {
            host,
            port,
            request_timeout_secs,
            verification_ttl_secs,
            run_migrations,
            log_json,
        }
    }

    /// The validity window as a duration.
    pub fn validity_window(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.verification_ttl_secs)
    }
}

/// Parse a validity window in seconds, rejecting values that are not
/// positive or exceed [`MAX_VERIFICATION_TTL_SECS`].
pub fn parse_verification_ttl(raw: &str) -> Result<i64, String> {
    let secs: i64 = raw
        .trim()
        .parse()
        .map_err(|e| format!("`{raw}` is not a whole number of seconds: {e}"))?;
    if secs <= 0 {
        return Err(format!("{secs} must be positive"));
    }
    if secs > MAX_VERIFICATION_TTL_SECS {
        return Err(format!(
            "{secs} exceeds the maximum of {MAX_VERIFICATION_TTL_SECS} seconds"
        ));
    }
    Ok(secs)
}
