use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use sqlx::Connection;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use verimail_api::config::ServerConfig;
use verimail_api::routes;
use verimail_api::state::AppState;
use verimail_db::DbConfig;
use verimail_events::{build_dispatcher, EmailConfig, Orchestrator, PgRecordStore};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    let db_config = DbConfig::from_env();
    let email_config = EmailConfig::from_env();

    // --- Tracing ---
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "verimail_api=info,verimail_events=info,verimail_db=info,tower_http=info".into()
    });
    if config.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");
    tracing::info!(?db_config, ?email_config, "Loaded delivery configuration");

    // --- Database ---
    if config.run_migrations {
        let mut conn = verimail_db::connect(&db_config)
            .await
            .expect("Failed to connect to database");
        verimail_db::run_migrations(&mut conn)
            .await
            .expect("Failed to run database migrations");
        conn.close().await.ok();
        tracing::info!("Database migrations applied");
    }

    // --- Orchestrator ---
    let orchestrator = Orchestrator::new(
        build_dispatcher(email_config),
        Arc::new(PgRecordStore::new(&db_config)),
        config.validity_window(),
    );

    let state = AppState {
        orchestrator: Arc::new(orchestrator),
        db: Arc::new(db_config),
    };

    let app = routes::app(state, Duration::from_secs(config.request_timeout_secs));

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix); in-flight
/// invocations finish before the process exits.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
