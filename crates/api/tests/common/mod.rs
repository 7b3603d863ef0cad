#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use chrono::TimeZone;
use http_body_util::BodyExt;
use tower::ServiceExt;

use verimail_api::routes;
use verimail_api::state::AppState;
use verimail_core::{FixedClock, Timestamp, VerificationRecord};
use verimail_db::DbConfig;
use verimail_events::{
    DeliveryReceipt, DispatchError, EmailDispatcher, Orchestrator, PersistError, RecordStore,
};

/// Fixed dispatch time used by every test app.
pub fn t0() -> Timestamp {
    chrono::Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
}

/// Validity window used by every test app.
pub const TTL_SECS: i64 = 120;

/// Dispatcher double: records each call and optionally rejects it.
#[derive(Default)]
pub struct StubDispatcher {
    pub reject_with: Option<u16>,
    pub calls: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl EmailDispatcher for StubDispatcher {
    async fn dispatch(&self, email: &str, token: &str) -> Result<DeliveryReceipt, DispatchError> {
        self.calls
            .lock()
            .unwrap()
            .push((email.to_string(), token.to_string()));
        match self.reject_with {
            Some(status) => Err(DispatchError::Rejected {
                status,
                body: "rejected by stub".into(),
            }),
            None => Ok(DeliveryReceipt {
                status: 202,
                body: String::new(),
            }),
        }
    }
}

/// Store double: keeps records in memory and optionally fails every insert.
#[derive(Default)]
pub struct MemoryStore {
    pub fail: bool,
    pub records: Mutex<Vec<VerificationRecord>>,
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn insert(&self, record: &VerificationRecord) -> Result<(), PersistError> {
        if self.fail {
            return Err(PersistError::connect(sqlx::Error::PoolTimedOut));
        }
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}

/// Store double whose inserts take `delay` before succeeding.
#[derive(Default)]
pub struct SlowStore {
    pub delay: Duration,
    pub records: Mutex<Vec<VerificationRecord>>,
}

#[async_trait]
impl RecordStore for SlowStore {
    async fn insert(&self, record: &VerificationRecord) -> Result<(), PersistError> {
        tokio::time::sleep(self.delay).await;
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}

/// Database settings pointing at a port nothing listens on.
pub fn unreachable_db() -> DbConfig {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    DbConfig {
        host: "127.0.0.1".into(),
        port,
        user: "postgres".into(),
        name: "postgres".into(),
        password: String::new(),
        connect_timeout: verimail_db::DEFAULT_CONNECT_TIMEOUT,
    }
}

/// Build the application router around the given doubles.
///
/// Uses the same router construction as `main.rs` so tests exercise the
/// production middleware stack.
pub fn build_test_app(dispatcher: Arc<StubDispatcher>, store: Arc<MemoryStore>) -> Router {
    build_test_app_with(dispatcher, store, Duration::from_secs(30))
}

/// Like [`build_test_app`], with an explicit request timeout and any store.
pub fn build_test_app_with(
    dispatcher: Arc<StubDispatcher>,
    store: Arc<dyn RecordStore>,
    request_timeout: Duration,
) -> Router {
    let orchestrator = Orchestrator::new(
        dispatcher as Arc<dyn EmailDispatcher>,
        store,
        chrono::Duration::seconds(TTL_SECS),
    )
    .with_clock(Arc::new(FixedClock(t0())));

    let state = AppState {
        orchestrator: Arc::new(orchestrator),
        db: Arc::new(unreachable_db()),
    };

    routes::app(state, request_timeout)
}

/// Issue a GET request.
pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// Issue a POST request with a JSON body.
pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    post_raw(app, uri, body.to_string()).await
}

/// Issue a POST request with an arbitrary body.
pub async fn post_raw(app: Router, uri: &str, body: String) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
