#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use chrono::NaiveDate;
use http_body_util::BodyExt;
use sprinkler_core::clock::ManualClock;
use sprinkler_gpio::{MemoryPinDriver, ZoneMap};
use sprinkler_runtime::ZoneRuntime;
use sprinkler_store::ScheduleStore;
use tower::ServiceExt;

use sprinkler_api::config::{GpioBackend, GpioConfig, ServerConfig};
use sprinkler_api::engine::dispatcher::ScheduleDispatcher;
use sprinkler_api::router::build_app_router;
use sprinkler_api::state::AppState;

pub const TEST_TOKEN: &str = "test-token";

/// Pins wired to zones 1 and 2.
pub const TEST_PINS: [u8; 2] = [12, 16];

/// Build a test `ServerConfig` with the in-memory GPIO backend.
pub fn test_config(schedules_path: PathBuf) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".parse().unwrap()],
        request_timeout_secs: 30,
        api_token: TEST_TOKEN.to_string(),
        gpio: GpioConfig {
            pins: TEST_PINS.to_vec(),
            deny: vec![2, 3, 14, 15],
            backend: GpioBackend::Memory,
            active_low: true,
            sysfs_root: PathBuf::from("/nonexistent"),
        },
        schedules_path,
        poll_interval_secs: 30,
        default_runtime_minutes: 30,
        rain_lock_default_hours: 24,
    }
}

/// Everything a test needs to drive and inspect the service.
pub struct TestApp {
    pub router: Router,
    pub runtime: Arc<ZoneRuntime>,
    pub driver: Arc<MemoryPinDriver>,
    pub store: Arc<ScheduleStore>,
    pub dispatcher: Arc<ScheduleDispatcher>,
    pub clock: Arc<ManualClock>,
    /// Keeps the store directory alive for the test's duration.
    pub dir: tempfile::TempDir,
}

/// Monday 2024-06-03 at the given local time.
pub fn monday_at(hour: u32, minute: u32, second: u32) -> chrono::NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 6, 3)
        .unwrap()
        .and_hms_opt(hour, minute, second)
        .unwrap()
}

/// Build the full application with the same middleware stack as `main.rs`.
pub async fn build_test_app() -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let config = Arc::new(test_config(dir.path().join("schedules.json")));

    let driver = Arc::new(MemoryPinDriver::new(&TEST_PINS));
    let zones = ZoneMap::new(TEST_PINS.to_vec(), &config.gpio.deny).unwrap();
    let runtime = ZoneRuntime::new(driver.clone(), zones);
    let store = Arc::new(ScheduleStore::open(&config.schedules_path).await.unwrap());
    let clock = Arc::new(ManualClock::new(monday_at(5, 0, 0)));
    let dispatcher = Arc::new(ScheduleDispatcher::new(
        Arc::clone(&runtime),
        Arc::clone(&store),
        clock.clone(),
        Duration::from_secs(config.poll_interval_secs),
    ));

    let state = AppState::new(
        Arc::clone(&config),
        Arc::clone(&runtime),
        Arc::clone(&store),
        Arc::clone(&dispatcher),
    );
    let router = build_app_router(state, &config);

    TestApp {
        router,
        runtime,
        driver,
        store,
        dispatcher,
        clock,
        dir,
    }
}

/// Send an authenticated request with an optional JSON body.
pub async fn send(
    app: &TestApp,
    method: Method,
    uri: &str,
    body: Option<serde_json::Value>,
) -> Response<Body> {
    send_with_token(app, method, uri, body, Some(TEST_TOKEN)).await
}

pub async fn send_with_token(
    app: &TestApp,
    method: Method,
    uri: &str,
    body: Option<serde_json::Value>,
    token: Option<&str>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.router.clone().oneshot(request).await.unwrap()
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
