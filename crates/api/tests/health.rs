//! Integration tests for the health endpoint, authentication and general
//! HTTP behaviour.

mod common;

use axum::http::{Method, StatusCode};
use common::{body_json, build_test_app, send, send_with_token};

// ---------------------------------------------------------------------------
// Test: GET /health needs no token and reports the backend
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_check_is_public() {
    let app = build_test_app().await;
    let response = send_with_token(&app, Method::GET, "/health", None, None).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
    assert_eq!(json["gpio_backend"], "memory");
}

// ---------------------------------------------------------------------------
// Test: x-request-id header is present in response
// ---------------------------------------------------------------------------

#[tokio::test]
async fn response_contains_x_request_id_header() {
    let app = build_test_app().await;
    let response = send(&app, Method::GET, "/health", None).await;

    let request_id = response.headers().get("x-request-id");
    assert!(
        request_id.is_some(),
        "Response must contain an x-request-id header"
    );
    assert_eq!(request_id.unwrap().to_str().unwrap().len(), 36);
}

// ---------------------------------------------------------------------------
// Test: API routes reject missing, malformed and wrong tokens
// ---------------------------------------------------------------------------

#[tokio::test]
async fn api_requires_bearer_token() {
    let app = build_test_app().await;

    for token in [None, Some("wrong")] {
        let response =
            send_with_token(&app, Method::GET, "/api/v1/status", None, token).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let json = body_json(response).await;
        assert_eq!(json["code"], "UNAUTHORIZED");
    }

    // Rejected requests never reach the pins.
    let response =
        send_with_token(&app, Method::POST, "/api/v1/zones/1/on", None, Some("nope")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(app.driver.writes().is_empty());
}

// ---------------------------------------------------------------------------
// Test: Unknown route returns 404
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_route_returns_404() {
    let app = build_test_app().await;
    let response = send(&app, Method::GET, "/this-route-does-not-exist", None).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
