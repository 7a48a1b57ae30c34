//! Integration tests for schedule CRUD and ordering.

mod common;

use axum::http::{Method, StatusCode};
use common::{body_json, build_test_app, send, TestApp};
use serde_json::json;

async fn create(app: &TestApp, body: serde_json::Value) -> serde_json::Value {
    let response = send(app, Method::POST, "/api/v1/schedules", Some(body)).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["data"].clone()
}

fn lawn(id: &str) -> serde_json::Value {
    json!({
        "id": id,
        "name": "Front lawn",
        "start_time": "06:00",
        "days": ["Mon", "wednesday", "mon"],
        "sequence": [{"pin": 12, "duration": 10}]
    })
}

// ---------------------------------------------------------------------------
// Test: create normalizes the payload and persists it
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_normalizes_and_persists() {
    let app = build_test_app().await;
    let data = create(&app, lawn("front")).await;

    assert_eq!(data["id"], "front");
    assert_eq!(data["days"], json!(["Mon", "Wed"]));
    assert_eq!(data["enabled"], true);
    assert_eq!(data["sequence"][0]["duration"], 10);

    let stored = app.store.get("front").await.unwrap();
    assert_eq!(stored.name.as_deref(), Some("Front lawn"));
    assert!(app.dir.path().join("schedules.json").exists());
}

// ---------------------------------------------------------------------------
// Test: a schedule without an id gets a generated one
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_without_id_generates_one() {
    let app = build_test_app().await;
    let data = create(
        &app,
        json!({"start_time": "21:30", "days": [], "duration": 15}),
    )
    .await;

    let id = data["id"].as_str().unwrap();
    assert_eq!(id.len(), 36);
    assert_eq!(data["duration"], 15);
}

// ---------------------------------------------------------------------------
// Test: invalid payloads are rejected with 400 and nothing is stored
// ---------------------------------------------------------------------------

#[tokio::test]
async fn invalid_payloads_are_rejected() {
    let app = build_test_app().await;

    let cases = [
        json!({"start_time": "6:0", "days": [], "duration": 5}),
        json!({"start_time": "24:00", "days": [], "duration": 5}),
        json!({"start_time": "06:00", "days": ["Funday"], "duration": 5}),
        json!({"start_time": "06:00", "days": [], "sequence": [{"pin": 4, "duration": 5}]}),
        json!({"start_time": "06:00", "days": [], "sequence": [{"pin": 12, "duration": 0}]}),
        json!({"start_time": "06:00", "days": []}),
    ];
    for body in cases {
        let response = send(&app, Method::POST, "/api/v1/schedules", Some(body.clone())).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{body}");
    }

    let response = send(
        &app,
        Method::POST,
        "/api/v1/schedules",
        Some(json!({"days": "Mon"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "BAD_REQUEST");

    assert!(app.store.list().await.is_empty());
}

// ---------------------------------------------------------------------------
// Test: duplicate ids conflict; unknown ids are 404
// ---------------------------------------------------------------------------

#[tokio::test]
async fn duplicate_and_missing_ids() {
    let app = build_test_app().await;
    create(&app, lawn("front")).await;

    let response = send(&app, Method::POST, "/api/v1/schedules", Some(lawn("front"))).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = send(&app, Method::GET, "/api/v1/schedules/ghost", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["code"], "NOT_FOUND");

    let response = send(&app, Method::PUT, "/api/v1/schedules/ghost", Some(lawn("ghost"))).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(&app, Method::DELETE, "/api/v1/schedules/ghost", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Test: update replaces the schedule and rejects a mismatched body id
// ---------------------------------------------------------------------------

#[tokio::test]
async fn update_replaces_schedule() {
    let app = build_test_app().await;
    create(&app, lawn("front")).await;

    let mut body = lawn("");
    body["enabled"] = json!(false);
    body["start_time"] = json!("07:15");
    let response = send(&app, Method::PUT, "/api/v1/schedules/front", Some(body)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["id"], "front");
    assert_eq!(json["data"]["start_time"], "07:15");
    assert_eq!(json["data"]["enabled"], false);

    let response = send(&app, Method::PUT, "/api/v1/schedules/front", Some(lawn("back"))).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}

// ---------------------------------------------------------------------------
// Test: list follows the stored order; reorder and delete keep it consistent
// ---------------------------------------------------------------------------

#[tokio::test]
async fn reorder_and_delete() {
    let app = build_test_app().await;
    for id in ["a", "b", "c"] {
        create(&app, lawn(id)).await;
    }

    let response = send(
        &app,
        Method::PUT,
        "/api/v1/schedules/order",
        Some(json!({"ids": ["c", "a", "zzz"]})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let ids: Vec<String> = body_json(response).await["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(ids, vec!["c", "a", "b"]);

    let response = send(&app, Method::DELETE, "/api/v1/schedules/a", None).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = send(&app, Method::GET, "/api/v1/schedules", None).await;
    let json = body_json(response).await;
    let ids: Vec<&str> = json["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["c", "b"]);
}
