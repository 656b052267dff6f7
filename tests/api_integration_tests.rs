//! Integration Tests for API Endpoints
//!
//! Tests full request/response cycle for each endpoint against a temporary
//! cache root.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use segment_cache::{api::create_router, cache::CacheStore, AppState};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

// == Helper Functions ==

fn create_test_app(max_size: u64) -> (TempDir, Router) {
    let dir = tempfile::tempdir().unwrap();
    let cache = CacheStore::new(dir.path(), max_size);
    let state = AppState::new(cache);
    (dir, create_router(state))
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn put_request(key: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("PUT")
        .uri(format!("/entries/{}", key))
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn delete_request(key: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(format!("/entries/{}", key))
        .body(Body::empty())
        .unwrap()
}

fn buffer(len: usize, byte: u8) -> Value {
    json!({"type": "Buffer", "data": vec![byte; len]})
}

// == PUT Endpoint Tests ==

#[tokio::test]
async fn test_write_endpoint_success() {
    let (_dir, app) = create_test_app(1024 * 1024);

    let response = app
        .oneshot(put_request("test_key", &json!({"value": "test_value"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response.into_body()).await;
    assert!(json["message"].as_str().unwrap().contains("test_key"));
    assert!(json["size"].as_u64().unwrap() > 0);
}

#[tokio::test]
async fn test_write_endpoint_invalid_key() {
    let (_dir, app) = create_test_app(1024 * 1024);

    let response = app
        .oneshot(put_request("meta", &json!(1)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_to_json(response.into_body()).await;
    assert!(json.get("error").is_some());
}

#[tokio::test]
async fn test_write_endpoint_too_large() {
    let (dir, app) = create_test_app(1024);

    let response = app
        .oneshot(put_request("big", &buffer(4096, 1)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert!(!dir.path().join("big.json").exists());
    assert!(!dir.path().join("meta.json").exists());
}

#[tokio::test]
async fn test_write_endpoint_malformed_json() {
    let (_dir, app) = create_test_app(1024 * 1024);

    let response = app
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/entries/bad")
                .header("content-type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(response.status().is_client_error());
}

// == GET Endpoint Tests ==

#[tokio::test]
async fn test_read_endpoint_roundtrip_with_segments() {
    let (dir, app) = create_test_app(1024 * 1024);
    let value = json!({
        "name": "artifact",
        "small": buffer(16, 7),
        "large": buffer(2048, 9),
    });

    let response = app
        .clone()
        .oneshot(put_request("artifact", &value))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(dir.path().join("artifact-0.bin").exists());
    assert!(!dir.path().join("artifact-1.bin").exists());

    let response = app
        .oneshot(get_request("/entries/artifact"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["key"], "artifact");
    assert_eq!(json["value"], value);
}

#[tokio::test]
async fn test_read_endpoint_not_found() {
    let (_dir, app) = create_test_app(1024 * 1024);

    let response = app
        .oneshot(get_request("/entries/missing"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_read_endpoint_corrupt_entry() {
    let (dir, app) = create_test_app(1024 * 1024);

    app.clone()
        .oneshot(put_request("blob", &buffer(2048, 3)))
        .await
        .unwrap();
    std::fs::remove_file(dir.path().join("blob-0.bin")).unwrap();

    let response = app.oneshot(get_request("/entries/blob")).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

// == DELETE Endpoint Tests ==

#[tokio::test]
async fn test_delete_endpoint() {
    let (dir, app) = create_test_app(1024 * 1024);

    app.clone()
        .oneshot(put_request("gone", &buffer(2048, 1)))
        .await
        .unwrap();

    let response = app.clone().oneshot(delete_request("gone")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(!dir.path().join("gone.json").exists());
    assert!(!dir.path().join("gone-0.bin").exists());

    let response = app.oneshot(get_request("/entries/gone")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_endpoint_not_found() {
    let (_dir, app) = create_test_app(1024 * 1024);

    let response = app.oneshot(delete_request("never")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// == Eviction ==

#[tokio::test]
async fn test_eviction_through_api() {
    let (_dir, app) = create_test_app(5000);

    for key in ["first", "second", "third"] {
        let response = app
            .clone()
            .oneshot(put_request(key, &buffer(2000, 1)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .clone()
        .oneshot(get_request("/entries/first"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    for key in ["second", "third"] {
        let response = app
            .clone()
            .oneshot(get_request(&format!("/entries/{}", key)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app.oneshot(get_request("/stats")).await.unwrap();
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["entries"], 2);
    assert!(json["total_size"].as_u64().unwrap() <= 5000);
}

// == Stats & Health ==

#[tokio::test]
async fn test_stats_endpoint_tracks_size() {
    let (_dir, app) = create_test_app(1024 * 1024);

    let response = app
        .clone()
        .oneshot(put_request("a", &json!("x")))
        .await
        .unwrap();
    let written = body_to_json(response.into_body()).await;

    let response = app.oneshot(get_request("/stats")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["entries"], 1);
    assert_eq!(json["total_size"], written["size"]);
    assert_eq!(json["max_size"], 1024 * 1024);
    assert_eq!(
        json["remaining"].as_u64().unwrap(),
        1024 * 1024 - written["size"].as_u64().unwrap()
    );
}

#[tokio::test]
async fn test_health_endpoint() {
    let (_dir, app) = create_test_app(1024);

    let response = app.oneshot(get_request("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], "healthy");
}
