use super::*;
use crate::coordinator::test_helpers::{ProgressionEngine, ScriptedEngine, create_test_coordinator};
use crate::engine::ExtractionEngine;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use std::time::Duration;
use tower::ServiceExt;


/// Router over a fresh coordinator driven by `engine`
fn test_app(engine: Arc<dyn ExtractionEngine>) -> (Router, Arc<Coordinator>, tempfile::TempDir) {
    let (coordinator, temp_dir) = create_test_coordinator(engine, |_| {});
    let coordinator = Arc::new(coordinator);
    let app = create_router(coordinator.clone(), coordinator.get_config());
    (app, coordinator, temp_dir)
}

async fn get(app: &Router, uri: &str) -> Response {
    app.clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn post_json(app: &Router, uri: &str, body: serde_json::Value) -> Response {
    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
}

async fn json_body(response: Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_api_server_spawns() {
    let (coordinator, _temp_dir) = create_test_coordinator(Arc::new(ProgressionEngine), |config| {
        // Port 0 = OS assigns a free port
        config.server.api.bind_address = "127.0.0.1:0".parse().unwrap();
    });
    let coordinator = Arc::new(coordinator);

    let api_handle = coordinator.spawn_api_server();
    tokio::time::sleep(Duration::from_millis(100)).await;

    // Still serving (a bind failure would have finished the task)
    assert!(!api_handle.is_finished());
    api_handle.abort();
}

#[tokio::test]
async fn test_api_server_reports_bind_failure() {
    let occupied = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let address = occupied.local_addr().unwrap();

    let (coordinator, _temp_dir) = create_test_coordinator(Arc::new(ProgressionEngine), |config| {
        config.server.api.bind_address = address;
    });
    let coordinator = Arc::new(coordinator);

    let result = start_api_server(coordinator.clone(), coordinator.get_config()).await;
    assert!(matches!(result, Err(crate::error::Error::Io(_))));

    // The spawned variant finishes with the same error instead of hanging
    let handle = coordinator.spawn_api_server();
    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("server task should stop when the port is taken")
        .unwrap();
    assert!(matches!(result, Err(crate::error::Error::Io(_))));
}

#[tokio::test]
async fn test_cors_enabled() {
    let (app, _coordinator, _temp_dir) = test_app(Arc::new(ProgressionEngine));

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .contains_key("access-control-allow-origin"),
        "CORS header should be present when CORS is enabled"
    );
}

#[tokio::test]
async fn test_cors_disabled() {
    let (coordinator, _temp_dir) = create_test_coordinator(Arc::new(ProgressionEngine), |config| {
        config.server.api.cors_enabled = false;
    });
    let coordinator = Arc::new(coordinator);
    let app = create_router(coordinator.clone(), coordinator.get_config());

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert!(
        !response
            .headers()
            .contains_key("access-control-allow-origin")
    );
}

#[tokio::test]
async fn test_cors_specific_origin() {
    let (coordinator, _temp_dir) = create_test_coordinator(Arc::new(ProgressionEngine), |config| {
        config.server.api.cors_origins = vec!["http://allowed.example".to_string()];
    });
    let coordinator = Arc::new(coordinator);
    let app = create_router(coordinator.clone(), coordinator.get_config());

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://allowed.example")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "http://allowed.example"
    );
}

#[tokio::test]
async fn test_swagger_ui_toggle() {
    let (app, _coordinator, _temp_dir) = test_app(Arc::new(ProgressionEngine));
    let response = get(&app, "/api-docs/openapi.json").await;
    assert_eq!(response.status(), StatusCode::OK);

    let (coordinator, _temp_dir) = create_test_coordinator(Arc::new(ProgressionEngine), |config| {
        config.server.api.swagger_ui = false;
    });
    let coordinator = Arc::new(coordinator);
    let app = create_router(coordinator.clone(), coordinator.get_config());
    let response = get(&app, "/api-docs/openapi.json").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_scripted_engine_is_reachable_through_router() {
    let (engine, _steps) = ScriptedEngine::new();
    let (app, _coordinator, _temp_dir) = test_app(engine);

    let body = json_body(get(&app, "/capabilities").await).await;
    assert_eq!(body["engine"], "scripted");
}
