//! REST-surface tests driving the full router via `tower::ServiceExt::oneshot`
//! (no real socket): build a `Request`, run it through the router, read the
//! response body with `http_body_util::BodyExt`.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_reports_ok() {
    let app = coc_server::app(common::running_state());
    let response = app
        .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn unknown_api_route_returns_json_404() {
    let app = coc_server::app(common::running_state());
    let response = app
        .oneshot(Request::builder().uri("/api/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn non_api_fallback_serves_html() {
    let app = coc_server::app(common::running_state());
    let response = app
        .oneshot(Request::builder().uri("/anything").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers().get("content-type").unwrap().to_str().unwrap().to_string();
    assert!(content_type.contains("text/html"));
}

#[tokio::test]
async fn options_preflight_is_handled_by_cors_layer() {
    let app = coc_server::app(common::running_state());
    let response = app
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/api/processes")
                .header("origin", "http://localhost:5173")
                .header("access-control-request-method", "GET")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn process_crud_round_trip() {
    let app = coc_server::app(common::running_state());

    let create_body = serde_json::json!({
        "id": "p-1",
        "promptPreview": "hello",
        "status": "running",
        "startTime": 0,
    });
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/processes")
                .header("content-type", "application/json")
                .body(Body::from(create_body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/api/processes/p-1").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["promptPreview"], "hello");

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/processes/p-1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .oneshot(Request::builder().uri("/api/processes/p-1").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn cancel_terminal_process_is_conflict() {
    let app = coc_server::app(common::running_state());

    let create_body = serde_json::json!({
        "id": "p-done",
        "promptPreview": "x",
        "status": "completed",
        "startTime": 0,
    });
    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/processes")
                .header("content-type", "application/json")
                .body(Body::from(create_body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/processes/p-done/cancel")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn clear_processes_requires_status_query() {
    let app = coc_server::app(common::running_state());
    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/processes")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn completed_process_stream_emits_status_then_done() {
    let app = coc_server::app(common::running_state());

    let create_body = serde_json::json!({
        "id": "p-stream",
        "promptPreview": "x",
        "status": "completed",
        "startTime": 0,
    });
    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/processes")
                .header("content-type", "application/json")
                .body(Body::from(create_body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/processes/p-stream/stream")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert_eq!(text.matches("event: status").count(), 1);
    assert_eq!(text.matches("event: done").count(), 1);
}

#[tokio::test]
async fn workspace_create_and_list() {
    let app = coc_server::app(common::running_state());

    let body = serde_json::json!({ "id": "ws-a", "name": "Workspace A", "rootPath": "/tmp/a" });
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/workspaces")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .oneshot(Request::builder().uri("/api/workspaces").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["workspaces"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn queue_enqueue_and_history() {
    let app = coc_server::app(common::running_state());

    let body = serde_json::json!({
        "payload": { "type": "custom", "data": { "prompt": "hi" } },
    });
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/queue")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    tokio::time::sleep(std::time::Duration::from_millis(300)).await;

    let response = app
        .oneshot(Request::builder().uri("/api/queue/history").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let body = body_json(response).await;
    let history = body["history"].as_array().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["status"], "completed");
}
