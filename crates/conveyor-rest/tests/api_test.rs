//! Control-plane integration tests over the in-memory store and index.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chrono::{DateTime, Duration, TimeZone, Utc};
use conveyor_core::{Clock, ManualClock};
use conveyor_queue::{Dispatcher, InMemoryScheduleIndex};
use conveyor_rest::{create_router, AppState};
use conveyor_service::JobService;
use conveyor_store::InMemoryJobStore;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
}

struct TestApp {
    router: Router,
    index: Arc<InMemoryScheduleIndex>,
}

fn test_app() -> TestApp {
    let store = Arc::new(InMemoryJobStore::new());
    let index = Arc::new(InMemoryScheduleIndex::new());
    let clock = Arc::new(ManualClock::new(t0())) as Arc<dyn Clock>;
    let dispatcher = Dispatcher::new(index.clone());
    let service = Arc::new(JobService::new(store, dispatcher, clock));
    let state = AppState::new(service, "test");

    TestApp {
        router: create_router(state, true),
        index,
    }
}

async fn send(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");

    let request = match body {
        Some(value) => builder.body(Body::from(value.to_string())).unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };

    (status, value)
}

#[tokio::test]
async fn test_health() {
    let app = test_app();

    let (status, body) = send(&app.router, "GET", "/v1/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "available");
    assert_eq!(body["environment"], "test");
}

#[tokio::test]
async fn test_create_without_run_at_is_created() {
    let app = test_app();

    let (status, body) = send(
        &app.router,
        "POST",
        "/v1/jobs",
        Some(json!({
            "task": "webhook",
            "payload": {"url": "http://x/", "method": "POST"}
        })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["job"]["status"], "Created");
    assert_eq!(body["job"]["retries"], 0);
    assert_eq!(body["job"]["retry_delay_sec"], 60);
    assert!(body["job"]["run_at"].is_null());
    assert!(app.index.is_empty());
}

#[tokio::test]
async fn test_create_then_schedule_enqueues() {
    let app = test_app();

    let (_, created) = send(
        &app.router,
        "POST",
        "/v1/jobs",
        Some(json!({
            "task": "webhook",
            "payload": {"url": "http://x/", "method": "POST"}
        })),
    )
    .await;
    let id = created["job"]["id"].as_str().unwrap().to_string();

    let run_at = t0() + Duration::seconds(1);
    let (status, body) = send(
        &app.router,
        "POST",
        &format!("/v1/jobs/{id}/schedule"),
        Some(json!({ "run_at": run_at.to_rfc3339() })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["job"]["status"], "Queued");

    let job_id = conveyor_core::JobId::parse(&id).unwrap();
    assert_eq!(app.index.score(job_id), Some(run_at.timestamp()));
}

#[tokio::test]
async fn test_create_validation_failure_is_422_with_field_map() {
    let app = test_app();

    let (status, body) = send(
        &app.router,
        "POST",
        "/v1/jobs",
        Some(json!({ "task": "email", "payload": {} })),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["task"], "unsupported task");
    assert!(body["error"]["payload"].is_string());
}

#[tokio::test]
async fn test_create_with_malformed_body_is_400() {
    let app = test_app();

    let request = Request::builder()
        .method("POST")
        .uri("/v1/jobs")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_job_round_trip() {
    let app = test_app();

    let (_, created) = send(
        &app.router,
        "POST",
        "/v1/jobs",
        Some(json!({
            "task": "send_email",
            "payload": {
                "from": "sender@example.com",
                "to": "receiver@example.com",
                "subject": "Hi"
            },
            "run_at": (t0() + Duration::seconds(30)).to_rfc3339(),
            "max_retries": 2,
            "retry_delay_sec": 10
        })),
    )
    .await;
    let id = created["job"]["id"].as_str().unwrap();

    let (status, body) = send(&app.router, "GET", &format!("/v1/jobs/{id}"), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["job"]["id"], created["job"]["id"]);
    assert_eq!(body["job"]["task"], "send_email");
    assert_eq!(body["job"]["status"], "Queued");
    assert_eq!(body["job"]["max_retries"], 2);
    assert_eq!(body["job"]["retry_delay_sec"], 10);
}

#[tokio::test]
async fn test_get_unknown_job_is_404() {
    let app = test_app();

    let (status, body) = send(
        &app.router,
        "GET",
        "/v1/jobs/550e8400-e29b-41d4-a716-446655440000",
        None,
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_get_job_with_invalid_id_is_404() {
    let app = test_app();

    let (status, _) = send(&app.router, "GET", "/v1/jobs/not-a-uuid", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_status_endpoint_returns_bare_status() {
    let app = test_app();

    let (_, created) = send(
        &app.router,
        "POST",
        "/v1/jobs",
        Some(json!({
            "task": "webhook",
            "payload": {"url": "http://x/", "method": "POST"}
        })),
    )
    .await;
    let id = created["job"]["id"].as_str().unwrap();

    let (status, body) = send(&app.router, "GET", &format!("/v1/jobs/{id}/status"), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "Created"}));
}

#[tokio::test]
async fn test_cancel_scheduled_job() {
    let app = test_app();

    let (_, created) = send(
        &app.router,
        "POST",
        "/v1/jobs",
        Some(json!({
            "task": "webhook",
            "payload": {"url": "http://x/", "method": "POST"},
            "run_at": (t0() + Duration::seconds(100)).to_rfc3339()
        })),
    )
    .await;
    let id = created["job"]["id"].as_str().unwrap().to_string();
    assert!(!app.index.is_empty());

    let (status, body) = send(&app.router, "POST", &format!("/v1/jobs/{id}/cancel"), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["job"]["status"], "Cancelled");
    assert!(app.index.is_empty());

    // A second cancel is an illegal transition.
    let (status, _) = send(&app.router, "POST", &format!("/v1/jobs/{id}/cancel"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_schedule_cancelled_job_is_409() {
    let app = test_app();

    let (_, created) = send(
        &app.router,
        "POST",
        "/v1/jobs",
        Some(json!({
            "task": "webhook",
            "payload": {"url": "http://x/", "method": "POST"},
            "run_at": (t0() + Duration::seconds(100)).to_rfc3339()
        })),
    )
    .await;
    let id = created["job"]["id"].as_str().unwrap().to_string();

    send(&app.router, "POST", &format!("/v1/jobs/{id}/cancel"), None).await;

    let (status, _) = send(
        &app.router,
        "POST",
        &format!("/v1/jobs/{id}/schedule"),
        Some(json!({ "run_at": (t0() + Duration::seconds(200)).to_rfc3339() })),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_search_filters_and_paginates() {
    let app = test_app();

    for i in 0..3 {
        send(
            &app.router,
            "POST",
            "/v1/jobs",
            Some(json!({
                "task": "webhook",
                "payload": {"url": "http://x/", "method": "POST"},
                "run_at": (t0() + Duration::seconds(10 + i)).to_rfc3339()
            })),
        )
        .await;
    }
    send(
        &app.router,
        "POST",
        "/v1/jobs",
        Some(json!({
            "task": "webhook",
            "payload": {"url": "http://x/", "method": "POST"}
        })),
    )
    .await;

    let (status, body) = send(
        &app.router,
        "GET",
        "/v1/jobs?status=Queued&page=1&page_size=2&sort=run_at",
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["jobs"].as_array().unwrap().len(), 2);
    assert_eq!(body["metadata"]["total_records"], 3);
    assert_eq!(body["metadata"]["last_page"], 2);
    assert!(body["jobs"]
        .as_array()
        .unwrap()
        .iter()
        .all(|job| job["status"] == "Queued"));
}

#[tokio::test]
async fn test_search_rejects_invalid_params() {
    let app = test_app();

    let (status, body) = send(&app.router, "GET", "/v1/jobs?status=nope", None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["status"], "invalid status value");

    let (status, body) = send(&app.router, "GET", "/v1/jobs?sort=payload", None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["sort"], "invalid sort value");
}

#[tokio::test]
async fn test_unknown_route_is_404_envelope() {
    let app = test_app();

    let (status, body) = send(&app.router, "GET", "/v1/nope", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_wrong_method_is_405_envelope() {
    let app = test_app();

    let (status, body) = send(
        &app.router,
        "DELETE",
        "/v1/jobs/550e8400-e29b-41d4-a716-446655440000",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert!(body["error"].is_string());

    let (status, body) = send(&app.router, "PUT", "/v1/health", None).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert!(body["error"].is_string());
}
