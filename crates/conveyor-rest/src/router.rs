//! Router assembly and transport middleware.

use crate::controllers;
use crate::responses;
use crate::state::AppState;
use axum::body::Body;
use axum::http::{header, HeaderValue, Response, StatusCode};
use axum::response::IntoResponse;
use axum::{Json, Router};
use serde_json::json;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::error;

/// Assembles the control-plane router.
pub fn create_router(state: AppState, cors_enabled: bool) -> Router {
    let mut router = Router::new()
        .merge(controllers::jobs::router())
        .merge(controllers::health::router())
        .fallback(responses::not_found)
        .method_not_allowed_fallback(responses::method_not_allowed)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(handle_panic));

    if cors_enabled {
        router = router.layer(CorsLayer::permissive());
    }

    router
}

/// Converts a handler panic into a 500 and tells the client to drop the
/// connection. Applies to the HTTP layer only; a worker panic is allowed to
/// take the process down for a supervised restart.
fn handle_panic(panic: Box<dyn std::any::Any + Send + 'static>) -> Response<Body> {
    let detail = if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    };

    error!(panic = %detail, "handler panicked");

    let mut response = (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "error": "the server encountered a problem and could not process your request"
        })),
    )
        .into_response();
    response
        .headers_mut()
        .insert(header::CONNECTION, HeaderValue::from_static("close"));

    response
}
