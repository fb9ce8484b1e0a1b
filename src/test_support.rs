//! Helpers for driving the router in unit tests.

use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use crate::{app::build_app, state::AppState};

pub async fn test_app() -> Router {
    build_app(AppState::fake().await)
}

/// Sends one request and returns status, headers and the body as JSON (`Null` when empty).
pub async fn send(app: &Router, req: Request<Body>) -> (StatusCode, HeaderMap, Value) {
    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let headers = res.headers().clone();
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, headers, body)
}

pub async fn get(app: &Router, uri: &str) -> (StatusCode, HeaderMap, Value) {
    let req = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, req).await
}

pub async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, HeaderMap, Value) {
    let req = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, req).await
}

/// Registers a user over HTTP and returns its id.
pub async fn register(app: &Router, email: &str, referral_code: Option<&str>) -> String {
    let (status, _, body) = post_json(
        app,
        "/users/",
        serde_json::json!({
            "name": "Test User",
            "email": email,
            "password": "1234545",
            "referral_code": referral_code,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "register {email}: {body}");
    body["id"].as_str().unwrap().to_string()
}
