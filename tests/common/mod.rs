#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use money_trail_be::{
    app, auth::AuthManager, config::Config, state::AppState, store::MemoryStore,
};
use serde_json::{json, Value};
use tower::ServiceExt;

pub fn test_app() -> Router {
    let config = Config::for_tests();
    let auth = AuthManager::new(config.jwt_secret.as_bytes(), config.jwt_ttl);
    let state = AppState::new(Arc::new(MemoryStore::new()), auth);
    app(state, &config)
}

pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

/// Register a fresh user and return their bearer token.
pub async fn register(app: &Router, email: &str) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({ "name": "Test User", "email": email, "password": "secret123" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["token"].as_str().unwrap().to_string()
}

pub async fn create_category(app: &Router, token: &str, name: &str) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/categories",
        Some(token),
        Some(json!({ "name": name })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["category"]["id"].as_str().unwrap().to_string()
}

pub async fn create_expense(
    app: &Router,
    token: &str,
    category_id: &str,
    title: &str,
    amount: f64,
    date: &str,
) -> Value {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/expenses",
        Some(token),
        Some(json!({
            "title": title,
            "amount": amount,
            "category_id": category_id,
            "date": date
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["expense"].clone()
}
