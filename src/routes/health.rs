use axum::{http::StatusCode, http::Uri, response::Json};
use chrono::Utc;
use serde_json::{json, Value};

pub async fn health() -> Json<Value> {
    Json(json!({
        "success": true,
        "message": "Money Trail API is running!",
        "timestamp": Utc::now()
    }))
}

pub async fn not_found(uri: Uri) -> (StatusCode, Json<Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "success": false,
            "message": format!("Route {uri} not found")
        })),
    )
}
