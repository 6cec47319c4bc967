use axum::{extract::State, http::StatusCode, response::Json};
use serde_json::{json, Value};

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::models::user::{normalize_email, LoginRequest, NewUser, RegisterRequest, UserResponse};
use crate::routes::on_duplicate;
use crate::state::AppState;
use crate::validation::validated;

// Argon2 work runs on the blocking pool.
async fn blocking<T, F>(work: F) -> ApiResult<T>
where
    F: FnOnce() -> Result<T, crate::auth::AuthError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ApiError::Internal(format!("Password task failed: {e}")))?
        .map_err(ApiError::from)
}

pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let payload = validated(payload)?;
    let email = normalize_email(&payload.email);

    if state.users.find_by_email(&email).await?.is_some() {
        return Err(ApiError::Duplicate("User with this email already exists".into()));
    }

    let auth = state.auth.clone();
    let password = payload.password;
    let password_hash = blocking(move || auth.hash_password(&password)).await?;

    let user = state
        .users
        .insert(NewUser {
            name: payload.name.trim().to_string(),
            email,
            password_hash,
        })
        .await
        .map_err(on_duplicate("User with this email already exists"))?;

    let token = state.auth.issue_token(user.id)?;
    tracing::info!(user_id = %user.id, "user registered");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "User registered successfully",
            "token": token,
            "expires_in": state.auth.expires_in().as_secs(),
            "user": UserResponse::from(&user)
        })),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<Json<Value>> {
    let payload = validated(payload)?;

    let user = state
        .users
        .find_by_email(&normalize_email(&payload.email))
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid credentials".into()))?;

    let auth = state.auth.clone();
    let password_hash = user.password_hash.clone();
    let password = payload.password;
    blocking(move || auth.verify_password(&password_hash, &password)).await?;

    let token = state.auth.issue_token(user.id)?;

    Ok(Json(json!({
        "success": true,
        "message": "Login successful",
        "token": token,
        "expires_in": state.auth.expires_in().as_secs(),
        "user": UserResponse::from(&user)
    })))
}

pub async fn me(State(state): State<AppState>, user: AuthUser) -> ApiResult<Json<Value>> {
    let user = state
        .users
        .find_by_id(user.0)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    Ok(Json(json!({
        "success": true,
        "user": UserResponse::from(&user)
    })))
}
