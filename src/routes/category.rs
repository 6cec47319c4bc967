use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde_json::{json, Value};

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::models::category::{CategoryRequest, NewCategory};
use crate::routes::{on_duplicate, owned, parse_id};
use crate::state::AppState;
use crate::validation::validated;

const DUPLICATE: &str = "Category with this name already exists";

// Get all categories for the caller, by name
pub async fn list_categories(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<Value>> {
    let categories = state.categories.list_for_user(user.0).await?;

    Ok(Json(json!({
        "success": true,
        "categories": categories
    })))
}

pub async fn create_category(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CategoryRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let payload = validated(payload)?;

    let category = state
        .categories
        .insert(user.0, NewCategory::from(payload))
        .await
        .map_err(on_duplicate(DUPLICATE))?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Category created successfully",
            "category": category
        })),
    ))
}

pub async fn update_category(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(payload): Json<CategoryRequest>,
) -> ApiResult<Json<Value>> {
    let id = parse_id(&id, "Category")?;
    let existing = state.categories.find_by_id(id).await?;
    owned(existing, |c| c.user_id, user, "Category")?;

    let payload = validated(payload)?;
    let category = state
        .categories
        .update(id, NewCategory::from(payload))
        .await
        .map_err(on_duplicate(DUPLICATE))?
        .ok_or_else(|| ApiError::NotFound("Category not found".into()))?;

    Ok(Json(json!({
        "success": true,
        "message": "Category updated successfully",
        "category": category
    })))
}

// Expenses keep pointing at a deleted category; they just lose the join.
pub async fn delete_category(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let id = parse_id(&id, "Category")?;
    let existing = state.categories.find_by_id(id).await?;
    owned(existing, |c| c.user_id, user, "Category")?;

    if !state.categories.delete(id).await? {
        return Err(ApiError::NotFound("Category not found".into()));
    }

    Ok(Json(json!({
        "success": true,
        "message": "Category deleted successfully"
    })))
}
