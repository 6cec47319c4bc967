use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use futures::future::join_all;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::models::budget::{Budget, BudgetFilter, BudgetQuery, BudgetRequest, BudgetView, NewBudget};
use crate::models::pagination::{PageParams, Pagination};
use crate::progress::compute_progress;
use crate::routes::{on_duplicate, owned, parse_id, unknown_categories};
use crate::state::AppState;
use crate::validation::validated;

const DUPLICATE: &str = "Budget with this name already exists";

async fn with_progress(state: &AppState, user: AuthUser, budget: Budget) -> BudgetView {
    let progress = compute_progress(state.expenses.as_ref(), &budget, user.0).await;
    BudgetView { budget, progress }
}

async fn checked_payload(
    state: &AppState,
    user: AuthUser,
    payload: BudgetRequest,
) -> ApiResult<NewBudget> {
    let payload = validated(payload)?;
    let category_ids: Vec<Uuid> = payload
        .category_allocations
        .iter()
        .map(|a| a.category_id)
        .collect();
    let errors = unknown_categories(state, user, &category_ids, |i| {
        format!("category_allocations[{i}].category_id")
    })
    .await?;
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }
    Ok(NewBudget::from(payload))
}

// Get a page of the caller's budgets, newest first, each with live progress
pub async fn list_budgets(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<BudgetQuery>,
) -> ApiResult<Json<Value>> {
    let filter = BudgetFilter {
        period: query.period,
        is_active: query.is_active,
    };
    let page = PageParams::new(query.page, query.limit);

    let budgets = state.budgets.find(user.0, &filter, page).await?;
    let total = state.budgets.count(user.0, &filter).await?;

    let budgets = join_all(
        budgets
            .into_iter()
            .map(|budget| with_progress(&state, user, budget)),
    )
    .await;

    Ok(Json(json!({
        "success": true,
        "budgets": budgets,
        "pagination": Pagination::new(page, total)
    })))
}

pub async fn get_budget(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let id = parse_id(&id, "Budget")?;
    let existing = state.budgets.find_by_id(id).await?;
    let budget = owned(existing, |b| b.user_id, user, "Budget")?;

    Ok(Json(json!({
        "success": true,
        "budget": with_progress(&state, user, budget).await
    })))
}

pub async fn create_budget(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<BudgetRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let budget = checked_payload(&state, user, payload).await?;

    let budget = state
        .budgets
        .insert(user.0, budget)
        .await
        .map_err(on_duplicate(DUPLICATE))?;
    tracing::info!(budget_id = %budget.id, user_id = %user.0, "budget created");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Budget created successfully",
            "budget": with_progress(&state, user, budget).await
        })),
    ))
}

pub async fn update_budget(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(payload): Json<BudgetRequest>,
) -> ApiResult<Json<Value>> {
    let id = parse_id(&id, "Budget")?;
    let existing = state.budgets.find_by_id(id).await?;
    owned(existing, |b| b.user_id, user, "Budget")?;

    let budget = checked_payload(&state, user, payload).await?;
    let budget = state
        .budgets
        .update(id, budget)
        .await
        .map_err(on_duplicate(DUPLICATE))?
        .ok_or_else(|| ApiError::NotFound("Budget not found".into()))?;

    Ok(Json(json!({
        "success": true,
        "message": "Budget updated successfully",
        "budget": with_progress(&state, user, budget).await
    })))
}

pub async fn delete_budget(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let id = parse_id(&id, "Budget")?;
    let existing = state.budgets.find_by_id(id).await?;
    owned(existing, |b| b.user_id, user, "Budget")?;

    if !state.budgets.delete(id).await? {
        return Err(ApiError::NotFound("Budget not found".into()));
    }
    tracing::info!(budget_id = %id, "budget deleted");

    Ok(Json(json!({
        "success": true,
        "message": "Budget deleted successfully"
    })))
}
