use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::models::expense::{ExpenseFilter, ExpenseQuery, ExpenseRequest, NewExpense};
use crate::models::pagination::{PageParams, Pagination};
use crate::models::stats::{DateRange, ExpenseStats, StatsPeriod, StatsQuery};
use crate::models::{parse_datetime, parse_datetime_end_of_day};
use crate::routes::{owned, parse_id, unknown_categories};
use crate::state::AppState;
use crate::validation::{validated, Errors};

fn filter_from(query: &ExpenseQuery) -> ApiResult<ExpenseFilter> {
    let mut errors = Errors::new();
    let start_date = query.start_date.as_deref().and_then(|raw| {
        let parsed = parse_datetime(raw);
        errors.check(parsed.is_some(), "start_date", "Start date must be a valid date");
        parsed
    });
    let end_date = query.end_date.as_deref().and_then(|raw| {
        let parsed = parse_datetime_end_of_day(raw);
        errors.check(parsed.is_some(), "end_date", "End date must be a valid date");
        parsed
    });
    errors.finish().map_err(ApiError::Validation)?;

    Ok(ExpenseFilter {
        category_id: query.category,
        start_date,
        end_date,
        search: query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
    })
}

async fn ensure_category(state: &AppState, user: AuthUser, category_id: Uuid) -> ApiResult<()> {
    let errors = unknown_categories(state, user, &[category_id], |_| "category_id".into()).await?;
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::Validation(errors))
    }
}

pub async fn list_expenses(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<ExpenseQuery>,
) -> ApiResult<Json<Value>> {
    let filter = filter_from(&query)?;
    let page = PageParams::new(query.page, query.limit);

    let expenses = state.expenses.find(user.0, &filter, page).await?;
    let total = state.expenses.count(user.0, &filter).await?;

    Ok(Json(json!({
        "success": true,
        "expenses": expenses,
        "pagination": Pagination::new(page, total)
    })))
}

pub async fn get_expense(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let id = parse_id(&id, "Expense")?;
    let existing = state.expenses.find_by_id(id).await?;
    let expense = owned(existing, |e| e.expense.user_id, user, "Expense")?;

    Ok(Json(json!({
        "success": true,
        "expense": expense
    })))
}

pub async fn create_expense(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<ExpenseRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let payload = validated(payload)?;
    ensure_category(&state, user, payload.category_id).await?;

    let expense = state
        .expenses
        .insert(user.0, NewExpense::from(payload))
        .await?;
    tracing::debug!(expense_id = %expense.expense.id, "expense created");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Expense created successfully",
            "expense": expense
        })),
    ))
}

pub async fn update_expense(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(payload): Json<ExpenseRequest>,
) -> ApiResult<Json<Value>> {
    let id = parse_id(&id, "Expense")?;
    let existing = state.expenses.find_by_id(id).await?;
    owned(existing, |e| e.expense.user_id, user, "Expense")?;

    let payload = validated(payload)?;
    ensure_category(&state, user, payload.category_id).await?;

    let expense = state
        .expenses
        .update(id, NewExpense::from(payload))
        .await?
        .ok_or_else(|| ApiError::NotFound("Expense not found".into()))?;

    Ok(Json(json!({
        "success": true,
        "message": "Expense updated successfully",
        "expense": expense
    })))
}

pub async fn delete_expense(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let id = parse_id(&id, "Expense")?;
    let existing = state.expenses.find_by_id(id).await?;
    owned(existing, |e| e.expense.user_id, user, "Expense")?;

    if !state.expenses.delete(id).await? {
        return Err(ApiError::NotFound("Expense not found".into()));
    }

    Ok(Json(json!({
        "success": true,
        "message": "Expense deleted successfully"
    })))
}

pub async fn expense_stats(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<StatsQuery>,
) -> ApiResult<Json<Value>> {
    let period = StatsPeriod::parse(query.period.as_deref());
    let now = Utc::now();
    let start = period.start(now);

    let breakdown = state.expenses.category_totals(user.0, start, now).await?;
    let trend = state.expenses.daily_totals(user.0, start, now).await?;

    let stats = ExpenseStats::new(
        period,
        DateRange {
            start_date: start,
            end_date: now,
        },
        breakdown,
        trend,
    );

    Ok(Json(json!({
        "success": true,
        "stats": stats
    })))
}
