//! Persistence ports.
//!
//! Each resource has a store trait; `PgStore` implements all of them over
//! PostgreSQL and `MemoryStore` over in-process maps. Reads that the API
//! serves with related data (expense categories, budget allocation
//! categories) come back already joined.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use crate::models::budget::{Budget, BudgetFilter, NewBudget};
use crate::models::category::{Category, NewCategory};
use crate::models::expense::{ExpenseFilter, ExpenseView, NewExpense};
use crate::models::pagination::PageParams;
use crate::models::stats::{CategoryTotal, DailyTotal};
use crate::models::user::{NewUser, User};
use crate::progress::SpendQuery;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness rule was violated (email, category name, budget name).
    #[error("duplicate key")]
    Duplicate,
    #[error("database error: {0}")]
    Database(sqlx::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Duplicate,
            _ => StoreError::Database(err),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert(&self, user: NewUser) -> StoreResult<User>;
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;
}

#[async_trait]
pub trait CategoryStore: Send + Sync {
    async fn insert(&self, user_id: Uuid, category: NewCategory) -> StoreResult<Category>;
    /// A user's categories sorted by name.
    async fn list_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Category>>;
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Category>>;
    async fn update(&self, id: Uuid, category: NewCategory) -> StoreResult<Option<Category>>;
    async fn delete(&self, id: Uuid) -> StoreResult<bool>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ExpenseStore: Send + Sync {
    async fn insert(&self, user_id: Uuid, expense: NewExpense) -> StoreResult<ExpenseView>;
    /// A page of a user's expenses, newest date first.
    async fn find(
        &self,
        user_id: Uuid,
        filter: &ExpenseFilter,
        page: PageParams,
    ) -> StoreResult<Vec<ExpenseView>>;
    async fn count(&self, user_id: Uuid, filter: &ExpenseFilter) -> StoreResult<i64>;
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<ExpenseView>>;
    async fn update(&self, id: Uuid, expense: NewExpense) -> StoreResult<Option<ExpenseView>>;
    async fn delete(&self, id: Uuid) -> StoreResult<bool>;
    /// Sum of the amounts selected by `query`; zero when nothing matches.
    async fn sum_amount(&self, query: &SpendQuery) -> StoreResult<Decimal>;
    /// Per-category totals in `[from, to]`, largest total first.
    async fn category_totals(
        &self,
        user_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreResult<Vec<CategoryTotal>>;
    /// Per-day (UTC) totals in `[from, to]`, oldest day first.
    async fn daily_totals(
        &self,
        user_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreResult<Vec<DailyTotal>>;
}

#[async_trait]
pub trait BudgetStore: Send + Sync {
    async fn insert(&self, user_id: Uuid, budget: NewBudget) -> StoreResult<Budget>;
    /// A page of a user's budgets, most recently created first.
    async fn find(
        &self,
        user_id: Uuid,
        filter: &BudgetFilter,
        page: PageParams,
    ) -> StoreResult<Vec<Budget>>;
    async fn count(&self, user_id: Uuid, filter: &BudgetFilter) -> StoreResult<i64>;
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Budget>>;
    async fn update(&self, id: Uuid, budget: NewBudget) -> StoreResult<Option<Budget>>;
    async fn delete(&self, id: Uuid) -> StoreResult<bool>;
}
