use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::category::CategorySummary;
use crate::validation::{Errors, FieldError, Validate};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_method", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    Cash,
    Card,
    BankTransfer,
    DigitalWallet,
    Other,
}

#[derive(Debug, Clone, Serialize)]
pub struct Expense {
    pub id: Uuid,
    pub user_id: Uuid,
    pub category_id: Uuid,
    pub title: String,
    pub amount: Decimal,
    pub description: Option<String>,
    pub date: DateTime<Utc>,
    pub payment_method: PaymentMethod,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An expense with its category joined in. `category` is `None` when the
/// category has since been deleted.
#[derive(Debug, Clone, Serialize)]
pub struct ExpenseView {
    #[serde(flatten)]
    pub expense: Expense,
    pub category: Option<CategorySummary>,
}

#[derive(Debug, Deserialize)]
pub struct ExpenseRequest {
    pub title: String,
    pub amount: Decimal,
    pub description: Option<String>,
    pub category_id: Uuid,
    #[serde(deserialize_with = "super::deserialize_datetime")]
    pub date: DateTime<Utc>,
    pub payment_method: Option<PaymentMethod>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Validate for ExpenseRequest {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Errors::new();
        errors.length("title", &self.title, 1, 100);
        errors.amount("amount", "Amount", self.amount);
        if let Some(description) = &self.description {
            errors.length("description", description, 0, 500);
        }
        errors.check(
            self.date <= Utc::now(),
            "date",
            "Date cannot be in the future",
        );
        errors.finish()
    }
}

/// Normalised expense fields ready for the store; used for both insert and
/// replace-style update.
#[derive(Debug, Clone, PartialEq)]
pub struct NewExpense {
    pub category_id: Uuid,
    pub title: String,
    pub amount: Decimal,
    pub description: Option<String>,
    pub date: DateTime<Utc>,
    pub payment_method: PaymentMethod,
    pub tags: Vec<String>,
}

impl From<ExpenseRequest> for NewExpense {
    fn from(request: ExpenseRequest) -> Self {
        Self {
            category_id: request.category_id,
            title: request.title.trim().to_string(),
            amount: request.amount,
            description: request
                .description
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
            date: request.date,
            payment_method: request.payment_method.unwrap_or_default(),
            tags: request
                .tags
                .into_iter()
                .map(|t| t.trim().to_lowercase())
                .filter(|t| !t.is_empty())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpenseFilter {
    pub category_id: Option<Uuid>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    /// Case-insensitive substring matched against title and description.
    pub search: Option<String>,
}

impl ExpenseFilter {
    pub fn matches(&self, expense: &Expense) -> bool {
        if self.category_id.is_some_and(|id| id != expense.category_id) {
            return false;
        }
        if self.start_date.is_some_and(|start| expense.date < start) {
            return false;
        }
        if self.end_date.is_some_and(|end| expense.date > end) {
            return false;
        }
        match &self.search {
            Some(needle) => {
                let needle = needle.to_lowercase();
                expense.title.to_lowercase().contains(&needle)
                    || expense
                        .description
                        .as_deref()
                        .is_some_and(|d| d.to_lowercase().contains(&needle))
            }
            None => true,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ExpenseQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub category: Option<Uuid>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub search: Option<String>,
}
