use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::category::CategorySummary;
use crate::progress::BudgetProgress;
use crate::validation::{Errors, FieldError, Validate};

pub const DEFAULT_ALERT_THRESHOLD: i32 = 80;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "budget_period", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BudgetPeriod {
    Weekly,
    #[default]
    Monthly,
    Yearly,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryAllocation {
    pub category_id: Uuid,
    pub amount: Decimal,
    pub category: Option<CategorySummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Budget {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub amount: Decimal,
    pub period: BudgetPeriod,
    pub category_allocations: Vec<CategoryAllocation>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub alert_threshold: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Budget {
    /// Category ids the budget is restricted to; empty means every category.
    pub fn tracked_categories(&self) -> Vec<Uuid> {
        self.category_allocations
            .iter()
            .map(|a| a.category_id)
            .collect()
    }
}

/// A budget as served to clients: stored fields plus fresh progress.
#[derive(Debug, Clone, Serialize)]
pub struct BudgetView {
    #[serde(flatten)]
    pub budget: Budget,
    #[serde(flatten)]
    pub progress: BudgetProgress,
}

#[derive(Debug, Deserialize)]
pub struct AllocationRequest {
    pub category_id: Uuid,
    pub amount: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct BudgetRequest {
    pub name: String,
    pub amount: Decimal,
    pub period: Option<BudgetPeriod>,
    #[serde(default)]
    pub category_allocations: Vec<AllocationRequest>,
    #[serde(deserialize_with = "super::deserialize_datetime")]
    pub start_date: DateTime<Utc>,
    #[serde(deserialize_with = "super::deserialize_datetime")]
    pub end_date: DateTime<Utc>,
    pub alert_threshold: Option<i32>,
    pub is_active: Option<bool>,
}

impl Validate for BudgetRequest {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Errors::new();
        errors.length("name", &self.name, 1, 50);
        errors.amount("amount", "Amount", self.amount);
        errors.check(
            self.end_date > self.start_date,
            "end_date",
            "End date must be after start date",
        );
        if let Some(threshold) = self.alert_threshold {
            errors.check(
                (0..=100).contains(&threshold),
                "alert_threshold",
                "Alert threshold must be between 0 and 100",
            );
        }

        let mut seen = HashSet::new();
        for (i, allocation) in self.category_allocations.iter().enumerate() {
            errors.amount(
                &format!("category_allocations[{i}].amount"),
                "Category budget",
                allocation.amount,
            );
            if !seen.insert(allocation.category_id) {
                errors.push(
                    format!("category_allocations[{i}].category_id"),
                    "Category is allocated more than once",
                );
            }
        }
        errors.finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewAllocation {
    pub category_id: Uuid,
    pub amount: Decimal,
}

/// Normalised budget fields; used for insert and replace-style update.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBudget {
    pub name: String,
    pub amount: Decimal,
    pub period: BudgetPeriod,
    pub allocations: Vec<NewAllocation>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub alert_threshold: i32,
    pub is_active: bool,
}

impl From<BudgetRequest> for NewBudget {
    fn from(request: BudgetRequest) -> Self {
        Self {
            name: request.name.trim().to_string(),
            amount: request.amount,
            period: request.period.unwrap_or_default(),
            allocations: request
                .category_allocations
                .into_iter()
                .map(|a| NewAllocation {
                    category_id: a.category_id,
                    amount: a.amount,
                })
                .collect(),
            start_date: request.start_date,
            end_date: request.end_date,
            alert_threshold: request.alert_threshold.unwrap_or(DEFAULT_ALERT_THRESHOLD),
            is_active: request.is_active.unwrap_or(true),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BudgetFilter {
    pub period: Option<BudgetPeriod>,
    pub is_active: Option<bool>,
}

impl BudgetFilter {
    pub fn matches(&self, budget: &Budget) -> bool {
        self.period.map_or(true, |p| p == budget.period)
            && self.is_active.map_or(true, |a| a == budget.is_active)
    }
}

#[derive(Debug, Deserialize)]
pub struct BudgetQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub period: Option<BudgetPeriod>,
    pub is_active: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn request() -> BudgetRequest {
        let start = Utc::now();
        BudgetRequest {
            name: " Groceries ".into(),
            amount: dec!(400),
            period: None,
            category_allocations: vec![],
            start_date: start,
            end_date: start + Duration::days(30),
            alert_threshold: None,
            is_active: None,
        }
    }

    #[test]
    fn defaults_period_threshold_and_active_flag() {
        let draft = NewBudget::from(request());
        assert_eq!(draft.name, "Groceries");
        assert_eq!(draft.period, BudgetPeriod::Monthly);
        assert_eq!(draft.alert_threshold, 80);
        assert!(draft.is_active);
    }

    #[test]
    fn rejects_inverted_range_and_out_of_range_threshold() {
        let mut bad = request();
        bad.end_date = bad.start_date;
        bad.alert_threshold = Some(101);
        bad.amount = dec!(-5);
        let fields: Vec<_> = bad
            .validate()
            .unwrap_err()
            .into_iter()
            .map(|e| e.field)
            .collect();
        assert_eq!(fields, ["amount", "end_date", "alert_threshold"]);
    }

    #[test]
    fn rejects_repeated_and_non_positive_allocations() {
        let category = Uuid::new_v4();
        let mut bad = request();
        bad.category_allocations = vec![
            AllocationRequest {
                category_id: category,
                amount: dec!(50),
            },
            AllocationRequest {
                category_id: category,
                amount: dec!(0),
            },
        ];
        let fields: Vec<_> = bad
            .validate()
            .unwrap_err()
            .into_iter()
            .map(|e| e.field)
            .collect();
        assert_eq!(
            fields,
            [
                "category_allocations[1].amount",
                "category_allocations[1].category_id"
            ]
        );
    }

    #[test]
    fn period_parses_from_lowercase() {
        let period: BudgetPeriod = serde_json::from_str("\"yearly\"").unwrap();
        assert_eq!(period, BudgetPeriod::Yearly);
    }
}
