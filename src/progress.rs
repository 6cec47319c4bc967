//! Budget progress: how much of a budget has been spent.
//!
//! Progress is derived on every read from the expenses that fall inside the
//! budget's date range (both ends inclusive), optionally narrowed to the
//! budget's allocated categories. Nothing here is persisted.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::models::budget::Budget;
use crate::store::ExpenseStore;

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Selection of expenses counted towards a budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpendQuery {
    pub user_id: Uuid,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Empty means every category.
    pub category_ids: Vec<Uuid>,
}

impl SpendQuery {
    pub fn for_budget(budget: &Budget, user_id: Uuid) -> Self {
        Self {
            user_id,
            start: budget.start_date,
            end: budget.end_date,
            category_ids: budget.tracked_categories(),
        }
    }

    pub fn matches(&self, user_id: Uuid, category_id: Uuid, date: DateTime<Utc>) -> bool {
        user_id == self.user_id
            && date >= self.start
            && date <= self.end
            && (self.category_ids.is_empty() || self.category_ids.contains(&category_id))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BudgetProgress {
    pub spent_amount: Decimal,
    pub remaining_amount: Decimal,
    pub progress_percentage: Decimal,
}

impl BudgetProgress {
    /// Remaining floors at zero and the percentage is capped at 100, so an
    /// overspent budget reads as exactly full.
    pub fn from_spent(amount: Decimal, spent: Decimal) -> Self {
        let remaining_amount = amount
            .checked_sub(spent)
            .unwrap_or(Decimal::ZERO)
            .max(Decimal::ZERO);
        let progress_percentage = if amount <= Decimal::ZERO {
            Decimal::ZERO
        } else if spent >= amount {
            HUNDRED
        } else {
            // The ratio is below one here, so neither step can overflow.
            spent
                .checked_div(amount)
                .and_then(|ratio| ratio.checked_mul(HUNDRED))
                .unwrap_or(Decimal::ZERO)
                .max(Decimal::ZERO)
        };
        Self {
            spent_amount: spent,
            remaining_amount,
            progress_percentage,
        }
    }
}

/// Compute progress for `budget` as seen by `user_id`.
///
/// A failing aggregation counts as nothing spent so that one bad query does
/// not take down a whole budget listing. The failure is logged.
pub async fn compute_progress(
    expenses: &dyn ExpenseStore,
    budget: &Budget,
    user_id: Uuid,
) -> BudgetProgress {
    let query = SpendQuery::for_budget(budget, user_id);
    let spent = match expenses.sum_amount(&query).await {
        Ok(spent) => spent,
        Err(err) => {
            tracing::warn!(budget_id = %budget.id, error = %err, "spent amount unavailable, using 0");
            Decimal::ZERO
        }
    };
    BudgetProgress::from_spent(budget.amount, spent)
}
