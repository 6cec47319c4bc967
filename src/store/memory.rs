use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use super::{BudgetStore, CategoryStore, ExpenseStore, StoreError, StoreResult, UserStore};
use crate::models::budget::{Budget, BudgetFilter, CategoryAllocation, NewBudget};
use crate::models::category::{Category, CategorySummary, NewCategory};
use crate::models::expense::{Expense, ExpenseFilter, ExpenseView, NewExpense};
use crate::models::pagination::PageParams;
use crate::models::stats::{CategoryTotal, DailyTotal};
use crate::models::user::{NewUser, User};
use crate::progress::SpendQuery;

/// Process-local store used when no database is configured, and by tests.
///
/// Rows are kept in insertion order; budgets store bare allocations and are
/// joined with their categories on every read, like the SQL store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

#[derive(Debug, Default)]
struct Tables {
    users: Vec<User>,
    categories: Vec<Category>,
    expenses: Vec<Expense>,
    budgets: Vec<Budget>,
}

impl Tables {
    fn summary(&self, category_id: Uuid) -> Option<CategorySummary> {
        self.categories
            .iter()
            .find(|c| c.id == category_id)
            .map(CategorySummary::from)
    }

    fn expense_view(&self, expense: &Expense) -> ExpenseView {
        ExpenseView {
            expense: expense.clone(),
            category: self.summary(expense.category_id),
        }
    }

    fn populated(&self, budget: &Budget) -> Budget {
        let mut budget = budget.clone();
        for allocation in &mut budget.category_allocations {
            allocation.category = self.summary(allocation.category_id);
        }
        budget
    }

    fn expenses_in<'a>(
        &'a self,
        user_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> impl Iterator<Item = &'a Expense> + 'a {
        self.expenses
            .iter()
            .filter(move |e| e.user_id == user_id && e.date >= from && e.date <= to)
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".into()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".into()))
    }
}

fn page_of<T>(rows: Vec<T>, page: PageParams) -> Vec<T> {
    let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
    rows.into_iter()
        .skip(offset)
        .take(page.limit as usize)
        .collect()
}

fn allocations(budget: &NewBudget) -> Vec<CategoryAllocation> {
    budget
        .allocations
        .iter()
        .map(|a| CategoryAllocation {
            category_id: a.category_id,
            amount: a.amount,
            category: None,
        })
        .collect()
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert(&self, user: NewUser) -> StoreResult<User> {
        let mut tables = self.write()?;
        if tables.users.iter().any(|u| u.email == user.email) {
            return Err(StoreError::Duplicate);
        }
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            created_at: now,
            updated_at: now,
        };
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self.read()?.users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.read()?.users.iter().find(|u| u.id == id).cloned())
    }
}

#[async_trait]
impl CategoryStore for MemoryStore {
    async fn insert(&self, user_id: Uuid, category: NewCategory) -> StoreResult<Category> {
        let mut tables = self.write()?;
        if tables
            .categories
            .iter()
            .any(|c| c.user_id == user_id && c.name == category.name)
        {
            return Err(StoreError::Duplicate);
        }
        let now = Utc::now();
        let category = Category {
            id: Uuid::new_v4(),
            user_id,
            name: category.name,
            description: category.description,
            color: category.color,
            icon: category.icon,
            is_default: false,
            created_at: now,
            updated_at: now,
        };
        tables.categories.push(category.clone());
        Ok(category)
    }

    async fn list_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Category>> {
        let mut categories: Vec<_> = self
            .read()?
            .categories
            .iter()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Category>> {
        Ok(self.read()?.categories.iter().find(|c| c.id == id).cloned())
    }

    async fn update(&self, id: Uuid, category: NewCategory) -> StoreResult<Option<Category>> {
        let mut tables = self.write()?;
        let Some(owner) = tables.categories.iter().find(|c| c.id == id).map(|c| c.user_id) else {
            return Ok(None);
        };
        if tables
            .categories
            .iter()
            .any(|c| c.id != id && c.user_id == owner && c.name == category.name)
        {
            return Err(StoreError::Duplicate);
        }
        let Some(existing) = tables.categories.iter_mut().find(|c| c.id == id) else {
            return Ok(None);
        };
        existing.name = category.name;
        existing.description = category.description;
        existing.color = category.color;
        existing.icon = category.icon;
        existing.updated_at = Utc::now();
        Ok(Some(existing.clone()))
    }

    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        let mut tables = self.write()?;
        let before = tables.categories.len();
        tables.categories.retain(|c| c.id != id);
        Ok(tables.categories.len() != before)
    }
}

#[async_trait]
impl ExpenseStore for MemoryStore {
    async fn insert(&self, user_id: Uuid, expense: NewExpense) -> StoreResult<ExpenseView> {
        let mut tables = self.write()?;
        let now = Utc::now();
        let expense = Expense {
            id: Uuid::new_v4(),
            user_id,
            category_id: expense.category_id,
            title: expense.title,
            amount: expense.amount,
            description: expense.description,
            date: expense.date,
            payment_method: expense.payment_method,
            tags: expense.tags,
            created_at: now,
            updated_at: now,
        };
        tables.expenses.push(expense.clone());
        Ok(tables.expense_view(&expense))
    }

    async fn find(
        &self,
        user_id: Uuid,
        filter: &ExpenseFilter,
        page: PageParams,
    ) -> StoreResult<Vec<ExpenseView>> {
        let tables = self.read()?;
        let mut rows: Vec<&Expense> = tables
            .expenses
            .iter()
            .rev()
            .filter(|e| e.user_id == user_id && filter.matches(e))
            .collect();
        rows.sort_by(|a, b| b.date.cmp(&a.date));
        let views = rows.into_iter().map(|e| tables.expense_view(e)).collect();
        Ok(page_of(views, page))
    }

    async fn count(&self, user_id: Uuid, filter: &ExpenseFilter) -> StoreResult<i64> {
        let count = self
            .read()?
            .expenses
            .iter()
            .filter(|e| e.user_id == user_id && filter.matches(e))
            .count();
        Ok(count as i64)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<ExpenseView>> {
        let tables = self.read()?;
        Ok(tables
            .expenses
            .iter()
            .find(|e| e.id == id)
            .map(|e| tables.expense_view(e)))
    }

    async fn update(&self, id: Uuid, expense: NewExpense) -> StoreResult<Option<ExpenseView>> {
        let mut tables = self.write()?;
        let Some(existing) = tables.expenses.iter_mut().find(|e| e.id == id) else {
            return Ok(None);
        };
        existing.category_id = expense.category_id;
        existing.title = expense.title;
        existing.amount = expense.amount;
        existing.description = expense.description;
        existing.date = expense.date;
        existing.payment_method = expense.payment_method;
        existing.tags = expense.tags;
        existing.updated_at = Utc::now();
        let updated = existing.clone();
        Ok(Some(tables.expense_view(&updated)))
    }

    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        let mut tables = self.write()?;
        let before = tables.expenses.len();
        tables.expenses.retain(|e| e.id != id);
        Ok(tables.expenses.len() != before)
    }

    async fn sum_amount(&self, query: &SpendQuery) -> StoreResult<Decimal> {
        Ok(self
            .read()?
            .expenses
            .iter()
            .filter(|e| query.matches(e.user_id, e.category_id, e.date))
            .map(|e| e.amount)
            .sum())
    }

    async fn category_totals(
        &self,
        user_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreResult<Vec<CategoryTotal>> {
        let tables = self.read()?;
        let mut totals: Vec<CategoryTotal> = Vec::new();
        for expense in tables.expenses_in(user_id, from, to) {
            // Expenses whose category is gone drop out, as with an inner join.
            let Some(category) = tables.summary(expense.category_id) else {
                continue;
            };
            match totals.iter_mut().find(|t| t.category_id == category.id) {
                Some(total) => {
                    total.total += expense.amount;
                    total.count += 1;
                }
                None => totals.push(CategoryTotal {
                    category_id: category.id,
                    name: category.name,
                    color: category.color,
                    total: expense.amount,
                    count: 1,
                }),
            }
        }
        totals.sort_by(|a, b| b.total.cmp(&a.total));
        Ok(totals)
    }

    async fn daily_totals(
        &self,
        user_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreResult<Vec<DailyTotal>> {
        let tables = self.read()?;
        let mut days: BTreeMap<NaiveDate, (Decimal, i64)> = BTreeMap::new();
        for expense in tables.expenses_in(user_id, from, to) {
            let day = days
                .entry(expense.date.date_naive())
                .or_insert((Decimal::ZERO, 0));
            day.0 += expense.amount;
            day.1 += 1;
        }
        Ok(days
            .into_iter()
            .map(|(date, (total, count))| DailyTotal { date, total, count })
            .collect())
    }
}

#[async_trait]
impl BudgetStore for MemoryStore {
    async fn insert(&self, user_id: Uuid, budget: NewBudget) -> StoreResult<Budget> {
        let mut tables = self.write()?;
        if tables
            .budgets
            .iter()
            .any(|b| b.user_id == user_id && b.name == budget.name)
        {
            return Err(StoreError::Duplicate);
        }
        let now = Utc::now();
        let stored = Budget {
            id: Uuid::new_v4(),
            user_id,
            category_allocations: allocations(&budget),
            name: budget.name,
            amount: budget.amount,
            period: budget.period,
            start_date: budget.start_date,
            end_date: budget.end_date,
            alert_threshold: budget.alert_threshold,
            is_active: budget.is_active,
            created_at: now,
            updated_at: now,
        };
        tables.budgets.push(stored.clone());
        Ok(tables.populated(&stored))
    }

    async fn find(
        &self,
        user_id: Uuid,
        filter: &BudgetFilter,
        page: PageParams,
    ) -> StoreResult<Vec<Budget>> {
        let tables = self.read()?;
        // Reverse first so that ties on created_at keep the newest on top.
        let mut rows: Vec<&Budget> = tables
            .budgets
            .iter()
            .rev()
            .filter(|b| b.user_id == user_id && filter.matches(b))
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let budgets = rows.into_iter().map(|b| tables.populated(b)).collect();
        Ok(page_of(budgets, page))
    }

    async fn count(&self, user_id: Uuid, filter: &BudgetFilter) -> StoreResult<i64> {
        let count = self
            .read()?
            .budgets
            .iter()
            .filter(|b| b.user_id == user_id && filter.matches(b))
            .count();
        Ok(count as i64)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Budget>> {
        let tables = self.read()?;
        Ok(tables
            .budgets
            .iter()
            .find(|b| b.id == id)
            .map(|b| tables.populated(b)))
    }

    async fn update(&self, id: Uuid, budget: NewBudget) -> StoreResult<Option<Budget>> {
        let mut tables = self.write()?;
        let Some(owner) = tables.budgets.iter().find(|b| b.id == id).map(|b| b.user_id) else {
            return Ok(None);
        };
        if tables
            .budgets
            .iter()
            .any(|b| b.id != id && b.user_id == owner && b.name == budget.name)
        {
            return Err(StoreError::Duplicate);
        }
        let Some(existing) = tables.budgets.iter_mut().find(|b| b.id == id) else {
            return Ok(None);
        };
        existing.category_allocations = allocations(&budget);
        existing.name = budget.name;
        existing.amount = budget.amount;
        existing.period = budget.period;
        existing.start_date = budget.start_date;
        existing.end_date = budget.end_date;
        existing.alert_threshold = budget.alert_threshold;
        existing.is_active = budget.is_active;
        existing.updated_at = Utc::now();
        let updated = existing.clone();
        Ok(Some(tables.populated(&updated)))
    }

    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        let mut tables = self.write()?;
        let before = tables.budgets.len();
        tables.budgets.retain(|b| b.id != id);
        Ok(tables.budgets.len() != before)
    }
}
