use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{BudgetStore, CategoryStore, ExpenseStore, StoreResult, UserStore};
use crate::database::Database;
use crate::models::budget::{Budget, BudgetFilter, BudgetPeriod, CategoryAllocation, NewBudget};
use crate::models::category::{Category, CategorySummary, NewCategory};
use crate::models::expense::{Expense, ExpenseFilter, ExpenseView, NewExpense, PaymentMethod};
use crate::models::pagination::PageParams;
use crate::models::stats::{CategoryTotal, DailyTotal};
use crate::models::user::{NewUser, User};
use crate::progress::SpendQuery;

const EXPENSE_SELECT: &str = r#"
    SELECT
        e.id, e.user_id, e.category_id, e.title, e.amount, e.description,
        e.date, e.payment_method, e.tags, e.created_at, e.updated_at,
        c.name AS category_name, c.color AS category_color, c.icon AS category_icon
    FROM expenses e
    LEFT JOIN categories c ON c.id = e.category_id
"#;

const BUDGET_SELECT: &str = r#"
    SELECT id, user_id, name, amount, period, start_date, end_date,
           alert_threshold, is_active, created_at, updated_at
    FROM budgets
"#;

#[derive(Clone)]
pub struct PgStore {
    db: Database,
}

impl PgStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

fn summary(
    id: Uuid,
    name: Option<String>,
    color: Option<String>,
    icon: Option<String>,
) -> Option<CategorySummary> {
    Some(CategorySummary {
        id,
        name: name?,
        color: color?,
        icon: icon?,
    })
}

#[derive(FromRow)]
struct ExpenseRow {
    id: Uuid,
    user_id: Uuid,
    category_id: Uuid,
    title: String,
    amount: Decimal,
    description: Option<String>,
    date: DateTime<Utc>,
    payment_method: PaymentMethod,
    tags: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    category_name: Option<String>,
    category_color: Option<String>,
    category_icon: Option<String>,
}

impl From<ExpenseRow> for ExpenseView {
    fn from(row: ExpenseRow) -> Self {
        Self {
            category: summary(
                row.category_id,
                row.category_name,
                row.category_color,
                row.category_icon,
            ),
            expense: Expense {
                id: row.id,
                user_id: row.user_id,
                category_id: row.category_id,
                title: row.title,
                amount: row.amount,
                description: row.description,
                date: row.date,
                payment_method: row.payment_method,
                tags: row.tags,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
        }
    }
}

#[derive(FromRow)]
struct BudgetRow {
    id: Uuid,
    user_id: Uuid,
    name: String,
    amount: Decimal,
    period: BudgetPeriod,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    alert_threshold: i32,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct AllocationRow {
    budget_id: Uuid,
    category_id: Uuid,
    amount: Decimal,
    category_name: Option<String>,
    category_color: Option<String>,
    category_icon: Option<String>,
}

impl BudgetRow {
    fn into_budget(self, category_allocations: Vec<CategoryAllocation>) -> Budget {
        Budget {
            id: self.id,
            user_id: self.user_id,
            name: self.name,
            amount: self.amount,
            period: self.period,
            category_allocations,
            start_date: self.start_date,
            end_date: self.end_date,
            alert_threshold: self.alert_threshold,
            is_active: self.is_active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

fn push_expense_filter(qb: &mut QueryBuilder<'_, Postgres>, user_id: Uuid, filter: &ExpenseFilter) {
    qb.push(" WHERE e.user_id = ").push_bind(user_id);
    if let Some(category_id) = filter.category_id {
        qb.push(" AND e.category_id = ").push_bind(category_id);
    }
    if let Some(start) = filter.start_date {
        qb.push(" AND e.date >= ").push_bind(start);
    }
    if let Some(end) = filter.end_date {
        qb.push(" AND e.date <= ").push_bind(end);
    }
    if let Some(search) = &filter.search {
        let pattern = format!("%{}%", escape_like(search));
        qb.push(" AND (e.title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR e.description ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

fn push_budget_filter(qb: &mut QueryBuilder<'_, Postgres>, user_id: Uuid, filter: &BudgetFilter) {
    qb.push(" WHERE user_id = ").push_bind(user_id);
    if let Some(period) = filter.period {
        qb.push(" AND period = ").push_bind(period);
    }
    if let Some(is_active) = filter.is_active {
        qb.push(" AND is_active = ").push_bind(is_active);
    }
}

/// Escape LIKE metacharacters so search text matches literally.
fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

impl PgStore {
    async fn expense_view(&self, id: Uuid) -> StoreResult<Option<ExpenseView>> {
        let row = sqlx::query_as::<_, ExpenseRow>(&format!("{EXPENSE_SELECT} WHERE e.id = $1"))
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(row.map(ExpenseView::from))
    }

    /// Load allocations for `rows` in one query and assemble full budgets.
    async fn with_allocations(&self, rows: Vec<BudgetRow>) -> StoreResult<Vec<Budget>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let allocations = sqlx::query_as::<_, AllocationRow>(
            r#"
            SELECT
                a.budget_id, a.category_id, a.amount,
                c.name AS category_name, c.color AS category_color, c.icon AS category_icon
            FROM budget_allocations a
            LEFT JOIN categories c ON c.id = a.category_id
            WHERE a.budget_id = ANY($1)
            ORDER BY a.budget_id, a.position
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.db)
        .await?;

        let mut by_budget: HashMap<Uuid, Vec<CategoryAllocation>> = HashMap::new();
        for row in allocations {
            by_budget
                .entry(row.budget_id)
                .or_default()
                .push(CategoryAllocation {
                    category_id: row.category_id,
                    amount: row.amount,
                    category: summary(
                        row.category_id,
                        row.category_name,
                        row.category_color,
                        row.category_icon,
                    ),
                });
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let allocations = by_budget.remove(&row.id).unwrap_or_default();
                row.into_budget(allocations)
            })
            .collect())
    }

    async fn budget(&self, id: Uuid) -> StoreResult<Option<Budget>> {
        let row = sqlx::query_as::<_, BudgetRow>(&format!("{BUDGET_SELECT} WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        match row {
            Some(row) => Ok(self.with_allocations(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }
}

async fn insert_allocations(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    budget_id: Uuid,
    budget: &NewBudget,
) -> StoreResult<()> {
    for (position, allocation) in budget.allocations.iter().enumerate() {
        sqlx::query(
            "INSERT INTO budget_allocations (budget_id, category_id, amount, position) VALUES ($1, $2, $3, $4)",
        )
        .bind(budget_id)
        .bind(allocation.category_id)
        .bind(allocation.amount)
        .bind(position as i32)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

#[async_trait]
impl UserStore for PgStore {
    async fn insert(&self, user: NewUser) -> StoreResult<User> {
        let user = sqlx::query_as::<_, User>(
            "INSERT INTO users (id, name, email, password_hash) VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .fetch_one(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }
}

#[async_trait]
impl CategoryStore for PgStore {
    async fn insert(&self, user_id: Uuid, category: NewCategory) -> StoreResult<Category> {
        let category = sqlx::query_as::<_, Category>(
            r#"
            INSERT INTO categories (id, user_id, name, description, color, icon)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(&category.name)
        .bind(&category.description)
        .bind(&category.color)
        .bind(&category.icon)
        .fetch_one(&self.db)
        .await?;
        Ok(category)
    }

    async fn list_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT * FROM categories WHERE user_id = $1 ORDER BY name ASC",
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;
        Ok(categories)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Category>> {
        let category = sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(category)
    }

    async fn update(&self, id: Uuid, category: NewCategory) -> StoreResult<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(
            r#"
            UPDATE categories
            SET name = $1, description = $2, color = $3, icon = $4, updated_at = NOW()
            WHERE id = $5
            RETURNING *
            "#,
        )
        .bind(&category.name)
        .bind(&category.description)
        .bind(&category.color)
        .bind(&category.icon)
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(category)
    }

    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ExpenseStore for PgStore {
    async fn insert(&self, user_id: Uuid, expense: NewExpense) -> StoreResult<ExpenseView> {
        let id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO expenses
                (id, user_id, category_id, title, amount, description, date, payment_method, tags)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(expense.category_id)
        .bind(&expense.title)
        .bind(expense.amount)
        .bind(&expense.description)
        .bind(expense.date)
        .bind(expense.payment_method)
        .bind(&expense.tags)
        .execute(&self.db)
        .await?;

        self.expense_view(id)
            .await?
            .ok_or_else(|| sqlx::Error::RowNotFound.into())
    }

    async fn find(
        &self,
        user_id: Uuid,
        filter: &ExpenseFilter,
        page: PageParams,
    ) -> StoreResult<Vec<ExpenseView>> {
        let mut qb = QueryBuilder::<Postgres>::new(EXPENSE_SELECT);
        push_expense_filter(&mut qb, user_id, filter);
        qb.push(" ORDER BY e.date DESC, e.created_at DESC LIMIT ")
            .push_bind(i64::from(page.limit))
            .push(" OFFSET ")
            .push_bind(page.offset());

        let rows = qb.build_query_as::<ExpenseRow>().fetch_all(&self.db).await?;
        Ok(rows.into_iter().map(ExpenseView::from).collect())
    }

    async fn count(&self, user_id: Uuid, filter: &ExpenseFilter) -> StoreResult<i64> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM expenses e");
        push_expense_filter(&mut qb, user_id, filter);
        let count: i64 = qb.build_query_scalar().fetch_one(&self.db).await?;
        Ok(count)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<ExpenseView>> {
        self.expense_view(id).await
    }

    async fn update(&self, id: Uuid, expense: NewExpense) -> StoreResult<Option<ExpenseView>> {
        let result = sqlx::query(
            r#"
            UPDATE expenses
            SET category_id = $1, title = $2, amount = $3, description = $4, date = $5,
                payment_method = $6, tags = $7, updated_at = NOW()
            WHERE id = $8
            "#,
        )
        .bind(expense.category_id)
        .bind(&expense.title)
        .bind(expense.amount)
        .bind(&expense.description)
        .bind(expense.date)
        .bind(expense.payment_method)
        .bind(&expense.tags)
        .bind(id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.expense_view(id).await
    }

    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM expenses WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn sum_amount(&self, query: &SpendQuery) -> StoreResult<Decimal> {
        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT COALESCE(SUM(amount), 0) FROM expenses WHERE user_id = ",
        );
        qb.push_bind(query.user_id)
            .push(" AND date >= ")
            .push_bind(query.start)
            .push(" AND date <= ")
            .push_bind(query.end);
        if !query.category_ids.is_empty() {
            qb.push(" AND category_id = ANY(")
                .push_bind(query.category_ids.clone())
                .push(")");
        }
        let spent: Decimal = qb.build_query_scalar().fetch_one(&self.db).await?;
        Ok(spent)
    }

    async fn category_totals(
        &self,
        user_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreResult<Vec<CategoryTotal>> {
        let totals = sqlx::query_as::<_, CategoryTotal>(
            r#"
            SELECT
                c.id AS category_id,
                c.name,
                c.color,
                SUM(e.amount) AS total,
                COUNT(*) AS count
            FROM expenses e
            JOIN categories c ON c.id = e.category_id
            WHERE e.user_id = $1 AND e.date >= $2 AND e.date <= $3
            GROUP BY c.id, c.name, c.color
            ORDER BY total DESC
            "#,
        )
        .bind(user_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.db)
        .await?;
        Ok(totals)
    }

    async fn daily_totals(
        &self,
        user_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreResult<Vec<DailyTotal>> {
        let days = sqlx::query_as::<_, DailyTotal>(
            r#"
            SELECT
                (e.date AT TIME ZONE 'UTC')::date AS date,
                SUM(e.amount) AS total,
                COUNT(*) AS count
            FROM expenses e
            WHERE e.user_id = $1 AND e.date >= $2 AND e.date <= $3
            GROUP BY 1
            ORDER BY 1 ASC
            "#,
        )
        .bind(user_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.db)
        .await?;
        Ok(days)
    }
}

#[async_trait]
impl BudgetStore for PgStore {
    async fn insert(&self, user_id: Uuid, budget: NewBudget) -> StoreResult<Budget> {
        let id = Uuid::new_v4();
        let mut tx = self.db.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO budgets
                (id, user_id, name, amount, period, start_date, end_date, alert_threshold, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(&budget.name)
        .bind(budget.amount)
        .bind(budget.period)
        .bind(budget.start_date)
        .bind(budget.end_date)
        .bind(budget.alert_threshold)
        .bind(budget.is_active)
        .execute(&mut *tx)
        .await?;
        insert_allocations(&mut tx, id, &budget).await?;
        tx.commit().await?;

        self.budget(id)
            .await?
            .ok_or_else(|| sqlx::Error::RowNotFound.into())
    }

    async fn find(
        &self,
        user_id: Uuid,
        filter: &BudgetFilter,
        page: PageParams,
    ) -> StoreResult<Vec<Budget>> {
        let mut qb = QueryBuilder::<Postgres>::new(BUDGET_SELECT);
        push_budget_filter(&mut qb, user_id, filter);
        qb.push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(i64::from(page.limit))
            .push(" OFFSET ")
            .push_bind(page.offset());

        let rows = qb.build_query_as::<BudgetRow>().fetch_all(&self.db).await?;
        self.with_allocations(rows).await
    }

    async fn count(&self, user_id: Uuid, filter: &BudgetFilter) -> StoreResult<i64> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM budgets");
        push_budget_filter(&mut qb, user_id, filter);
        let count: i64 = qb.build_query_scalar().fetch_one(&self.db).await?;
        Ok(count)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Budget>> {
        self.budget(id).await
    }

    async fn update(&self, id: Uuid, budget: NewBudget) -> StoreResult<Option<Budget>> {
        let mut tx = self.db.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE budgets
            SET name = $1, amount = $2, period = $3, start_date = $4, end_date = $5,
                alert_threshold = $6, is_active = $7, updated_at = NOW()
            WHERE id = $8
            "#,
        )
        .bind(&budget.name)
        .bind(budget.amount)
        .bind(budget.period)
        .bind(budget.start_date)
        .bind(budget.end_date)
        .bind(budget.alert_threshold)
        .bind(budget.is_active)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        sqlx::query("DELETE FROM budget_allocations WHERE budget_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        insert_allocations(&mut tx, id, &budget).await?;
        tx.commit().await?;

        self.budget(id).await
    }

    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM budgets WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
