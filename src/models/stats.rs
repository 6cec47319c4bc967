use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatsPeriod {
    Week,
    #[default]
    Month,
    Year,
}

impl StatsPeriod {
    /// Unknown keywords fall back to the current month.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("week") => StatsPeriod::Week,
            Some("year") => StatsPeriod::Year,
            _ => StatsPeriod::Month,
        }
    }

    pub fn start(self, now: DateTime<Utc>) -> DateTime<Utc> {
        let today = now.date_naive();
        let first = match self {
            StatsPeriod::Week => today - Duration::days(7),
            StatsPeriod::Month => today.with_day(1).unwrap_or(today),
            StatsPeriod::Year => NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today),
        };
        Utc.from_utc_datetime(&first.and_time(NaiveTime::MIN))
    }
}

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    pub period: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct CategoryTotal {
    pub category_id: Uuid,
    pub name: String,
    pub color: String,
    pub total: Decimal,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct DailyTotal {
    pub date: NaiveDate,
    pub total: Decimal,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DateRange {
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExpenseStats {
    pub total_expenses: Decimal,
    pub total_transactions: i64,
    pub category_breakdown: Vec<CategoryTotal>,
    pub daily_trend: Vec<DailyTotal>,
    pub period: StatsPeriod,
    pub date_range: DateRange,
}

impl ExpenseStats {
    /// Totals are derived from the category breakdown, so expenses whose
    /// category no longer exists are left out of both.
    pub fn new(
        period: StatsPeriod,
        date_range: DateRange,
        category_breakdown: Vec<CategoryTotal>,
        daily_trend: Vec<DailyTotal>,
    ) -> Self {
        let total_expenses = category_breakdown.iter().map(|c| c.total).sum();
        let total_transactions = category_breakdown.iter().map(|c| c.count).sum();
        Self {
            total_expenses,
            total_transactions,
            category_breakdown,
            daily_trend,
            period,
            date_range,
        }
    }
}
