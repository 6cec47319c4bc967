pub mod budget;
pub mod category;
pub mod expense;
pub mod pagination;
pub mod stats;
pub mod user;

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer};

/// Accepts RFC 3339 timestamps or bare `YYYY-MM-DD` dates (midnight UTC).
pub fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .map(|date| Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)))
}

/// Like [`parse_datetime`], but a bare date covers the whole day.
pub fn parse_datetime_end_of_day(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        let last = date.and_hms_nano_opt(23, 59, 59, 999_999_999)?;
        return Some(Utc.from_utc_datetime(&last));
    }
    parse_datetime(raw)
}

pub(crate) fn deserialize_datetime<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_datetime(&raw).ok_or_else(|| {
        serde::de::Error::custom(format!(
            "invalid date {raw:?}, expected RFC 3339 or YYYY-MM-DD"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn bare_dates_start_at_midnight() {
        let ts = parse_datetime("2024-03-01").unwrap();
        assert_eq!(ts.to_rfc3339(), "2024-03-01T00:00:00+00:00");
    }

    #[test]
    fn offsets_are_normalised_to_utc() {
        let ts = parse_datetime("2024-03-01T10:00:00+02:00").unwrap();
        assert_eq!(ts.hour(), 8);
    }

    #[test]
    fn end_of_day_covers_the_last_instant() {
        let ts = parse_datetime_end_of_day("2024-03-01").unwrap();
        assert_eq!((ts.hour(), ts.minute(), ts.second()), (23, 59, 59));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(parse_datetime("yesterday").is_none());
    }
}
