//! The 30-day duty window.
//!
//! The Hijri side is a fixed-offset placeholder: day N of the window is
//! day N of Ramadhan 1446. Only the Gregorian dates are authoritative.

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

pub const WINDOW_DAYS: u32 = 30;
pub const HIJRI_MONTH: &str = "Ramadhan";
pub const HIJRI_YEAR: i32 = 1446;

const DAY_KEY_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CalendarDay {
    pub date_key: String,
    pub date: NaiveDate,
    pub day_name: String,
    /// 1-based offset from the start date.
    pub cycle_day: u32,
    pub gregorian_day: u32,
    pub gregorian_month: String,
    pub gregorian_year: i32,
    pub hijri_day: u32,
    pub hijri_month: String,
    pub hijri_year: i32,
}

impl CalendarDay {
    fn new(start: NaiveDate, offset: u32) -> Option<Self> {
        let date = start.checked_add_signed(Duration::days(i64::from(offset)))?;
        Some(Self {
            date_key: day_key(date),
            date,
            day_name: date.format("%A").to_string(),
            cycle_day: offset + 1,
            gregorian_day: date.day(),
            gregorian_month: date.format("%b").to_string(),
            gregorian_year: date.year(),
            hijri_day: offset + 1,
            hijri_month: HIJRI_MONTH.to_string(),
            hijri_year: HIJRI_YEAR,
        })
    }
}

/// Lazily yields the window starting at `start`; nothing when no start date is configured.
pub fn days(start: Option<NaiveDate>) -> impl Iterator<Item = CalendarDay> {
    let range = if start.is_some() { 0..WINDOW_DAYS } else { 0..0 };
    range.filter_map(move |offset| start.and_then(|s| CalendarDay::new(s, offset)))
}

/// Whether `date` is one of the window's days.
pub fn in_window(start: NaiveDate, date: NaiveDate) -> bool {
    let offset = date.signed_duration_since(start).num_days();
    (0..i64::from(WINDOW_DAYS)).contains(&offset)
}

pub fn day_key(date: NaiveDate) -> String {
    date.format(DAY_KEY_FORMAT).to_string()
}

/// Parses a canonical `YYYY-MM-DD` key. Non-padded forms such as `2025-3-1` and
/// signed wide years such as `+262142-12-20` are rejected, so a single day cannot be
/// stored under two keys and every window stays representable.
pub fn parse_day_key(key: &str) -> Result<NaiveDate, AppError> {
    let key = key.trim();
    Some(key)
        .filter(|k| k.len() == 10 && k.starts_with(|c: char| c.is_ascii_digit()))
        .and_then(|k| NaiveDate::parse_from_str(k, DAY_KEY_FORMAT).ok())
        .filter(|d| day_key(*d) == key)
        .ok_or_else(|| AppError::validation(format!("Invalid date '{key}', expected YYYY-MM-DD")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn march_first() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()
    }

    #[test]
    fn window_has_thirty_days_from_start() {
        let days: Vec<_> = days(Some(march_first())).collect();
        assert_eq!(days.len(), 30);
        assert_eq!(days[0].date_key, "2025-03-01");
        assert_eq!(days[29].date_key, "2025-03-30");
        assert_eq!(days[0].cycle_day, 1);
        assert_eq!(days[29].cycle_day, 30);
    }

    #[test]
    fn unconfigured_start_yields_nothing() {
        assert_eq!(days(None).count(), 0);
    }

    #[test]
    fn derives_weekday_and_display_fields() {
        let first = days(Some(march_first())).next().unwrap();
        assert_eq!(first.day_name, "Saturday");
        assert_eq!(first.gregorian_month, "Mar");
        assert_eq!(first.gregorian_day, 1);
        assert_eq!(first.hijri_month, "Ramadhan");
        assert_eq!(first.hijri_year, 1446);
    }

    #[test]
    fn window_crosses_month_boundary() {
        let start = NaiveDate::from_ymd_opt(2026, 2, 18).unwrap();
        let last = days(Some(start)).last().unwrap();
        assert_eq!(last.date_key, "2026-03-19");
        assert_eq!(last.hijri_day, 30);
    }

    #[test]
    fn day_keys_must_be_canonical() {
        assert_eq!(parse_day_key("2025-03-01").unwrap(), march_first());
        assert!(parse_day_key("2025-3-1").is_err());
        assert!(parse_day_key("2025-02-30").is_err());
        assert!(parse_day_key("tomorrow").is_err());
    }

    #[test]
    fn wide_years_are_not_day_keys() {
        assert!(parse_day_key("+262142-12-20").is_err());
        assert!(parse_day_key("-0001-01-01").is_err());
        assert!(parse_day_key("12025-03-01").is_err());
        assert!(parse_day_key("9999-12-31").is_ok());
    }

    #[test]
    fn window_at_the_end_of_the_calendar_stops_short() {
        let start = NaiveDate::MAX - Duration::days(10);
        assert_eq!(days(Some(start)).count(), 11);
    }

    #[test]
    fn membership_covers_exactly_thirty_days() {
        let start = march_first();
        assert!(in_window(start, start));
        assert!(in_window(start, NaiveDate::from_ymd_opt(2025, 3, 30).unwrap()));
        assert!(!in_window(start, NaiveDate::from_ymd_opt(2025, 3, 31).unwrap()));
        assert!(!in_window(start, NaiveDate::from_ymd_opt(2025, 2, 28).unwrap()));
        assert!(!in_window(start, NaiveDate::from_ymd_opt(2099, 1, 1).unwrap()));
    }
}
