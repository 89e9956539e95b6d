use crate::error::{BudgetEngineError, Result};
use chrono::{DateTime, Datelike, NaiveDate, TimeZone};

pub fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

/// Number of days in `month` (1-12) of `year`.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        _ => 28,
    }
}

pub fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, days_in_month(year, month))
}

/// Builds a date for `day` in the given month, falling back to the month's last day
/// when the month is shorter (the 31st in April lands on the 30th).
pub fn clamped_date(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    let day = day.clamp(1, days_in_month(year, month));
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Formats the calendar fields of `date` as `YYYY-MM-DD`.
///
/// For a `DateTime<Tz>` the fields are the ones observed in `Tz`, so a timestamp shortly
/// after local midnight in a positive UTC offset keeps its local day.
pub fn format_iso_date<D: Datelike>(date: &D) -> String {
    format!("{:04}-{:02}-{:02}", date.year(), date.month(), date.day())
}

/// The calendar date a timestamp falls on in its own timezone.
pub fn local_date<Tz: TimeZone>(timestamp: &DateTime<Tz>) -> NaiveDate {
    timestamp.date_naive()
}

pub fn parse_iso_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        BudgetEngineError::DateError(format!("Invalid date: {}. Expected YYYY-MM-DD", value))
    })
}

pub fn month_key<D: Datelike>(date: &D) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

/// (year, month) pairs for every calendar month touching `[start, end]`.
pub fn months_in_period(start: NaiveDate, end: NaiveDate) -> Vec<(i32, u32)> {
    let mut months = Vec::new();
    if end < start {
        return months;
    }

    let (mut year, mut month) = (start.year(), start.month());
    while (year, month) <= (end.year(), end.month()) {
        months.push((year, month));
        if month == 12 {
            year += 1;
            month = 1;
        } else {
            month += 1;
        }
    }

    months
}

/// `YYYY-MM` keys for each month overlapping `[start, end]`, inclusive at month
/// granularity. Empty when `end < start`.
pub fn get_months_between(start: NaiveDate, end: NaiveDate) -> Vec<String> {
    months_in_period(start, end)
        .into_iter()
        .map(|(year, month)| format!("{:04}-{:02}", year, month))
        .collect()
}

/// Shifts `date` by `months`, clamping the day to the target month's length.
pub fn add_months(date: NaiveDate, months: u32) -> Option<NaiveDate> {
    let total = date.year() * 12 + date.month0() as i32 + months as i32;
    let year = total.div_euclid(12);
    let month = total.rem_euclid(12) as u32 + 1;
    clamped_date(year, month, date.day())
}

/// Absolute calendar-day distance between two dates.
pub fn days_apart(a: NaiveDate, b: NaiveDate) -> i64 {
    (a - b).num_days().abs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_last_day_of_month() {
        assert_eq!(last_day_of_month(2023, 2), Some(date(2023, 2, 28)));
        assert_eq!(last_day_of_month(2024, 2), Some(date(2024, 2, 29)));
        assert_eq!(last_day_of_month(2023, 4), Some(date(2023, 4, 30)));
        assert_eq!(last_day_of_month(2023, 13), None);
    }

    #[test]
    fn test_leap_years() {
        assert!(is_leap_year(2024));
        assert!(is_leap_year(2000));
        assert!(!is_leap_year(1900));
        assert!(!is_leap_year(2026));
    }

    #[test]
    fn test_clamped_date() {
        assert_eq!(clamped_date(2026, 2, 31), Some(date(2026, 2, 28)));
        assert_eq!(clamped_date(2028, 2, 30), Some(date(2028, 2, 29)));
        assert_eq!(clamped_date(2026, 4, 31), Some(date(2026, 4, 30)));
        assert_eq!(clamped_date(2026, 1, 0), Some(date(2026, 1, 1)));
    }

    #[test]
    fn test_format_iso_date_uses_local_fields() {
        // 00:30 on Jan 15 in UTC+10 is still Jan 14 in UTC.
        let offset = FixedOffset::east_opt(10 * 3600).unwrap();
        let local = offset.with_ymd_and_hms(2026, 1, 15, 0, 30, 0).unwrap();

        assert_eq!(format_iso_date(&local), "2026-01-15");
        assert_eq!(local_date(&local), date(2026, 1, 15));
        assert_eq!(format_iso_date(&local.with_timezone(&Utc)), "2026-01-14");
        assert_eq!(format_iso_date(&date(987, 3, 4)), "0987-03-04");
    }

    #[test]
    fn test_get_months_between() {
        assert_eq!(
            get_months_between(date(2025, 11, 20), date(2026, 2, 3)),
            vec!["2025-11", "2025-12", "2026-01", "2026-02"]
        );
        assert_eq!(get_months_between(date(2026, 5, 31), date(2026, 5, 1)), Vec::<String>::new());
        assert_eq!(get_months_between(date(2026, 5, 31), date(2026, 5, 31)), vec!["2026-05"]);
    }

    #[test]
    fn test_add_months_clamps() {
        assert_eq!(add_months(date(2026, 1, 31), 1), Some(date(2026, 2, 28)));
        assert_eq!(add_months(date(2026, 11, 15), 3), Some(date(2027, 2, 15)));
        assert_eq!(add_months(date(2026, 3, 1), 0), Some(date(2026, 3, 1)));
    }

    #[test]
    fn test_days_apart() {
        assert_eq!(days_apart(date(2026, 1, 12), date(2026, 1, 15)), 3);
        assert_eq!(days_apart(date(2026, 1, 15), date(2026, 1, 12)), 3);
        assert_eq!(days_apart(date(2026, 2, 28), date(2026, 3, 1)), 1);
    }

    #[test]
    fn test_parse_iso_date() {
        assert_eq!(parse_iso_date("2026-01-15").unwrap(), date(2026, 1, 15));
        assert!(parse_iso_date("15/01/2026").is_err());
    }
}
