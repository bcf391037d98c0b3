//! Calendar boundaries used for limits and report periods.
//!
//! Weeks start on Sunday. Boundaries are computed in the time zone of `now`
//! and returned in UTC.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};

fn local_midnight<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> DateTime<Utc> {
    let naive = date.and_hms_opt(0, 0, 0).unwrap_or_default();
    match tz.from_local_datetime(&naive).earliest() {
        Some(local) => local.with_timezone(&Utc),
        // Midnight skipped by a DST transition.
        None => Utc.from_utc_datetime(&naive),
    }
}

/// Midnight of the most recent Sunday.
pub fn beginning_of_week<Tz: TimeZone>(now: &DateTime<Tz>) -> DateTime<Utc> {
    let today = now.date_naive();
    let offset = i64::from(today.weekday().num_days_from_sunday());
    local_midnight(&now.timezone(), today - Duration::days(offset))
}

/// Midnight of the first day of the current month.
pub fn beginning_of_month<Tz: TimeZone>(now: &DateTime<Tz>) -> DateTime<Utc> {
    let today = now.date_naive();
    let first = NaiveDate::from_ymd_opt(today.year(), today.month(), 1).unwrap_or(today);
    local_midnight(&now.timezone(), first)
}

/// Midnight of the first day of the next month.
pub fn beginning_of_next_month<Tz: TimeZone>(now: &DateTime<Tz>) -> DateTime<Utc> {
    let today = now.date_naive();
    let (year, month) = if today.month() == 12 {
        (today.year() + 1, 1)
    } else {
        (today.year(), today.month() + 1)
    };
    let first = NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(today);
    local_midnight(&now.timezone(), first)
}

/// Midnight of January 1st of the current year.
pub fn beginning_of_year<Tz: TimeZone>(now: &DateTime<Tz>) -> DateTime<Utc> {
    let today = now.date_naive();
    let first = NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today);
    local_midnight(&now.timezone(), first)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 30, 0).unwrap()
    }

    #[test]
    fn week_starts_on_sunday() {
        // 2024-05-15 is a Wednesday.
        let now = at(2024, 5, 15, 10);
        assert_eq!(
            beginning_of_week(&now),
            Utc.with_ymd_and_hms(2024, 5, 12, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn sunday_is_its_own_week_start() {
        let now = at(2024, 5, 12, 23);
        assert_eq!(
            beginning_of_week(&now),
            Utc.with_ymd_and_hms(2024, 5, 12, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn month_and_year_boundaries() {
        let now = at(2024, 12, 20, 8);
        assert_eq!(
            beginning_of_month(&now),
            Utc.with_ymd_and_hms(2024, 12, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(
            beginning_of_next_month(&now),
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(
            beginning_of_year(&now),
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
        );
    }
}
