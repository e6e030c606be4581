//! Calendar arithmetic shared by the expander and the split tooling.

use chrono::{Datelike, NaiveDate, Weekday as ChronoWeekday};
use kairos_rfc::Weekday;

/// Returns the number of days in a month.
pub(crate) fn days_in_month(year: i32, month: u32) -> u32 {
    NaiveDate::from_ymd_opt(year, month + 1, 1)
        .or_else(|| NaiveDate::from_ymd_opt(year + 1, 1, 1))
        .and_then(|d| d.pred_opt())
        .map_or(31, |p| p.day())
}

/// Returns 366 for leap years, 365 otherwise.
pub(crate) fn days_in_year(year: i32) -> u32 {
    if NaiveDate::from_ymd_opt(year, 2, 29).is_some() {
        366
    } else {
        365
    }
}

/// Returns the number of ISO 8601 weeks (52 or 53) in an ISO week-numbering year.
pub(crate) fn iso_weeks_in_year(iso_year: i32) -> u32 {
    if NaiveDate::from_isoywd_opt(iso_year, 53, ChronoWeekday::Mon).is_some() {
        53
    } else {
        52
    }
}

/// Builds a date, clamping `day` to the length of the month (Jan 31 + 1 month = Feb 28/29).
pub(crate) fn clamped_date(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day.min(days_in_month(year, month)))
}

/// Returns the first day of the `week_start`-aligned week containing `date`.
pub(crate) fn week_start_of(date: NaiveDate, week_start: Weekday) -> NaiveDate {
    let offset = (i64::from(date.weekday().num_days_from_sunday())
        - i64::from(week_start.number_from_sunday()))
    .rem_euclid(7);
    date - chrono::TimeDelta::days(offset)
}

/// Months elapsed since year 0, used for closed-form month arithmetic.
pub(crate) fn month_index(date: NaiveDate) -> i64 {
    i64::from(date.year()) * 12 + i64::from(date.month0())
}

/// Inverse of [`month_index`]: returns `(year, month)` with a 1-based month.
pub(crate) fn year_month_from_index(index: i64) -> Option<(i32, u32)> {
    let year = i32::try_from(index.div_euclid(12)).ok()?;
    let month = u32::try_from(index.rem_euclid(12)).ok()? + 1;
    Some((year, month))
}

/// Resolves a possibly negative 1-based index against a period length.
///
/// `-1` is the last element, `0` and out-of-range values resolve to `None`.
pub(crate) fn resolve_signed_index(value: i32, len: u32) -> Option<u32> {
    let len = i64::from(len);
    let value = i64::from(value);
    let resolved = if value < 0 { len + value + 1 } else { value };
    if (1..=len).contains(&resolved) {
        u32::try_from(resolved).ok()
    } else {
        None
    }
}
