//! Recurrence rule value type (RFC 5545 §3.3.10).

mod format;
mod parse;

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{RfcError, RfcResult};

/// Recurrence frequency.
///
/// Sub-daily frequencies are not part of the engine's model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "DAILY",
            Self::Weekly => "WEEKLY",
            Self::Monthly => "MONTHLY",
            Self::Yearly => "YEARLY",
        }
    }

    /// Parses a frequency from a string (case-insensitive).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s.trim().to_ascii_uppercase().as_str() {
            "DAILY" => Self::Daily,
            "WEEKLY" => Self::Weekly,
            "MONTHLY" => Self::Monthly,
            "YEARLY" => Self::Yearly,
            _ => return None,
        })
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Day of the week, ordered Sunday (0) through Saturday (6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Weekday {
    #[serde(rename = "SU")]
    Sunday,
    #[serde(rename = "MO")]
    Monday,
    #[serde(rename = "TU")]
    Tuesday,
    #[serde(rename = "WE")]
    Wednesday,
    #[serde(rename = "TH")]
    Thursday,
    #[serde(rename = "FR")]
    Friday,
    #[serde(rename = "SA")]
    Saturday,
}

impl Weekday {
    /// Returns the two-letter abbreviation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sunday => "SU",
            Self::Monday => "MO",
            Self::Tuesday => "TU",
            Self::Wednesday => "WE",
            Self::Thursday => "TH",
            Self::Friday => "FR",
            Self::Saturday => "SA",
        }
    }

    /// Parses a weekday from a two-letter abbreviation (case-insensitive).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s.trim().to_ascii_uppercase().as_str() {
            "SU" => Self::Sunday,
            "MO" => Self::Monday,
            "TU" => Self::Tuesday,
            "WE" => Self::Wednesday,
            "TH" => Self::Thursday,
            "FR" => Self::Friday,
            "SA" => Self::Saturday,
            _ => return None,
        })
    }

    /// Returns the normalized weekday code, 0 = Sunday through 6 = Saturday.
    #[must_use]
    pub const fn number_from_sunday(self) -> u8 {
        match self {
            Self::Sunday => 0,
            Self::Monday => 1,
            Self::Tuesday => 2,
            Self::Wednesday => 3,
            Self::Thursday => 4,
            Self::Friday => 5,
            Self::Saturday => 6,
        }
    }

    /// Builds a weekday from its normalized code (0 = Sunday).
    #[must_use]
    pub const fn from_number_from_sunday(n: u8) -> Option<Self> {
        Some(match n {
            0 => Self::Sunday,
            1 => Self::Monday,
            2 => Self::Tuesday,
            3 => Self::Wednesday,
            4 => Self::Thursday,
            5 => Self::Friday,
            6 => Self::Saturday,
            _ => return None,
        })
    }

    /// Converts from `chrono::Weekday`.
    #[must_use]
    pub const fn from_chrono(wd: chrono::Weekday) -> Self {
        match wd {
            chrono::Weekday::Sun => Self::Sunday,
            chrono::Weekday::Mon => Self::Monday,
            chrono::Weekday::Tue => Self::Tuesday,
            chrono::Weekday::Wed => Self::Wednesday,
            chrono::Weekday::Thu => Self::Thursday,
            chrono::Weekday::Fri => Self::Friday,
            chrono::Weekday::Sat => Self::Saturday,
        }
    }

    /// Converts to `chrono::Weekday`.
    #[must_use]
    pub const fn to_chrono(self) -> chrono::Weekday {
        match self {
            Self::Sunday => chrono::Weekday::Sun,
            Self::Monday => chrono::Weekday::Mon,
            Self::Tuesday => chrono::Weekday::Tue,
            Self::Wednesday => chrono::Weekday::Wed,
            Self::Thursday => chrono::Weekday::Thu,
            Self::Friday => chrono::Weekday::Fri,
            Self::Saturday => chrono::Weekday::Sat,
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recurrence rule attached to one series segment.
///
/// A rule is immutable once attached: splitting a series produces new rules
/// rather than editing this one. Every `by_*` set is a filter; an empty set
/// imposes no constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrenceRule {
    pub frequency: Frequency,

    /// Step size in units of `frequency`. Zero is coerced to 1 by the engine.
    pub interval: u32,

    /// Total occurrences allowed, cancelled ones included.
    pub count: Option<u32>,

    /// Inclusive upper bound on occurrence starts.
    pub until: Option<DateTime<Utc>>,

    pub by_weekday: BTreeSet<Weekday>,
    /// 1..=31, or -1..=-31 counting back from the month's last day.
    pub by_month_day: BTreeSet<i8>,
    pub by_month: BTreeSet<u8>,
    /// 1..=366, or -1..=-366 counting back from the year's last day.
    pub by_year_day: BTreeSet<i16>,
    /// ISO 8601 week numbers, negative values counting back from the last week.
    pub by_week_number: BTreeSet<i8>,
    pub by_hour: BTreeSet<u8>,
    pub by_minute: BTreeSet<u8>,
    pub by_second: BTreeSet<u8>,

    pub week_start: Weekday,
}

impl RecurrenceRule {
    /// Creates a rule with the given frequency, interval 1, and no bounds or filters.
    #[must_use]
    pub fn new(frequency: Frequency) -> Self {
        Self {
            frequency,
            interval: 1,
            count: None,
            until: None,
            by_weekday: BTreeSet::new(),
            by_month_day: BTreeSet::new(),
            by_month: BTreeSet::new(),
            by_year_day: BTreeSet::new(),
            by_week_number: BTreeSet::new(),
            by_hour: BTreeSet::new(),
            by_minute: BTreeSet::new(),
            by_second: BTreeSet::new(),
            week_start: Weekday::Monday,
        }
    }

    #[must_use]
    pub fn daily() -> Self {
        Self::new(Frequency::Daily)
    }

    #[must_use]
    pub fn weekly() -> Self {
        Self::new(Frequency::Weekly)
    }

    #[must_use]
    pub fn monthly() -> Self {
        Self::new(Frequency::Monthly)
    }

    #[must_use]
    pub fn yearly() -> Self {
        Self::new(Frequency::Yearly)
    }

    #[must_use]
    pub fn with_interval(mut self, interval: u32) -> Self {
        self.interval = interval;
        self
    }

    #[must_use]
    pub fn with_count(mut self, count: u32) -> Self {
        self.count = Some(count);
        self
    }

    #[must_use]
    pub fn with_until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    #[must_use]
    pub fn with_by_weekday(mut self, days: impl IntoIterator<Item = Weekday>) -> Self {
        self.by_weekday = days.into_iter().collect();
        self
    }

    #[must_use]
    pub fn with_by_month_day(mut self, days: impl IntoIterator<Item = i8>) -> Self {
        self.by_month_day = days.into_iter().collect();
        self
    }

    #[must_use]
    pub fn with_by_month(mut self, months: impl IntoIterator<Item = u8>) -> Self {
        self.by_month = months.into_iter().collect();
        self
    }

    #[must_use]
    pub fn with_by_year_day(mut self, days: impl IntoIterator<Item = i16>) -> Self {
        self.by_year_day = days.into_iter().collect();
        self
    }

    #[must_use]
    pub fn with_by_week_number(mut self, weeks: impl IntoIterator<Item = i8>) -> Self {
        self.by_week_number = weeks.into_iter().collect();
        self
    }

    #[must_use]
    pub fn with_by_hour(mut self, hours: impl IntoIterator<Item = u8>) -> Self {
        self.by_hour = hours.into_iter().collect();
        self
    }

    #[must_use]
    pub fn with_by_minute(mut self, minutes: impl IntoIterator<Item = u8>) -> Self {
        self.by_minute = minutes.into_iter().collect();
        self
    }

    #[must_use]
    pub fn with_by_second(mut self, seconds: impl IntoIterator<Item = u8>) -> Self {
        self.by_second = seconds.into_iter().collect();
        self
    }

    #[must_use]
    pub fn with_week_start(mut self, week_start: Weekday) -> Self {
        self.week_start = week_start;
        self
    }

    /// ## Summary
    /// Returns true if any day-selecting filter (weekday, month day, year day,
    /// week number) is set.
    #[must_use]
    pub fn has_day_filters(&self) -> bool {
        !self.by_weekday.is_empty()
            || !self.by_month_day.is_empty()
            || !self.by_year_day.is_empty()
            || !self.by_week_number.is_empty()
    }

    /// ## Summary
    /// Checks the rule the way the rule-creation validator does.
    ///
    /// The expansion engine never calls this; it tolerates rules that fail it.
    ///
    /// ## Errors
    /// Returns `RfcError::ValidationError` naming the first offending part.
    pub fn validate(&self) -> RfcResult<()> {
        if self.interval < 1 {
            return Err(RfcError::ValidationError(
                "Interval must be at least 1".to_string(),
            ));
        }
        check_signed("month day", self.by_month_day.iter().map(|d| i32::from(*d)), 31)?;
        check_signed("year day", self.by_year_day.iter().map(|d| i32::from(*d)), 366)?;
        check_signed(
            "week number",
            self.by_week_number.iter().map(|d| i32::from(*d)),
            53,
        )?;
        check_range("month", &self.by_month, 1, 12)?;
        check_range("hour", &self.by_hour, 0, 23)?;
        check_range("minute", &self.by_minute, 0, 59)?;
        check_range("second", &self.by_second, 0, 59)?;
        if self.count == Some(0) {
            return Err(RfcError::ValidationError(
                "Count must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

fn check_signed(what: &str, values: impl Iterator<Item = i32>, max: i32) -> RfcResult<()> {
    let invalid: Vec<String> = values
        .filter(|v| *v == 0 || v.abs() > max)
        .map(|v| v.to_string())
        .collect();
    if invalid.is_empty() {
        Ok(())
    } else {
        Err(RfcError::ValidationError(format!(
            "Invalid {what} values: {}. Must be between 1-{max} or -1 to -{max}",
            invalid.join(", ")
        )))
    }
}

fn check_range(what: &str, values: &BTreeSet<u8>, min: u8, max: u8) -> RfcResult<()> {
    let invalid: Vec<String> = values
        .iter()
        .filter(|v| **v < min || **v > max)
        .map(ToString::to_string)
        .collect();
    if invalid.is_empty() {
        Ok(())
    } else {
        Err(RfcError::ValidationError(format!(
            "Invalid {what} values: {}. Must be between {min}-{max}",
            invalid.join(", ")
        )))
    }
}
