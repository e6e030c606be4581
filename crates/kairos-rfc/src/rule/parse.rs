//! RRULE text parsing.

use std::collections::BTreeSet;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use super::format::UNTIL_FORMAT;
use super::{Frequency, RecurrenceRule, Weekday};
use crate::error::{RfcError, RfcResult};

impl FromStr for RecurrenceRule {
    type Err = RfcError;

    /// ## Summary
    /// Parses RRULE text such as `RRULE:FREQ=MONTHLY;BYMONTHDAY=-1`.
    ///
    /// The `RRULE:` prefix is optional and unknown rule parts are ignored.
    /// `COUNT` and `UNTIL` may both be present.
    ///
    /// ## Errors
    /// Returns `RfcError::ParseError` if `FREQ` is missing or unknown, or if
    /// any recognized part has a malformed value.
    fn from_str(s: &str) -> RfcResult<Self> {
        let s = s.trim();
        let body = s.strip_prefix("RRULE:").unwrap_or(s);

        let mut frequency = None;
        let mut parts = Vec::new();
        for part in body.split(';').filter(|p| !p.trim().is_empty()) {
            let (key, value) = part
                .split_once('=')
                .ok_or_else(|| RfcError::ParseError(format!("Malformed rule part: {part}")))?;
            let key = key.trim().to_ascii_uppercase();
            if key == "FREQ" {
                frequency = Some(
                    Frequency::parse(value)
                        .ok_or_else(|| RfcError::ParseError(format!("Unknown FREQ: {value}")))?,
                );
            } else {
                parts.push((key, value.trim()));
            }
        }

        let frequency = frequency.ok_or_else(|| RfcError::ParseError("Missing FREQ".to_string()))?;
        let mut rule = Self::new(frequency);
        for (key, value) in parts {
            parse_rule_part(&mut rule, &key, value)?;
        }

        tracing::trace!(rule = %rule, "Parsed recurrence rule");
        Ok(rule)
    }
}

/// Parses a single RRULE key-value pair into `rule`.
fn parse_rule_part(rule: &mut RecurrenceRule, key: &str, value: &str) -> RfcResult<()> {
    match key {
        "INTERVAL" => rule.interval = parse_number(key, value)?,
        "COUNT" => rule.count = Some(parse_number(key, value)?),
        "UNTIL" => rule.until = Some(parse_until(value)?),
        "WKST" => {
            rule.week_start = Weekday::parse(value)
                .ok_or_else(|| RfcError::ParseError(format!("Invalid WKST: {value}")))?;
        }
        "BYDAY" => rule.by_weekday = parse_weekdays(value)?,
        "BYMONTHDAY" => rule.by_month_day = parse_list(key, value)?,
        "BYMONTH" => rule.by_month = parse_list(key, value)?,
        "BYYEARDAY" => rule.by_year_day = parse_list(key, value)?,
        "BYWEEKNO" => rule.by_week_number = parse_list(key, value)?,
        "BYHOUR" => rule.by_hour = parse_list(key, value)?,
        "BYMINUTE" => rule.by_minute = parse_list(key, value)?,
        "BYSECOND" => rule.by_second = parse_list(key, value)?,
        _ => {
            tracing::trace!(key, "Ignoring unknown rule part");
        }
    }
    Ok(())
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> RfcResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_err| RfcError::ParseError(format!("Invalid {key} value: {value}")))
}

/// Parses a comma-separated list of integers.
fn parse_list<T: FromStr + Ord>(key: &str, value: &str) -> RfcResult<BTreeSet<T>> {
    value.split(',').map(|v| parse_number(key, v)).collect()
}

/// Parses a comma-separated list of two-letter weekday codes.
///
/// Ordinal prefixes (`1MO`, `-1FR`) are not part of the engine's model and
/// are rejected.
fn parse_weekdays(value: &str) -> RfcResult<BTreeSet<Weekday>> {
    value
        .split(',')
        .map(|v| {
            Weekday::parse(v).ok_or_else(|| RfcError::ParseError(format!("Invalid weekday: {v}")))
        })
        .collect()
}

/// Parses `UNTIL` as a UTC date-time, or as a date meaning the end of that day.
fn parse_until(value: &str) -> RfcResult<DateTime<Utc>> {
    let value = value.trim();
    if value.contains('T') {
        let naive = NaiveDateTime::parse_from_str(value, UNTIL_FORMAT)
            .or_else(|_err| NaiveDateTime::parse_from_str(value, "%Y%m%dT%H%M%S"))
            .map_err(|_err| RfcError::ParseError(format!("Invalid UNTIL: {value}")))?;
        Ok(naive.and_utc())
    } else {
        NaiveDate::parse_from_str(value, "%Y%m%d")
            .ok()
            .and_then(|date| date.and_hms_opt(23, 59, 59))
            .map(|dt| dt.and_utc())
            .ok_or_else(|| RfcError::ParseError(format!("Invalid UNTIL: {value}")))
    }
}
