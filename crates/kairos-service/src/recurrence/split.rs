//! Rule rewriting for bulk modifications ("this and following").

use chrono::{DateTime, Utc};
use kairos_rfc::RecurrenceRule;

use super::expander::RuleExpander;
use crate::error::{ServiceError, ServiceResult};

/// Rules produced by splitting a series at one of its occurrences.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitRules {
    /// Original rule ending at the last candidate before the split.
    /// `None` when the split is at the first candidate.
    pub truncated: Option<RecurrenceRule>,
    /// Rule for the continuation segment, anchored at the split date.
    /// `None` when the original count is already exhausted.
    pub continuation: Option<RecurrenceRule>,
}

/// Returns true if `date` is a raw candidate of the series.
#[must_use]
pub fn is_occurrence(rule: &RecurrenceRule, anchor: DateTime<Utc>, date: DateTime<Utc>) -> bool {
    RuleExpander::new(Some(rule), anchor).is_candidate(date)
}

/// ## Summary
/// Splits `rule` so the series ends just before `split_date` and a new one
/// starts at it.
///
/// The continuation keeps frequency, interval, every BY* filter and `until`.
/// Its `count` is reduced by the candidates consumed before the split.
///
/// ## Errors
/// Returns `ServiceError::InvalidSplitDate` if `split_date` is not a raw
/// candidate of the series.
pub fn split_rule_at(
    rule: &RecurrenceRule,
    anchor: DateTime<Utc>,
    split_date: DateTime<Utc>,
) -> ServiceResult<SplitRules> {
    let expander = RuleExpander::new(Some(rule), anchor);
    if !expander.is_candidate(split_date) {
        return Err(ServiceError::InvalidSplitDate(format!(
            "{split_date} is not an occurrence of {rule}"
        )));
    }

    let truncated = expander.last_before(split_date).map(|last| {
        let mut truncated = rule.clone();
        truncated.until = Some(last);
        truncated
    });

    let continuation = match rule.count {
        Some(count) => count
            .checked_sub(expander.count_before(split_date))
            .filter(|remaining| *remaining > 0)
            .map(|remaining| rule.clone().with_count(remaining)),
        None => Some(rule.clone()),
    };

    tracing::debug!(
        rule = %rule,
        split_date = %split_date,
        truncated = ?truncated.as_ref().map(ToString::to_string),
        continuation = ?continuation.as_ref().map(ToString::to_string),
        "Split recurrence rule"
    );
    Ok(SplitRules {
        truncated,
        continuation,
    })
}
