//! Per-occurrence exceptions and bulk-modification links.

use std::collections::HashMap;

use chrono::{DateTime, SubsecRound, Utc};
use kairos_core::types::ObjectId;
use serde::{Deserialize, Serialize};

/// Concrete object replacing one occurrence of a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideObject {
    pub id: ObjectId,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl OverrideObject {
    #[must_use]
    pub fn new(start_time: DateTime<Utc>, end_time: DateTime<Utc>) -> Self {
        Self {
            id: ObjectId::now_v7(),
            start_time,
            end_time,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "type")]
pub enum ExceptionKind {
    /// The occurrence is suppressed. It still consumes the rule's count.
    Cancelled,
    /// The occurrence is replaced by an override object.
    Modified(OverrideObject),
}

/// An exception to one raw candidate of a recurring object.
///
/// Keyed by `(parent_id, occurrence_date)`; at most one exists per key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exception {
    pub parent_id: ObjectId,
    /// Original raw candidate start this exception overrides.
    pub occurrence_date: DateTime<Utc>,
    pub kind: ExceptionKind,
}

impl Exception {
    #[must_use]
    pub fn cancelled(parent_id: ObjectId, occurrence_date: DateTime<Utc>) -> Self {
        Self {
            parent_id,
            occurrence_date: normalize_occurrence_date(occurrence_date),
            kind: ExceptionKind::Cancelled,
        }
    }

    #[must_use]
    pub fn modified(
        parent_id: ObjectId,
        occurrence_date: DateTime<Utc>,
        replacement: OverrideObject,
    ) -> Self {
        Self {
            parent_id,
            occurrence_date: normalize_occurrence_date(occurrence_date),
            kind: ExceptionKind::Modified(replacement),
        }
    }

    #[must_use]
    pub fn replacement(&self) -> Option<&OverrideObject> {
        match &self.kind {
            ExceptionKind::Modified(replacement) => Some(replacement),
            ExceptionKind::Cancelled => None,
        }
    }
}

/// Exceptions of one object, keyed by normalized occurrence date.
pub type ExceptionMap = HashMap<DateTime<Utc>, Exception>;

/// Truncates to whole seconds so lookups match regardless of stored precision.
#[must_use]
pub fn normalize_occurrence_date(date: DateTime<Utc>) -> DateTime<Utc> {
    date.trunc_subsecs(0)
}

/// Builds an [`ExceptionMap`]. A later record for the same date replaces an earlier one.
#[must_use]
pub fn exception_map(exceptions: impl IntoIterator<Item = Exception>) -> ExceptionMap {
    exceptions
        .into_iter()
        .map(|e| (normalize_occurrence_date(e.occurrence_date), e))
        .collect()
}

/// Records that `root_id` was split at `split_date`.
///
/// `continuation_id` is `None` when everything from the split onward was
/// cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkModificationLink {
    pub root_id: ObjectId,
    pub continuation_id: Option<ObjectId>,
    pub split_date: DateTime<Utc>,
}
