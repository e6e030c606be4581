//! Effective occurrences returned by the query.

use chrono::{DateTime, TimeDelta, Utc};
use kairos_core::types::ObjectId;
use serde::{Deserialize, Serialize};

use super::exception::OverrideObject;
use crate::error::ServiceResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExceptionType {
    Modified,
}

/// One concrete occurrence of a series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Occurrence {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub is_exception: bool,
    pub exception_type: Option<ExceptionType>,
    /// Segment of the chain that produced this occurrence.
    pub source_segment_id: ObjectId,
    /// Override object, for modified occurrences.
    pub override_object_id: Option<ObjectId>,
    /// Raw candidate start this occurrence was derived from.
    #[serde(skip)]
    pub recurrence_id: DateTime<Utc>,
}

impl Occurrence {
    /// An unmodified occurrence at `start`.
    #[must_use]
    pub fn regular(start: DateTime<Utc>, duration: TimeDelta, source_segment_id: ObjectId) -> Self {
        Self {
            start,
            end: start + duration,
            is_exception: false,
            exception_type: None,
            source_segment_id,
            override_object_id: None,
            recurrence_id: start,
        }
    }

    /// The occurrence at `recurrence_id`, replaced by `replacement`.
    #[must_use]
    pub fn modified(
        recurrence_id: DateTime<Utc>,
        replacement: &OverrideObject,
        source_segment_id: ObjectId,
    ) -> Self {
        Self {
            start: replacement.start_time,
            end: replacement.end_time,
            is_exception: true,
            exception_type: Some(ExceptionType::Modified),
            source_segment_id,
            override_object_id: Some(replacement.id),
            recurrence_id,
        }
    }

    #[must_use]
    pub fn duration(&self) -> TimeDelta {
        self.end - self.start
    }
}

/// ## Summary
/// Renders occurrences as a JSON array.
///
/// ## Errors
/// Returns `ServiceError::SerializationError` if serialization fails.
pub fn occurrences_to_json(occurrences: &[Occurrence]) -> ServiceResult<serde_json::Value> {
    Ok(serde_json::to_value(occurrences)?)
}
