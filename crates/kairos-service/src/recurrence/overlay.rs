//! Applies per-date exceptions to raw candidates.

use chrono::{DateTime, TimeDelta, Utc};
use kairos_core::types::ObjectId;

use crate::model::{ExceptionKind, ExceptionMap, Occurrence, normalize_occurrence_date};

/// ## Summary
/// Turns raw candidates of one segment into effective occurrences.
///
/// Cancelled candidates are dropped, modified ones are replaced by their
/// override object, everything else becomes `(raw, raw + duration)`.
/// Exceptions matching no candidate are never consulted.
#[derive(Debug, Clone, Copy)]
pub struct ExceptionOverlay<'a> {
    exceptions: &'a ExceptionMap,
    duration: TimeDelta,
    segment_id: ObjectId,
}

impl<'a> ExceptionOverlay<'a> {
    #[must_use]
    pub fn new(exceptions: &'a ExceptionMap, duration: TimeDelta, segment_id: ObjectId) -> Self {
        Self {
            exceptions,
            duration,
            segment_id,
        }
    }

    /// Resolves a single raw candidate. `None` means it was cancelled.
    #[must_use]
    pub fn apply(&self, raw: DateTime<Utc>) -> Option<Occurrence> {
        match self
            .exceptions
            .get(&normalize_occurrence_date(raw))
            .map(|e| &e.kind)
        {
            Some(ExceptionKind::Cancelled) => {
                tracing::trace!(occurrence_date = %raw, "Occurrence cancelled");
                None
            }
            Some(ExceptionKind::Modified(replacement)) => {
                tracing::trace!(
                    occurrence_date = %raw,
                    override_id = %replacement.id,
                    "Occurrence modified"
                );
                Some(Occurrence::modified(raw, replacement, self.segment_id))
            }
            None => Some(Occurrence::regular(raw, self.duration, self.segment_id)),
        }
    }

    #[must_use]
    pub fn overlay<I>(&self, raw: I) -> impl Iterator<Item = Occurrence>
    where
        I: IntoIterator<Item = DateTime<Utc>>,
    {
        raw.into_iter().filter_map(|candidate| self.apply(candidate))
    }
}
