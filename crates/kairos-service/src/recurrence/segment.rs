//! Resolution of a single segment of a series.

use chrono::{DateTime, TimeDelta, Utc};
use kairos_core::config::DEFAULT_SAFETY_CAP;
use kairos_core::types::ObjectId;
use kairos_rfc::RecurrenceRule;

use super::expander::RuleExpander;
use super::overlay::ExceptionOverlay;
use crate::model::{ExceptionKind, ExceptionMap, Occurrence, RecurringEntity};

/// ## Summary
/// One contiguous span of a series governed by a single rule.
///
/// Raw candidates belong to the segment only when they fall in
/// `[start_boundary, end_boundary_exclusive)`.
#[derive(Debug, Clone)]
pub struct Segment {
    pub object_id: ObjectId,
    /// First occurrence start of the object.
    pub anchor: DateTime<Utc>,
    pub duration: TimeDelta,
    pub rule: Option<RecurrenceRule>,
    pub start_boundary: DateTime<Utc>,
    /// Split date of the link leaving this segment, if any.
    pub end_boundary_exclusive: Option<DateTime<Utc>>,
    pub exceptions: ExceptionMap,
    /// Arena index of the continuation segment.
    pub next: Option<usize>,
}

impl Segment {
    /// Builds an unbounded, unlinked segment from an entity.
    #[must_use]
    pub fn from_entity<E: RecurringEntity>(entity: &E, exceptions: ExceptionMap) -> Self {
        Self {
            object_id: entity.id(),
            anchor: entity.start_time(),
            duration: entity.duration(),
            rule: entity.recurrence_rule().cloned(),
            start_boundary: entity.start_time(),
            end_boundary_exclusive: None,
            exceptions,
            next: None,
        }
    }

    #[must_use]
    pub fn expander(&self, safety_cap: usize) -> RuleExpander<'_> {
        RuleExpander::new(self.rule.as_ref(), self.anchor).with_safety_cap(safety_cap)
    }

    #[must_use]
    pub fn contains_instant(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start_boundary
            && self
                .end_boundary_exclusive
                .is_none_or(|end| instant < end)
    }

    /// Last instant a raw candidate of this segment may take.
    fn last_instant(&self) -> Option<DateTime<Utc>> {
        self.end_boundary_exclusive
            .map(|end| end - TimeDelta::nanoseconds(1))
    }
}

/// ## Summary
/// Expands one segment and overlays its exceptions.
#[derive(Debug, Clone)]
pub struct SegmentResolver {
    safety_cap: usize,
}

impl Default for SegmentResolver {
    fn default() -> Self {
        Self::new(DEFAULT_SAFETY_CAP)
    }
}

impl SegmentResolver {
    #[must_use]
    pub fn new(safety_cap: usize) -> Self {
        Self { safety_cap }
    }

    /// ## Summary
    /// Returns the effective occurrences of `segment` whose start lies in
    /// `[window_start, window_end]`, ordered by start and capped at
    /// `max_occurrences`.
    ///
    /// Modified occurrences are matched on their raw date but windowed on
    /// their override start, so an override moved into the window from a
    /// raw date outside it is still returned.
    #[must_use]
    pub fn resolve(
        &self,
        segment: &Segment,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
        max_occurrences: usize,
    ) -> Vec<Occurrence> {
        if max_occurrences == 0 || window_end < window_start {
            return Vec::new();
        }

        let in_window = |instant: DateTime<Utc>| instant >= window_start && instant <= window_end;
        let expander = segment.expander(self.safety_cap);
        let overlay = ExceptionOverlay::new(&segment.exceptions, segment.duration, segment.object_id);

        let raw_start = window_start.max(segment.start_boundary);
        let raw_end = segment
            .last_instant()
            .map_or(window_end, |last| window_end.min(last));

        let mut occurrences: Vec<Occurrence> = if raw_start <= raw_end {
            overlay
                .overlay(expander.expand(raw_start, raw_end))
                .filter(|o| in_window(o.start))
                .collect()
        } else {
            Vec::new()
        };

        let raw_window = |instant: DateTime<Utc>| instant >= raw_start && instant <= raw_end;
        for exception in segment.exceptions.values() {
            let ExceptionKind::Modified(replacement) = &exception.kind else {
                continue;
            };
            if !in_window(replacement.start_time) {
                continue;
            }
            let Some(raw) = expander.candidate_in_second(exception.occurrence_date) else {
                continue;
            };
            if raw_window(raw) {
                continue;
            }
            if !segment.contains_instant(raw) {
                tracing::warn!(
                    segment_id = %segment.object_id,
                    occurrence_date = %raw,
                    "Modified exception lies outside its segment, ignoring"
                );
                continue;
            }
            occurrences.push(Occurrence::modified(raw, replacement, segment.object_id));
        }

        occurrences.sort_by_key(|o| (o.start, o.recurrence_id));
        occurrences.truncate(max_occurrences);

        tracing::trace!(
            segment_id = %segment.object_id,
            count = occurrences.len(),
            "Resolved segment"
        );
        occurrences
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CalendarEvent, Exception, OverrideObject, exception_map};
    use chrono::TimeZone;

    fn utc(m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, m, d, h, 0, 0).unwrap()
    }

    fn daily_segment() -> Segment {
        let event = CalendarEvent::new(ObjectId::now_v7(), "Daily", utc(3, 1, 9), utc(3, 1, 10))
            .with_recurrence_rule(RecurrenceRule::daily());
        Segment::from_entity(&event, ExceptionMap::new())
    }

    #[test_log::test]
    fn clips_to_window_and_cap() {
        let segment = daily_segment();
        let resolver = SegmentResolver::default();

        let got = resolver.resolve(&segment, utc(3, 5, 0), utc(3, 9, 23), 100);
        assert_eq!(got.len(), 5);
        assert_eq!(got[0].start, utc(3, 5, 9));

        let got = resolver.resolve(&segment, utc(3, 5, 0), utc(3, 9, 23), 2);
        assert_eq!(got.len(), 2);
        assert!(resolver.resolve(&segment, utc(3, 5, 0), utc(3, 9, 23), 0).is_empty());
    }

    #[test_log::test]
    fn end_boundary_is_exclusive() {
        let mut segment = daily_segment();
        segment.end_boundary_exclusive = Some(utc(3, 4, 9));
        let got = SegmentResolver::default().resolve(&segment, utc(3, 1, 0), utc(3, 31, 0), 100);
        assert_eq!(
            got.iter().map(|o| o.start).collect::<Vec<_>>(),
            vec![utc(3, 1, 9), utc(3, 2, 9), utc(3, 3, 9)]
        );
    }

    #[test_log::test]
    fn override_moved_into_window_is_returned() {
        let mut segment = daily_segment();
        let replacement = OverrideObject::new(utc(3, 10, 14), utc(3, 10, 15));
        segment.exceptions = exception_map([Exception::modified(
            segment.object_id,
            utc(3, 20, 9),
            replacement,
        )]);

        let got = SegmentResolver::default().resolve(&segment, utc(3, 10, 0), utc(3, 10, 23), 10);
        assert_eq!(got.len(), 2);
        assert_eq!(got[0].start, utc(3, 10, 9));
        assert_eq!(got[1].start, utc(3, 10, 14));
        assert_eq!(got[1].recurrence_id, utc(3, 20, 9));
    }

    #[test_log::test]
    fn override_moved_in_matches_subsecond_anchor() {
        let start = utc(3, 1, 9) + TimeDelta::milliseconds(500);
        let event =
            CalendarEvent::new(ObjectId::now_v7(), "Daily", start, start + TimeDelta::hours(1))
                .with_recurrence_rule(RecurrenceRule::daily());
        let mut segment = Segment::from_entity(&event, ExceptionMap::new());
        let replacement = OverrideObject::new(utc(3, 10, 14), utc(3, 10, 15));
        segment.exceptions = exception_map([Exception::modified(
            segment.object_id,
            utc(3, 20, 9) + TimeDelta::milliseconds(500),
            replacement,
        )]);

        let got = SegmentResolver::default().resolve(&segment, utc(3, 10, 12), utc(3, 10, 23), 10);
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].start, utc(3, 10, 14));
        assert_eq!(got[0].recurrence_id, utc(3, 20, 9) + TimeDelta::milliseconds(500));
    }

    #[test_log::test]
    fn override_moved_onto_sibling_sorts_by_original_date() {
        let mut segment = daily_segment();
        let replacement = OverrideObject::new(utc(3, 3, 9), utc(3, 3, 11));
        segment.exceptions = exception_map([Exception::modified(
            segment.object_id,
            utc(3, 2, 9),
            replacement,
        )]);

        let got = SegmentResolver::default().resolve(&segment, utc(3, 1, 0), utc(3, 4, 23), 10);
        assert_eq!(
            got.iter().map(|o| (o.start, o.recurrence_id)).collect::<Vec<_>>(),
            vec![
                (utc(3, 1, 9), utc(3, 1, 9)),
                (utc(3, 3, 9), utc(3, 2, 9)),
                (utc(3, 3, 9), utc(3, 3, 9)),
                (utc(3, 4, 9), utc(3, 4, 9)),
            ]
        );
        assert!(got[1].is_exception);
        assert!(!got[2].is_exception);
        assert!(got.windows(2).all(|w| w[0].start <= w[1].start));
    }

    #[test_log::test]
    fn override_moved_out_of_window_is_dropped() {
        let mut segment = daily_segment();
        let replacement = OverrideObject::new(utc(4, 10, 9), utc(4, 10, 10));
        segment.exceptions = exception_map([Exception::modified(
            segment.object_id,
            utc(3, 10, 9),
            replacement,
        )]);

        let got = SegmentResolver::default().resolve(&segment, utc(3, 10, 0), utc(3, 11, 23), 10);
        assert_eq!(got.iter().map(|o| o.start).collect::<Vec<_>>(), vec![utc(3, 11, 9)]);
    }

    #[test_log::test]
    fn single_object_passes_through() {
        let event = CalendarEvent::new(ObjectId::now_v7(), "Once", utc(3, 1, 9), utc(3, 1, 10));
        let segment = Segment::from_entity(&event, ExceptionMap::new());
        let resolver = SegmentResolver::default();
        assert_eq!(resolver.resolve(&segment, utc(3, 1, 0), utc(3, 2, 0), 10).len(), 1);
        assert!(resolver.resolve(&segment, utc(3, 2, 0), utc(3, 3, 0), 10).is_empty());
    }
}
