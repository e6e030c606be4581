//! Bulk-modification chains: snapshot loading and traversal.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use kairos_core::types::ObjectId;

use super::segment::{Segment, SegmentResolver};
use crate::model::{Occurrence, RecurringEntity, exception_map};
use crate::store::SeriesStore;

/// ## Summary
/// Arena of the segments of one series, read from a store in a single pass.
///
/// Segments link forward by index. Index 0 is the root when the snapshot is
/// not empty.
#[derive(Debug, Clone, Default)]
pub struct SeriesSnapshot {
    segments: Vec<Segment>,
}

impl SeriesSnapshot {
    /// ## Summary
    /// Loads the root, every continuation, and every segment's exceptions.
    ///
    /// A missing root yields an empty snapshot. Loading stops at a missing
    /// continuation or at an object already loaded.
    #[must_use]
    pub fn load<S: SeriesStore>(store: &S, root_id: ObjectId) -> Self {
        let Some(mut current) = store.entity(root_id) else {
            tracing::debug!(root_id = %root_id, "Root object not found");
            return Self::default();
        };

        let mut segments = Vec::new();
        let mut loaded = HashSet::new();
        let mut start_boundary = current.start_time();
        loop {
            let id = current.id();
            loaded.insert(id);

            let link = store.bulk_link(id);
            let next = link.and_then(|link| {
                let continuation_id = link.continuation_id?;
                if loaded.contains(&continuation_id) {
                    tracing::warn!(
                        root_id = %root_id,
                        object_id = %continuation_id,
                        "Bulk modification chain cycles, stopping"
                    );
                    return None;
                }
                let Some(entity) = store.entity(continuation_id) else {
                    tracing::warn!(
                        root_id = %root_id,
                        continuation_id = %continuation_id,
                        "Continuation object missing, ignoring link"
                    );
                    return None;
                };
                Some((entity, link.split_date))
            });

            let mut segment = Segment::from_entity(&current, exception_map(store.exceptions(id)));
            segment.start_boundary = start_boundary;
            segment.end_boundary_exclusive = link.map(|link| link.split_date);
            segment.next = next.as_ref().map(|_next| segments.len() + 1);
            segments.push(segment);

            let Some((entity, split_date)) = next else {
                break;
            };
            current = entity;
            start_boundary = split_date;
        }

        tracing::trace!(root_id = %root_id, segments = segments.len(), "Loaded series snapshot");
        Self { segments }
    }

    /// Builds a snapshot from prepared segments. `segments[0]` is the root.
    #[must_use]
    pub fn from_segments(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns true if following `next` from the root revisits a segment.
    #[must_use]
    pub fn has_cycle(&self) -> bool {
        let mut visited = vec![false; self.segments.len()];
        let mut current = (!self.segments.is_empty()).then_some(0);
        while let Some(index) = current {
            let Some(seen) = visited.get_mut(index) else {
                return false;
            };
            if *seen {
                return true;
            }
            *seen = true;
            current = self.segments.get(index).and_then(|s| s.next);
        }
        false
    }

    /// Segments in chain order, starting at the root. Never revisits a segment.
    #[must_use]
    pub fn iter(&self) -> impl Iterator<Item = &Segment> {
        let mut visited = vec![false; self.segments.len()];
        let mut current = (!self.segments.is_empty()).then_some(0);
        std::iter::from_fn(move || {
            let index = current?;
            let seen = visited.get_mut(index)?;
            if *seen {
                return None;
            }
            *seen = true;
            let segment = self.segments.get(index)?;
            current = segment.next;
            Some(segment)
        })
    }
}

/// ## Summary
/// Resolves every segment of a chain and merges the results.
#[derive(Debug, Clone, Default)]
pub struct ChainWalker {
    resolver: SegmentResolver,
}

impl ChainWalker {
    #[must_use]
    pub fn new(resolver: SegmentResolver) -> Self {
        Self { resolver }
    }

    /// ## Summary
    /// Returns the first `max_occurrences` occurrences of the chain in the
    /// window, ordered by start.
    ///
    /// Each segment is resolved with the full cap and selection happens on the
    /// merged list: a moved override may start after the next split date.
    #[must_use]
    pub fn walk(
        &self,
        snapshot: &SeriesSnapshot,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
        max_occurrences: usize,
    ) -> Vec<Occurrence> {
        if max_occurrences == 0 {
            return Vec::new();
        }
        let mut occurrences: Vec<Occurrence> = snapshot
            .iter()
            .flat_map(|segment| {
                self.resolver
                    .resolve(segment, window_start, window_end, max_occurrences)
            })
            .collect();
        occurrences.sort_by_key(|o| (o.start, o.recurrence_id));
        if occurrences.len() > max_occurrences {
            tracing::debug!(max_occurrences, found = occurrences.len(), "Occurrence cap reached");
            occurrences.truncate(max_occurrences);
        }
        occurrences
    }
}
