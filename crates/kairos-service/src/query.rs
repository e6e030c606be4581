//! Public occurrence query.

use chrono::{DateTime, TimeDelta, Utc};
use kairos_core::config::{EngineConfig, Settings};
use kairos_core::error::CoreResult;
use kairos_core::types::{ObjectId, TimeWindow};

use crate::model::Occurrence;
use crate::recurrence::{ChainWalker, SegmentResolver, SeriesSnapshot};
use crate::store::SeriesStore;

/// ## Summary
/// Entry point expanding a recurring object into concrete occurrences.
///
/// Every call reads one snapshot of the series from the store and is
/// otherwise pure. Failures are absorbed: a missing object, a broken chain, or
/// an inverted window all produce an empty or partial list.
#[derive(Debug, Clone, Default)]
pub struct OccurrenceQuery {
    engine: EngineConfig,
}

impl OccurrenceQuery {
    #[must_use]
    pub fn new(engine: EngineConfig) -> Self {
        Self { engine }
    }

    /// ## Summary
    /// Builds a query from loaded settings.
    ///
    /// ## Errors
    /// Returns `CoreError::ConfigError` if the engine limits are invalid.
    pub fn from_settings(settings: &Settings) -> CoreResult<Self> {
        settings.engine.validate()?;
        Ok(Self::new(settings.engine.clone()))
    }

    #[must_use]
    pub fn engine(&self) -> &EngineConfig {
        &self.engine
    }

    fn walker(&self) -> ChainWalker {
        ChainWalker::new(SegmentResolver::new(self.engine.safety_cap))
    }

    /// ## Summary
    /// Returns the occurrences of the series rooted at `root_id` whose start
    /// lies in `[window_start, window_end]`, across its whole bulk-modification
    /// chain, ordered by start.
    ///
    /// `max_occurrences` defaults to the configured cap.
    #[must_use]
    #[tracing::instrument(skip_all, fields(root_id = %root_id, window_start = %window_start, window_end = %window_end))]
    pub fn get_occurrences<S: SeriesStore>(
        &self,
        store: &S,
        root_id: ObjectId,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
        max_occurrences: Option<u32>,
    ) -> Vec<Occurrence> {
        if window_end < window_start {
            tracing::debug!("Inverted window, nothing to expand");
            return Vec::new();
        }
        let max = max_occurrences.unwrap_or(self.engine.default_max_occurrences);
        let max = usize::try_from(max).unwrap_or(usize::MAX);

        let snapshot = SeriesSnapshot::load(store, root_id);
        let occurrences = self.walker().walk(&snapshot, window_start, window_end, max);

        tracing::debug!(
            segments = snapshot.segments().len(),
            count = occurrences.len(),
            truncated = occurrences.len() >= max,
            "Expanded occurrences"
        );
        occurrences
    }

    /// Same as [`Self::get_occurrences`] over a validated window.
    #[must_use]
    pub fn get_occurrences_in<S: SeriesStore>(
        &self,
        store: &S,
        root_id: ObjectId,
        window: TimeWindow,
        max_occurrences: Option<u32>,
    ) -> Vec<Occurrence> {
        self.get_occurrences(store, root_id, window.start, window.end, max_occurrences)
    }

    /// ## Summary
    /// Returns the first occurrence starting strictly after `after`, searching
    /// up to the configured horizon.
    #[must_use]
    #[tracing::instrument(skip_all, fields(root_id = %root_id, after = %after))]
    pub fn next_occurrence<S: SeriesStore>(
        &self,
        store: &S,
        root_id: ObjectId,
        after: DateTime<Utc>,
    ) -> Option<Occurrence> {
        let window_start = after.checked_add_signed(TimeDelta::nanoseconds(1))?;
        let window_end = after
            .checked_add_signed(self.engine.next_occurrence_horizon())
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        let snapshot = SeriesSnapshot::load(store, root_id);
        self.walker()
            .walk(&snapshot, window_start, window_end, 1)
            .into_iter()
            .next()
    }
}

/// ## Summary
/// Expands a series with the default engine limits.
///
/// See [`OccurrenceQuery::get_occurrences`].
#[must_use]
pub fn get_occurrences<S: SeriesStore>(
    store: &S,
    root_id: ObjectId,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
    max_occurrences: u32,
) -> Vec<Occurrence> {
    OccurrenceQuery::default().get_occurrences(
        store,
        root_id,
        window_start,
        window_end,
        Some(max_occurrences),
    )
}
