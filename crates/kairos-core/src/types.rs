use chrono::{DateTime, Utc};

use crate::error::{CoreError, CoreResult};

/// Identifier of a recurring object, override object, or chain segment.
///
/// Scoping by organization happens before ids reach the engine, so an id is
/// globally unique within one store snapshot.
pub type ObjectId = uuid::Uuid;

/// Inclusive query window `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// ## Summary
    /// Creates a window, rejecting one whose end precedes its start.
    ///
    /// ## Errors
    /// Returns `CoreError::InvalidInput` if `end < start`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> CoreResult<Self> {
        if end < start {
            return Err(CoreError::InvalidInput(format!(
                "window end {end} precedes window start {start}"
            )));
        }
        Ok(Self { start, end })
    }

    /// ## Summary
    /// Returns true if `instant` lies within the window, both ends inclusive.
    #[must_use]
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant <= self.end
    }
}
