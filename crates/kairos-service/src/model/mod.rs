//! Domain model consumed and produced by the occurrence engine.

mod entity;
mod exception;
mod occurrence;

pub use entity::{AvailableTime, BlockedTime, CalendarEvent, RecurringEntity};
pub use exception::{
    BulkModificationLink, Exception, ExceptionKind, ExceptionMap, OverrideObject, exception_map,
    normalize_occurrence_date,
};
pub use occurrence::{ExceptionType, Occurrence, occurrences_to_json};
