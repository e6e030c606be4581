//! Expansion of recurring events, blocked times and availability windows into
//! concrete occurrences, including per-occurrence exceptions and
//! "this and following" bulk-modification chains.

pub mod error;
pub mod model;
pub mod query;
pub mod recurrence;
pub mod store;

pub use query::{OccurrenceQuery, get_occurrences};
