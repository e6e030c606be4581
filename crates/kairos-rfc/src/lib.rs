//! RFC 5545 recurrence rule values and their RRULE text form.

pub mod error;
pub mod rule;

pub use rule::{Frequency, RecurrenceRule, Weekday};
