//! Occurrence expansion engine.
//!
//! Data flows leaf-first: [`RuleExpander`] produces raw candidates,
//! [`ExceptionOverlay`] applies per-date exceptions, [`SegmentResolver`]
//! windows one segment, and [`ChainWalker`] merges the segments of a
//! bulk-modification chain.

mod calendar;
mod chain;
mod expander;
mod overlay;
mod segment;
mod split;

pub use chain::{ChainWalker, SeriesSnapshot};
pub use expander::{RawCandidates, RuleExpander};
pub use overlay::ExceptionOverlay;
pub use segment::{Segment, SegmentResolver};
pub use split::{SplitRules, is_occurrence, split_rule_at};
