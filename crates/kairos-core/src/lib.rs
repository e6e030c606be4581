//! Shared configuration, errors, and primitive types for the kairos
//! recurrence engine.

pub mod config;
pub mod error;
pub mod types;
