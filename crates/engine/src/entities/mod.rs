//! Entity modules - Domain capability encapsulation.
//!
//! Each module wraps operations for a domain entity type.
//! They depend on repository ports and provide the building blocks for use cases.

pub mod calendar;
pub mod schedule;

pub use calendar::{Calendar, CalendarError};
pub use schedule::{log_skipped, Schedule};
