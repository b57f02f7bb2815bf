//! Use cases - User story orchestration across entities.
//!
//! Each use case resolves the active calendar through the `Calendar` entity,
//! pulls occurrences through `Schedule`, and leaves the calendar math to the
//! domain crate.

pub mod time;
pub mod upcoming;

pub use time::{
    AdvanceTime, AdvanceTimeError, AdvanceTimeOutcome, FailedHook, SetTimestamp,
    SetTimestampError, SetTimestampOutcome, TimeUseCases,
};
pub use upcoming::{UpcomingError, UpcomingListing, UpcomingOccurrences, UpcomingUseCases};
