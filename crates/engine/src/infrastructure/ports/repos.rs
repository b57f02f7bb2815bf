// Port traits define the full contract - many methods are for future use
#![allow(dead_code)]

//! Repository port traits for calendar storage.

use almanac_domain::{CalendarEvent, CalendarSchema, CalendarTimestamp, Phenomenon};
use async_trait::async_trait;

use super::error::RepoError;

// =============================================================================
// Calendar Storage
// =============================================================================

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CalendarRepo: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<CalendarSchema>, RepoError>;
    async fn save(&self, schema: &CalendarSchema) -> Result<(), RepoError>;

    /// All stored calendars in insertion order.
    async fn list(&self) -> Result<Vec<CalendarSchema>, RepoError>;

    /// The calendar flagged `isDefaultGlobal`, if any.
    async fn get_global_default(&self) -> Result<Option<CalendarSchema>, RepoError>;
}

// =============================================================================
// Active Calendar State
// =============================================================================

/// Which calendar is active and where "now" is in each calendar.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CalendarStateRepo: Send + Sync {
    async fn active_calendar_id(&self) -> Result<Option<String>, RepoError>;
    async fn set_active_calendar(&self, calendar_id: &str) -> Result<(), RepoError>;

    async fn current_timestamp(
        &self,
        calendar_id: &str,
    ) -> Result<Option<CalendarTimestamp>, RepoError>;

    /// Stores the timestamp as the current time of its own calendar.
    async fn save_timestamp(&self, timestamp: &CalendarTimestamp) -> Result<(), RepoError>;
}

// =============================================================================
// Events and Phenomena
// =============================================================================

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventRepo: Send + Sync {
    async fn list_for_calendar(&self, calendar_id: &str) -> Result<Vec<CalendarEvent>, RepoError>;
    async fn save(&self, event: &CalendarEvent) -> Result<(), RepoError>;
    async fn delete(&self, id: &str) -> Result<(), RepoError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PhenomenonRepo: Send + Sync {
    /// Every phenomenon regardless of visibility; callers filter per calendar.
    async fn list_all(&self) -> Result<Vec<Phenomenon>, RepoError>;
    async fn save(&self, phenomenon: &Phenomenon) -> Result<(), RepoError>;
    async fn delete(&self, id: &str) -> Result<(), RepoError>;
}
