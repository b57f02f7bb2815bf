//! Upcoming occurrence listings for the active calendar.

use std::sync::Arc;

use almanac_domain::{sort_occurrences_by_timestamp, CalendarTimestamp, Occurrence, SkippedSource};

use crate::entities::{log_skipped, Calendar, CalendarError, Schedule};
use crate::infrastructure::ports::RepoError;

/// Container for upcoming use cases.
pub struct UpcomingUseCases {
    pub occurrences: Arc<UpcomingOccurrences>,
}

impl UpcomingUseCases {
    pub fn new(occurrences: Arc<UpcomingOccurrences>) -> Self {
        Self { occurrences }
    }
}

#[derive(Debug, Clone)]
pub struct UpcomingListing {
    pub calendar_id: String,
    pub from: CalendarTimestamp,
    pub occurrences: Vec<Occurrence>,
    pub skipped: Vec<SkippedSource>,
}

/// Next events and phenomena from the active calendar's current time.
///
/// Each event and each visible phenomenon contributes its next occurrence
/// (a match exactly at the current time counts). The merged list is sorted in
/// calendar order and cut to the limit.
pub struct UpcomingOccurrences {
    calendar: Arc<Calendar>,
    schedule: Arc<Schedule>,
    default_limit: usize,
}

impl UpcomingOccurrences {
    pub fn new(calendar: Arc<Calendar>, schedule: Arc<Schedule>, default_limit: usize) -> Self {
        Self {
            calendar,
            schedule,
            default_limit,
        }
    }

    pub async fn execute(&self, limit: Option<usize>) -> Result<UpcomingListing, UpcomingError> {
        let limit = limit.unwrap_or(self.default_limit);
        let schema = self.calendar.active_schema().await?;
        let from = self.calendar.current_timestamp(&schema).await?;

        let mut batch = self.schedule.upcoming_events(&schema, &from, limit).await?;
        batch.merge(self.schedule.upcoming_phenomena(&schema, &from, limit).await?);
        sort_occurrences_by_timestamp(&schema, &mut batch.occurrences);
        batch.occurrences.truncate(limit);

        log_skipped("upcoming_occurrences", schema.id(), &batch.skipped);
        tracing::debug!(
            calendar_id = %schema.id(),
            count = batch.occurrences.len(),
            limit,
            "Listed upcoming occurrences"
        );

        Ok(UpcomingListing {
            calendar_id: schema.id().to_string(),
            from,
            occurrences: batch.occurrences,
            skipped: batch.skipped,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum UpcomingError {
    #[error("Calendar error: {0}")]
    Calendar(#[from] CalendarError),
    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),
}
