//! Calendar entity operations.

use std::sync::Arc;

use almanac_domain::{CalendarSchema, CalendarTimestamp};

use crate::infrastructure::ports::{CalendarRepo, CalendarStateRepo, RepoError};

#[derive(Debug, thiserror::Error)]
pub enum CalendarError {
    #[error("No calendars available")]
    NoCalendars,
    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),
}

/// Calendar entity operations.
pub struct Calendar {
    calendars: Arc<dyn CalendarRepo>,
    state: Arc<dyn CalendarStateRepo>,
}

impl Calendar {
    pub fn new(calendars: Arc<dyn CalendarRepo>, state: Arc<dyn CalendarStateRepo>) -> Self {
        Self { calendars, state }
    }

    pub async fn get(&self, id: &str) -> Result<Option<CalendarSchema>, RepoError> {
        self.calendars.get(id).await
    }

    pub async fn list(&self) -> Result<Vec<CalendarSchema>, RepoError> {
        self.calendars.list().await
    }

    /// Resolves the calendar time runs in.
    ///
    /// Order: the explicitly active calendar, then the global default, then
    /// the first stored calendar. An active id that no longer resolves is
    /// skipped with a warning.
    pub async fn active_schema(&self) -> Result<CalendarSchema, CalendarError> {
        if let Some(active_id) = self.state.active_calendar_id().await? {
            match self.calendars.get(&active_id).await? {
                Some(schema) => return Ok(schema),
                None => tracing::warn!(
                    calendar_id = %active_id,
                    "Active calendar not found, falling back to default"
                ),
            }
        }

        if let Some(schema) = self.calendars.get_global_default().await? {
            return Ok(schema);
        }

        self.calendars
            .list()
            .await?
            .into_iter()
            .next()
            .ok_or(CalendarError::NoCalendars)
    }

    /// Current time in `schema`, or its epoch when nothing has been stored yet.
    pub async fn current_timestamp(
        &self,
        schema: &CalendarSchema,
    ) -> Result<CalendarTimestamp, RepoError> {
        Ok(self
            .state
            .current_timestamp(schema.id())
            .await?
            .unwrap_or_else(|| schema.epoch_timestamp()))
    }

    pub async fn save_timestamp(&self, timestamp: &CalendarTimestamp) -> Result<(), RepoError> {
        self.state.save_timestamp(timestamp).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::ports::{MockCalendarRepo, MockCalendarStateRepo};

    fn entity(calendars: MockCalendarRepo, state: MockCalendarStateRepo) -> Calendar {
        Calendar::new(Arc::new(calendars), Arc::new(state))
    }

    #[tokio::test]
    async fn explicit_active_calendar_wins() {
        let mut state = MockCalendarStateRepo::new();
        state
            .expect_active_calendar_id()
            .returning(|| Ok(Some("harptos".to_string())));

        let mut calendars = MockCalendarRepo::new();
        calendars
            .expect_get()
            .withf(|id| id == "harptos")
            .returning(|_| Ok(Some(CalendarSchema::harptos())));
        calendars.expect_get_global_default().times(0);

        let schema = entity(calendars, state).active_schema().await.expect("resolve");
        assert_eq!(schema.id(), "harptos");
    }

    #[tokio::test]
    async fn dangling_active_id_falls_back_to_global_default() {
        let mut state = MockCalendarStateRepo::new();
        state
            .expect_active_calendar_id()
            .returning(|| Ok(Some("deleted".to_string())));

        let mut calendars = MockCalendarRepo::new();
        calendars.expect_get().returning(|_| Ok(None));
        calendars
            .expect_get_global_default()
            .returning(|| Ok(Some(CalendarSchema::gregorian().as_default_global())));
        calendars.expect_list().times(0);

        let schema = entity(calendars, state).active_schema().await.expect("resolve");
        assert_eq!(schema.id(), "gregorian");
    }

    #[tokio::test]
    async fn first_listed_calendar_is_last_resort() {
        let mut state = MockCalendarStateRepo::new();
        state.expect_active_calendar_id().returning(|| Ok(None));

        let mut calendars = MockCalendarRepo::new();
        calendars.expect_get_global_default().returning(|| Ok(None));
        calendars
            .expect_list()
            .returning(|| Ok(vec![CalendarSchema::harptos(), CalendarSchema::gregorian()]));

        let schema = entity(calendars, state).active_schema().await.expect("resolve");
        assert_eq!(schema.id(), "harptos");
    }

    #[tokio::test]
    async fn no_calendars_is_an_error() {
        let mut state = MockCalendarStateRepo::new();
        state.expect_active_calendar_id().returning(|| Ok(None));

        let mut calendars = MockCalendarRepo::new();
        calendars.expect_get_global_default().returning(|| Ok(None));
        calendars.expect_list().returning(|| Ok(Vec::new()));

        let err = entity(calendars, state).active_schema().await.unwrap_err();
        assert!(matches!(err, CalendarError::NoCalendars));
    }

    #[tokio::test]
    async fn current_timestamp_defaults_to_epoch() {
        let mut state = MockCalendarStateRepo::new();
        state.expect_current_timestamp().returning(|_| Ok(None));

        let schema = CalendarSchema::harptos();
        let current = entity(MockCalendarRepo::new(), state)
            .current_timestamp(&schema)
            .await
            .expect("read");
        assert_eq!(current, schema.epoch_timestamp());
    }
}
