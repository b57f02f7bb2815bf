//! In-memory storage adapter.
//!
//! One store implements every repository port so a single `Arc` can be handed
//! to the application as each of them. Calendars keep insertion order because
//! active-calendar resolution falls back to the first listed one; events and
//! phenomena are listed sorted by id so results never depend on map layout.

use almanac_domain::{CalendarEvent, CalendarSchema, CalendarTimestamp, Phenomenon};
use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::RwLock;

use crate::infrastructure::ports::{
    CalendarRepo, CalendarStateRepo, EventRepo, PhenomenonRepo, RepoError,
};

#[derive(Default)]
pub struct InMemoryAlmanacStore {
    calendars: RwLock<Vec<CalendarSchema>>,
    active_calendar: RwLock<Option<String>>,
    /// Current timestamp keyed by calendar id.
    timestamps: DashMap<String, CalendarTimestamp>,
    events: DashMap<String, CalendarEvent>,
    phenomena: DashMap<String, Phenomenon>,
}

impl InMemoryAlmanacStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn calendar_exists(&self, id: &str) -> bool {
        self.calendars.read().await.iter().any(|c| c.id() == id)
    }
}

#[async_trait]
impl CalendarRepo for InMemoryAlmanacStore {
    async fn get(&self, id: &str) -> Result<Option<CalendarSchema>, RepoError> {
        Ok(self
            .calendars
            .read()
            .await
            .iter()
            .find(|c| c.id() == id)
            .cloned())
    }

    async fn save(&self, schema: &CalendarSchema) -> Result<(), RepoError> {
        let mut calendars = self.calendars.write().await;
        match calendars.iter_mut().find(|c| c.id() == schema.id()) {
            Some(existing) => *existing = schema.clone(),
            None => calendars.push(schema.clone()),
        }
        Ok(())
    }

    async fn list(&self) -> Result<Vec<CalendarSchema>, RepoError> {
        Ok(self.calendars.read().await.clone())
    }

    async fn get_global_default(&self) -> Result<Option<CalendarSchema>, RepoError> {
        Ok(self
            .calendars
            .read()
            .await
            .iter()
            .find(|c| c.is_default_global())
            .cloned())
    }
}

#[async_trait]
impl CalendarStateRepo for InMemoryAlmanacStore {
    async fn active_calendar_id(&self) -> Result<Option<String>, RepoError> {
        Ok(self.active_calendar.read().await.clone())
    }

    async fn set_active_calendar(&self, calendar_id: &str) -> Result<(), RepoError> {
        if !self.calendar_exists(calendar_id).await {
            return Err(RepoError::not_found("Calendar", calendar_id));
        }
        *self.active_calendar.write().await = Some(calendar_id.to_string());
        Ok(())
    }

    async fn current_timestamp(
        &self,
        calendar_id: &str,
    ) -> Result<Option<CalendarTimestamp>, RepoError> {
        Ok(self.timestamps.get(calendar_id).map(|entry| entry.value().clone()))
    }

    async fn save_timestamp(&self, timestamp: &CalendarTimestamp) -> Result<(), RepoError> {
        if !self.calendar_exists(&timestamp.calendar_id).await {
            return Err(RepoError::not_found("Calendar", &timestamp.calendar_id));
        }
        self.timestamps
            .insert(timestamp.calendar_id.clone(), timestamp.clone());
        Ok(())
    }
}

#[async_trait]
impl EventRepo for InMemoryAlmanacStore {
    async fn list_for_calendar(&self, calendar_id: &str) -> Result<Vec<CalendarEvent>, RepoError> {
        let mut events: Vec<CalendarEvent> = self
            .events
            .iter()
            .filter(|entry| entry.value().details().calendar_id == calendar_id)
            .map(|entry| entry.value().clone())
            .collect();
        events.sort_by(|a, b| a.id().cmp(b.id()));
        Ok(events)
    }

    async fn save(&self, event: &CalendarEvent) -> Result<(), RepoError> {
        self.events.insert(event.id().to_string(), event.clone());
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), RepoError> {
        self.events
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| RepoError::not_found("Event", id))
    }
}

#[async_trait]
impl PhenomenonRepo for InMemoryAlmanacStore {
    async fn list_all(&self) -> Result<Vec<Phenomenon>, RepoError> {
        let mut phenomena: Vec<Phenomenon> =
            self.phenomena.iter().map(|entry| entry.value().clone()).collect();
        phenomena.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(phenomena)
    }

    async fn save(&self, phenomenon: &Phenomenon) -> Result<(), RepoError> {
        self.phenomena
            .insert(phenomenon.id.clone(), phenomenon.clone());
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), RepoError> {
        self.phenomena
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| RepoError::not_found("Phenomenon", id))
    }
}
