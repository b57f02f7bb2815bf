// Port traits define the full contract - many methods are for future use
#![allow(dead_code)]

//! Outbound hook dispatch port.

use almanac_domain::{
    CalendarTimestamp, HookDescriptor, Occurrence, OccurrenceSource, PhenomenonEffect,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::error::HookDispatchError;

// =============================================================================
// Dispatch Context
// =============================================================================

/// What a hook receives alongside its own descriptor.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HookDispatchContext {
    /// Shared by every hook fired from the same time advance.
    pub dispatch_id: Uuid,
    pub dispatched_at: DateTime<Utc>,
    pub calendar_id: String,
    /// The calendar's current time after the advance.
    pub current: CalendarTimestamp,
    pub source: OccurrenceSource,
    pub source_id: String,
    pub label: String,
    pub occurrence_start: CalendarTimestamp,
    pub occurrence_end: CalendarTimestamp,
    pub effects: Vec<PhenomenonEffect>,
}

impl HookDispatchContext {
    pub fn for_occurrence(
        dispatch_id: Uuid,
        dispatched_at: DateTime<Utc>,
        current: &CalendarTimestamp,
        occurrence: &Occurrence,
        effects: Vec<PhenomenonEffect>,
    ) -> Self {
        Self {
            dispatch_id,
            dispatched_at,
            calendar_id: current.calendar_id.clone(),
            current: current.clone(),
            source: occurrence.source,
            source_id: occurrence.source_id.clone(),
            label: occurrence.label.clone(),
            occurrence_start: occurrence.start.clone(),
            occurrence_end: occurrence.end.clone(),
            effects,
        }
    }
}

// =============================================================================
// Hook Dispatcher
// =============================================================================

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HookDispatcher: Send + Sync {
    async fn dispatch(
        &self,
        hook: &HookDescriptor,
        context: &HookDispatchContext,
    ) -> Result<(), HookDispatchError>;
}
