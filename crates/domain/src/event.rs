//! Calendar events
//!
//! An event is either a single dated entry or a repeat rule with a time policy
//! and optional bounds. Both kinds produce [`Occurrence`]s on demand.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::hooks::{sort_hooks_by_priority, HookDescriptor};
use crate::occurrence::{
    ClockTime, Occurrence, OccurrenceBatch, OccurrenceSource, OccurrenceWindow, ScheduledTime,
    TimePolicy,
};
use crate::repeat_rule::{
    next_occurrence, occurrences_in_range, OccurrenceQuery, RangeQuery, RepeatRule,
    RepeatRuleServices,
};
use crate::schema::CalendarSchema;
use crate::timestamp::{compare_timestamps_with_schema, CalendarTimestamp, TimestampPrecision};

// =============================================================================
// Types
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FollowUpPolicy {
    Auto,
    Manual,
}

/// Fields shared by both event kinds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDetails {
    pub id: String,
    pub calendar_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follow_up_policy: Option<FollowUpPolicy>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hooks: Vec<HookDescriptor>,
    pub date: CalendarTimestamp,
    pub all_day: bool,
}

impl EventDetails {
    pub fn new(
        id: impl Into<String>,
        calendar_id: impl Into<String>,
        title: impl Into<String>,
        date: CalendarTimestamp,
    ) -> Self {
        let all_day = date.precision == TimestampPrecision::Day;
        Self {
            id: id.into(),
            calendar_id: calendar_id.into(),
            title: title.into(),
            description: None,
            note: None,
            category: None,
            tags: Vec::new(),
            priority: None,
            follow_up_policy: None,
            hooks: Vec::new(),
            date,
            all_day,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SingleEvent {
    #[serde(flatten)]
    pub details: EventDetails,
    pub time_precision: TimestampPrecision,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<ClockTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<ClockTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<i64>,
}

/// Inclusive limits on a recurring event's occurrences
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventBounds {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<CalendarTimestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<CalendarTimestamp>,
}

impl EventBounds {
    pub fn contains(&self, schema: &CalendarSchema, timestamp: &CalendarTimestamp) -> bool {
        let after_start = self.start.as_ref().map_or(true, |start| {
            compare_timestamps_with_schema(schema, timestamp, start) != Ordering::Less
        });
        let before_end = self.end.as_ref().map_or(true, |end| {
            compare_timestamps_with_schema(schema, timestamp, end) != Ordering::Greater
        });
        after_start && before_end
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurringEvent {
    #[serde(flatten)]
    pub details: EventDetails,
    pub rule: RepeatRule,
    pub time_policy: TimePolicy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<ClockTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset_minutes: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds: Option<EventBounds>,
}

impl RecurringEvent {
    pub fn scheduled_time(&self) -> ScheduledTime {
        ScheduledTime {
            policy: self.time_policy,
            start_time: self.start_time,
            offset_minutes: self.offset_minutes,
            duration_minutes: self.duration_minutes,
        }
    }

    fn bounds_contain(&self, schema: &CalendarSchema, timestamp: &CalendarTimestamp) -> bool {
        self.bounds
            .as_ref()
            .map_or(true, |bounds| bounds.contains(schema, timestamp))
    }

    /// Never searches before `bounds.start`. The caller's `include_start`
    /// applies to the clamped start as well.
    fn search_start(&self, schema: &CalendarSchema, start: &CalendarTimestamp) -> CalendarTimestamp {
        match self.bounds.as_ref().and_then(|b| b.start.as_ref()) {
            Some(bound) if compare_timestamps_with_schema(schema, start, bound) == Ordering::Less => {
                bound.clone()
            }
            _ => start.clone(),
        }
    }
}

/// A dated or recurring calendar entry, tagged by `kind` on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CalendarEvent {
    Single(SingleEvent),
    Recurring(RecurringEvent),
}

/// Creates a single event whose all-day flag and precision follow `date`.
pub fn create_single_event(
    id: impl Into<String>,
    calendar_id: impl Into<String>,
    title: impl Into<String>,
    date: CalendarTimestamp,
) -> SingleEvent {
    let time_precision = date.precision;
    SingleEvent {
        details: EventDetails::new(id, calendar_id, title, date),
        time_precision,
        start_time: None,
        end_time: None,
        duration_minutes: None,
    }
}

impl SingleEvent {
    pub fn with_times(mut self, start_time: ClockTime, end_time: Option<ClockTime>) -> Self {
        self.details.all_day = false;
        self.start_time = Some(start_time);
        self.end_time = end_time;
        self
    }

    pub fn with_duration(mut self, duration_minutes: i64) -> Self {
        self.duration_minutes = Some(duration_minutes);
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.details.priority = Some(priority);
        self
    }

    pub fn with_hooks(mut self, hooks: Vec<HookDescriptor>) -> Self {
        self.details.hooks = hooks;
        self
    }

    /// Resolves the concrete window of the event.
    ///
    /// An explicit end time earlier than (or equal to) the start time spans
    /// midnight. All-day events without any duration last one full day.
    pub fn window(&self, schema: &CalendarSchema) -> Result<OccurrenceWindow, DomainError> {
        let date = &self.details.date;
        let start = if self.details.all_day {
            date.clone()
        } else {
            let hour = self.start_time.map(|t| t.hour).or(date.hour).unwrap_or(0);
            let minute = self.start_time.map(|t| t.minute).or(date.minute).unwrap_or(0);
            CalendarTimestamp::at_minute(
                date.calendar_id.clone(),
                date.year,
                date.month_id.clone(),
                date.day,
                hour,
                minute,
            )
        };

        let mut duration = self.duration_minutes.unwrap_or(0);
        if let Some(end_time) = self.end_time {
            let minutes_per_hour = schema.minutes_per_hour();
            let start_minutes = self.start_time.unwrap_or_default().to_minutes(minutes_per_hour);
            let raw = end_time.to_minutes(minutes_per_hour) - start_minutes;
            let span = if raw <= 0 {
                schema.minutes_per_day() + raw
            } else {
                raw
            };
            duration = duration.max(span);
        }
        if duration <= 0 {
            duration = if self.details.all_day {
                schema.minutes_per_day()
            } else {
                0
            };
        }

        OccurrenceWindow::from_start(schema, start, duration)
    }
}

impl RecurringEvent {
    pub fn new(
        details: EventDetails,
        rule: RepeatRule,
        scheduled: ScheduledTime,
    ) -> Self {
        Self {
            details,
            rule,
            time_policy: scheduled.policy,
            start_time: scheduled.start_time,
            offset_minutes: scheduled.offset_minutes,
            duration_minutes: scheduled.duration_minutes,
            bounds: None,
        }
    }

    pub fn with_bounds(mut self, start: Option<CalendarTimestamp>, end: Option<CalendarTimestamp>) -> Self {
        self.bounds = Some(EventBounds { start, end });
        self
    }
}

// =============================================================================
// Occurrence Computation
// =============================================================================

impl CalendarEvent {
    pub fn details(&self) -> &EventDetails {
        match self {
            CalendarEvent::Single(event) => &event.details,
            CalendarEvent::Recurring(event) => &event.details,
        }
    }

    pub fn id(&self) -> &str {
        &self.details().id
    }

    pub fn title(&self) -> &str {
        &self.details().title
    }

    pub fn is_recurring(&self) -> bool {
        matches!(self, CalendarEvent::Recurring(_))
    }

    /// The date the event is anchored to: its date for single events, the
    /// lower bound (or date) for recurring ones.
    pub fn anchor_timestamp(&self) -> &CalendarTimestamp {
        match self {
            CalendarEvent::Single(event) => &event.details.date,
            CalendarEvent::Recurring(event) => event
                .bounds
                .as_ref()
                .and_then(|b| b.start.as_ref())
                .unwrap_or(&event.details.date),
        }
    }

    pub fn priority(&self) -> i32 {
        self.details().priority.unwrap_or(0)
    }

    /// Hooks in dispatch order.
    pub fn hooks(&self) -> Vec<HookDescriptor> {
        sort_hooks_by_priority(&self.details().hooks)
    }

    /// Next occurrence after `start`.
    ///
    /// A recurring event whose next rule date falls outside its bounds gets
    /// exactly one more attempt before yielding `None`.
    pub fn next_occurrence(
        &self,
        schema: &CalendarSchema,
        calendar_id: &str,
        start: &CalendarTimestamp,
        query: OccurrenceQuery,
        services: &RepeatRuleServices,
    ) -> Result<Option<Occurrence>, DomainError> {
        match self {
            CalendarEvent::Single(event) => {
                let included = match compare_timestamps_with_schema(schema, &event.details.date, start) {
                    Ordering::Greater => true,
                    Ordering::Equal => query.include_start,
                    Ordering::Less => false,
                };
                if included {
                    self.single_occurrence(schema, event).map(Some)
                } else {
                    Ok(None)
                }
            }
            CalendarEvent::Recurring(event) => {
                let effective_start = event.search_start(schema, start);
                let Some(base) = next_occurrence(
                    schema,
                    calendar_id,
                    &event.rule,
                    &effective_start,
                    query,
                    services,
                )?
                else {
                    return Ok(None);
                };

                if event.bounds_contain(schema, &base) {
                    return self.recurring_occurrence(schema, event, calendar_id, &base).map(Some);
                }

                let Some(end) = event.bounds.as_ref().and_then(|b| b.end.as_ref()) else {
                    return Ok(None);
                };
                if compare_timestamps_with_schema(schema, &base, end) != Ordering::Less {
                    return Ok(None);
                }
                let retry = next_occurrence(
                    schema,
                    calendar_id,
                    &event.rule,
                    &base,
                    OccurrenceQuery::exclusive(),
                    services,
                )?;
                match retry {
                    Some(next) if event.bounds_contain(schema, &next) => {
                        self.recurring_occurrence(schema, event, calendar_id, &next).map(Some)
                    }
                    _ => Ok(None),
                }
            }
        }
    }

    /// Occurrences between `range_start` and `range_end` (end inclusive).
    pub fn occurrences_in_range(
        &self,
        schema: &CalendarSchema,
        calendar_id: &str,
        range_start: &CalendarTimestamp,
        range_end: &CalendarTimestamp,
        query: RangeQuery,
        services: &RepeatRuleServices,
    ) -> Result<Vec<Occurrence>, DomainError> {
        let (start, end) = match compare_timestamps_with_schema(schema, range_start, range_end) {
            Ordering::Greater => (range_end, range_start),
            _ => (range_start, range_end),
        };

        match self {
            CalendarEvent::Single(event) => {
                if query.limit == 0 {
                    return Ok(Vec::new());
                }
                let date = &event.details.date;
                let after_start = match compare_timestamps_with_schema(schema, date, start) {
                    Ordering::Greater => true,
                    Ordering::Equal => query.include_start,
                    Ordering::Less => false,
                };
                let before_end = compare_timestamps_with_schema(schema, date, end) != Ordering::Greater;
                if after_start && before_end {
                    Ok(vec![self.single_occurrence(schema, event)?])
                } else {
                    Ok(Vec::new())
                }
            }
            CalendarEvent::Recurring(event) => {
                let effective_start = event.search_start(schema, start);
                if compare_timestamps_with_schema(schema, &effective_start, end) == Ordering::Greater {
                    return Ok(Vec::new());
                }
                let bases = occurrences_in_range(
                    schema,
                    calendar_id,
                    &event.rule,
                    &effective_start,
                    end,
                    query,
                    services,
                )?;
                bases
                    .iter()
                    .filter(|base| event.bounds_contain(schema, base))
                    .map(|base| self.recurring_occurrence(schema, event, calendar_id, base))
                    .collect()
            }
        }
    }

    fn single_occurrence(
        &self,
        schema: &CalendarSchema,
        event: &SingleEvent,
    ) -> Result<Occurrence, DomainError> {
        let window = event.window(schema)?;
        Ok(self.occurrence(
            OccurrenceSource::EventSingle,
            &event.details.calendar_id,
            window,
            event.details.all_day,
        ))
    }

    fn recurring_occurrence(
        &self,
        schema: &CalendarSchema,
        event: &RecurringEvent,
        calendar_id: &str,
        base: &CalendarTimestamp,
    ) -> Result<Occurrence, DomainError> {
        let window = event.scheduled_time().window(schema, calendar_id, base)?;
        Ok(self.occurrence(
            OccurrenceSource::EventRecurring,
            calendar_id,
            window,
            event.time_policy == TimePolicy::AllDay,
        ))
    }

    fn occurrence(
        &self,
        source: OccurrenceSource,
        calendar_id: &str,
        window: OccurrenceWindow,
        all_day: bool,
    ) -> Occurrence {
        let details = self.details();
        Occurrence {
            source,
            source_id: details.id.clone(),
            calendar_id: calendar_id.to_string(),
            label: details.title.clone(),
            category: details.category.clone(),
            start: window.start,
            end: window.end,
            duration_minutes: window.duration_minutes,
            all_day,
            priority: self.priority(),
            hooks: self.hooks(),
            effects: Vec::new(),
        }
    }
}

impl From<SingleEvent> for CalendarEvent {
    fn from(event: SingleEvent) -> Self {
        CalendarEvent::Single(event)
    }
}

impl From<RecurringEvent> for CalendarEvent {
    fn from(event: RecurringEvent) -> Self {
        CalendarEvent::Recurring(event)
    }
}

// =============================================================================
// Batch Helpers
// =============================================================================

/// Occurrences of every event in a range; failing events are skipped.
pub fn events_in_range(
    events: &[CalendarEvent],
    schema: &CalendarSchema,
    calendar_id: &str,
    range_start: &CalendarTimestamp,
    range_end: &CalendarTimestamp,
    query: RangeQuery,
    services: &RepeatRuleServices,
) -> OccurrenceBatch {
    let mut batch = OccurrenceBatch::default();
    for event in events {
        let result =
            event.occurrences_in_range(schema, calendar_id, range_start, range_end, query, services);
        if let Some(found) = batch.record(event.id(), result) {
            batch.occurrences.extend(found);
        }
    }
    batch
}

/// Next occurrence of every event from `from`; failing events are skipped.
pub fn next_event_occurrences(
    events: &[CalendarEvent],
    schema: &CalendarSchema,
    calendar_id: &str,
    from: &CalendarTimestamp,
    query: OccurrenceQuery,
    services: &RepeatRuleServices,
) -> OccurrenceBatch {
    let mut batch = OccurrenceBatch::default();
    for event in events {
        let result = event.next_occurrence(schema, calendar_id, from, query, services);
        if let Some(Some(found)) = batch.record(event.id(), result) {
            batch.occurrences.push(found);
        }
    }
    batch
}

// =============================================================================
// Tests
// =============================================================================
