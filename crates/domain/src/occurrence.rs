//! Occurrences and time-of-day policies
//!
//! An `Occurrence` is the concrete, timed instance of an event or phenomenon.
//! Occurrences are derived on demand from a rule and a schema and never stored.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::hooks::HookDescriptor;
use crate::phenomenon::PhenomenonEffect;
use crate::schema::CalendarSchema;
use crate::time_arithmetic::{advance_time, TimeUnit};
use crate::timestamp::{compare_timestamps_with_schema, CalendarTimestamp};

// =============================================================================
// Time Policy
// =============================================================================

/// How a rule's base date becomes a concrete start/end window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimePolicy {
    /// Starts at the base date; lasts one full day unless a duration is given
    AllDay,
    /// Snaps to a fixed clock time on the base date
    Fixed,
    /// Shifts the base date by a signed number of minutes
    Offset,
}

impl TimePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimePolicy::AllDay => "all_day",
            TimePolicy::Fixed => "fixed",
            TimePolicy::Offset => "offset",
        }
    }
}

impl fmt::Display for TimePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TimePolicy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all_day" => Ok(Self::AllDay),
            "fixed" => Ok(Self::Fixed),
            "offset" => Ok(Self::Offset),
            other => Err(DomainError::unsupported_time_policy(other)),
        }
    }
}

/// A clock time within a day
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockTime {
    pub hour: u32,
    #[serde(default)]
    pub minute: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub second: Option<u32>,
}

impl ClockTime {
    pub fn new(hour: u32, minute: u32) -> Self {
        Self {
            hour,
            minute,
            second: None,
        }
    }

    /// Minutes since midnight under the given hour length.
    pub fn to_minutes(&self, minutes_per_hour: u32) -> i64 {
        self.hour as i64 * minutes_per_hour as i64 + self.minute as i64
    }
}

/// Start and end of one occurrence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OccurrenceWindow {
    pub start: CalendarTimestamp,
    pub end: CalendarTimestamp,
    pub duration_minutes: i64,
}

impl OccurrenceWindow {
    /// Builds a window of `duration_minutes` from `start`; non-positive
    /// durations collapse to a zero-length window.
    pub fn from_start(
        schema: &CalendarSchema,
        start: CalendarTimestamp,
        duration_minutes: i64,
    ) -> Result<Self, DomainError> {
        let duration_minutes = duration_minutes.max(0);
        let end = if duration_minutes > 0 {
            advance_time(schema, &start, duration_minutes, TimeUnit::Minute)?.timestamp
        } else {
            start.clone()
        };
        Ok(Self {
            start,
            end,
            duration_minutes,
        })
    }
}

/// The time-of-day settings of a recurring event or a phenomenon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledTime {
    pub policy: TimePolicy,
    pub start_time: Option<ClockTime>,
    pub offset_minutes: Option<i64>,
    pub duration_minutes: Option<i64>,
}

impl ScheduledTime {
    pub fn all_day() -> Self {
        Self {
            policy: TimePolicy::AllDay,
            start_time: None,
            offset_minutes: None,
            duration_minutes: None,
        }
    }

    pub fn fixed(start_time: ClockTime, duration_minutes: Option<i64>) -> Self {
        Self {
            policy: TimePolicy::Fixed,
            start_time: Some(start_time),
            offset_minutes: None,
            duration_minutes,
        }
    }

    pub fn offset(offset_minutes: i64, duration_minutes: Option<i64>) -> Self {
        Self {
            policy: TimePolicy::Offset,
            start_time: None,
            offset_minutes: Some(offset_minutes),
            duration_minutes,
        }
    }

    /// Turns a base date produced by a repeat rule into a concrete window.
    ///
    /// Fixed clock times are clamped into the schema's day.
    pub fn window(
        &self,
        schema: &CalendarSchema,
        calendar_id: &str,
        base: &CalendarTimestamp,
    ) -> Result<OccurrenceWindow, DomainError> {
        match self.policy {
            TimePolicy::AllDay => {
                let duration = self.duration_minutes.unwrap_or_else(|| schema.minutes_per_day());
                OccurrenceWindow::from_start(schema, base.clone(), duration)
            }
            TimePolicy::Fixed => {
                let time = self.start_time.unwrap_or_default();
                let hour = time.hour.min(schema.hours_per_day().saturating_sub(1));
                let minute = time.minute.min(schema.minutes_per_hour().saturating_sub(1));
                let start = CalendarTimestamp::at_minute(
                    calendar_id,
                    base.year,
                    base.month_id.clone(),
                    base.day,
                    hour,
                    minute,
                );
                OccurrenceWindow::from_start(schema, start, self.duration_minutes.unwrap_or(0))
            }
            TimePolicy::Offset => {
                let offset = self.offset_minutes.unwrap_or(0);
                let start = advance_time(schema, base, offset, TimeUnit::Minute)?.timestamp;
                OccurrenceWindow::from_start(schema, start, self.duration_minutes.unwrap_or(0))
            }
        }
    }
}

// =============================================================================
// Occurrence
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OccurrenceSource {
    EventSingle,
    EventRecurring,
    Phenomenon,
}

impl OccurrenceSource {
    pub fn is_event(&self) -> bool {
        !matches!(self, OccurrenceSource::Phenomenon)
    }
}

/// A concrete, timed instance of an event or phenomenon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Occurrence {
    pub source: OccurrenceSource,
    pub source_id: String,
    pub calendar_id: String,
    /// Event title or phenomenon name
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub start: CalendarTimestamp,
    pub end: CalendarTimestamp,
    pub duration_minutes: i64,
    pub all_day: bool,
    pub priority: i32,
    /// Sorted in dispatch order
    #[serde(default)]
    pub hooks: Vec<HookDescriptor>,
    #[serde(default)]
    pub effects: Vec<PhenomenonEffect>,
}

/// Orders by start, then descending priority, then source id.
pub fn compare_occurrences_by_start(
    schema: &CalendarSchema,
    a: &Occurrence,
    b: &Occurrence,
) -> Ordering {
    compare_timestamps_with_schema(schema, &a.start, &b.start)
        .then_with(|| b.priority.cmp(&a.priority))
        .then_with(|| a.source_id.cmp(&b.source_id))
}

pub fn sort_occurrences_by_timestamp(schema: &CalendarSchema, occurrences: &mut [Occurrence]) {
    occurrences.sort_by(|a, b| compare_occurrences_by_start(schema, a, b));
}

/// Keeps occurrences starting at or after `from`, sorted by start.
pub fn filter_upcoming_occurrences(
    schema: &CalendarSchema,
    occurrences: &[Occurrence],
    from: &CalendarTimestamp,
) -> Vec<Occurrence> {
    let mut upcoming: Vec<Occurrence> = occurrences
        .iter()
        .filter(|o| compare_timestamps_with_schema(schema, &o.start, from) != Ordering::Less)
        .cloned()
        .collect();
    sort_occurrences_by_timestamp(schema, &mut upcoming);
    upcoming
}

// =============================================================================
// Lenient Batches
// =============================================================================

/// A source that could not be evaluated while building a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedSource {
    pub source_id: String,
    pub error: DomainError,
}

/// Result of an aggregate computation that skips failing sources
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OccurrenceBatch {
    pub occurrences: Vec<Occurrence>,
    pub skipped: Vec<SkippedSource>,
}

impl OccurrenceBatch {
    pub(crate) fn record<T>(&mut self, source_id: &str, result: Result<T, DomainError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(error) => {
                self.skipped.push(SkippedSource {
                    source_id: source_id.to_string(),
                    error,
                });
                None
            }
        }
    }

    /// Appends another batch.
    pub fn merge(&mut self, other: OccurrenceBatch) {
        self.occurrences.extend(other.occurrences);
        self.skipped.extend(other.skipped);
    }

    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================
