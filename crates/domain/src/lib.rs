//! Almanac domain: custom calendars and everything computed on top of them.
//!
//! Every function here is pure and synchronous over immutable inputs. The
//! engine crate owns storage, dispatch and logging.

pub mod calendar_math;
pub mod conflict;
pub mod error;
pub mod event;
pub mod hooks;
pub mod occurrence;
pub mod phenomenon;
pub mod repeat_rule;
pub mod schema;
pub mod time_arithmetic;
pub mod timestamp;

pub use error::DomainError;

// Calendar structure and points in time
pub use calendar_math::{
    absolute_day_to_timestamp, clamp_day_to_month, day_of_year, modulo, resolve_month_and_day,
    timestamp_from_day_of_year, timestamp_to_absolute_day, timestamp_to_absolute_minutes,
};
pub use schema::{CalendarEpoch, CalendarMonth, CalendarSchema, TimeDefinition};
pub use time_arithmetic::{advance_time, AdvanceResult, TimeUnit};
pub use timestamp::{
    compare_timestamps_with_schema, unsafe_lexical_compare, CalendarTimestamp, TimestampPrecision,
};

// Recurrence and scheduling
pub use conflict::{
    detect_conflicts, resolve_conflicts, resolve_occurrences, ConflictGroup, ConflictResolution,
    ConflictWindow,
};
pub use event::{
    create_single_event, events_in_range, next_event_occurrences, CalendarEvent, EventBounds,
    EventDetails, FollowUpPolicy, RecurringEvent, SingleEvent,
};
pub use hooks::{sort_hooks_by_priority, HookDescriptor, HookType};
pub use occurrence::{
    filter_upcoming_occurrences, sort_occurrences_by_timestamp, ClockTime, Occurrence,
    OccurrenceBatch, OccurrenceSource, OccurrenceWindow, ScheduledTime, SkippedSource, TimePolicy,
};
pub use phenomenon::{
    compare_phenomena_by_priority, EffectType, Phenomenon, PhenomenonCategory, PhenomenonEffect,
    PhenomenonEngine, PhenomenonVisibility,
};
pub use repeat_rule::{
    next_occurrence, occurrences_in_range, AstronomicalEventCalculator, AstronomicalRule,
    AstronomicalSource, OccurrenceQuery, RangeQuery, RepeatRule, RepeatRuleServices,
    DEFAULT_RANGE_LIMIT,
};
