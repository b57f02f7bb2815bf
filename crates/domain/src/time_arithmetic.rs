//! Signed time arithmetic over custom calendars.
//!
//! Advancing is a carry chain: minute overflow carries into hours, hour
//! overflow carries into days, and days walk month by month across year
//! boundaries. Negative amounts borrow whole units first so every remainder
//! stays non-negative.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::schema::CalendarSchema;
use crate::timestamp::{CalendarTimestamp, TimestampPrecision};

// =============================================================================
// Time Unit
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeUnit {
    Day,
    Hour,
    Minute,
}

impl TimeUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeUnit::Day => "day",
            TimeUnit::Hour => "hour",
            TimeUnit::Minute => "minute",
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TimeUnit {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "day" | "days" => Ok(Self::Day),
            "hour" | "hours" => Ok(Self::Hour),
            "minute" | "minutes" => Ok(Self::Minute),
            other => Err(DomainError::parse(format!("Unknown time unit: {}", other))),
        }
    }
}

// =============================================================================
// Advance Result
// =============================================================================

/// Outcome of advancing a timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvanceResult {
    pub timestamp: CalendarTimestamp,
    /// For day steps: a year boundary was crossed. For hour and minute steps:
    /// any carry into a larger unit happened.
    pub normalized: bool,
    /// Whole days carried out of the hour field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carried_days: Option<i64>,
    /// Hours fed into hour arithmetic: the requested amount for hour steps,
    /// the minute overflow for minute steps
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carried_hours: Option<i64>,
    /// Minute-of-hour left after a minute carry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carried_minutes: Option<i64>,
}

impl AdvanceResult {
    fn unchanged(timestamp: CalendarTimestamp) -> Self {
        Self {
            timestamp,
            normalized: false,
            carried_days: None,
            carried_hours: None,
            carried_minutes: None,
        }
    }
}

/// Advances `current` by a signed `amount` of `unit`.
///
/// A zero amount returns `current` untouched. Day steps keep the input
/// precision; hour steps yield at least hour precision; minute steps yield
/// minute precision.
///
/// # Errors
///
/// Returns `DomainError::UnknownReference` for a month missing from the schema
/// and `DomainError::OutOfRange` for a day outside its month.
pub fn advance_time(
    schema: &CalendarSchema,
    current: &CalendarTimestamp,
    amount: i64,
    unit: TimeUnit,
) -> Result<AdvanceResult, DomainError> {
    if amount == 0 {
        schema
            .month_index(&current.month_id)
            .ok_or_else(|| DomainError::unknown_month(&current.month_id, schema.id()))?;
        return Ok(AdvanceResult::unchanged(current.clone()));
    }

    match unit {
        TimeUnit::Day => advance_by_days(schema, current, amount),
        TimeUnit::Hour => advance_by_hours(schema, current, amount),
        TimeUnit::Minute => advance_by_minutes(schema, current, amount),
    }
}

struct ShiftedDate {
    year: i32,
    month_id: String,
    day: u32,
    crossed_year: bool,
}

fn advance_by_days(
    schema: &CalendarSchema,
    current: &CalendarTimestamp,
    days: i64,
) -> Result<AdvanceResult, DomainError> {
    let shifted = shift_days(schema, current, days)?;
    let timestamp = CalendarTimestamp {
        year: shifted.year,
        month_id: shifted.month_id,
        day: shifted.day,
        ..current.clone()
    };
    Ok(AdvanceResult {
        normalized: shifted.crossed_year,
        ..AdvanceResult::unchanged(timestamp)
    })
}

fn shift_days(
    schema: &CalendarSchema,
    current: &CalendarTimestamp,
    days: i64,
) -> Result<ShiftedDate, DomainError> {
    let months = schema.months();
    let mut index = schema
        .month_index(&current.month_id)
        .ok_or_else(|| DomainError::unknown_month(&current.month_id, schema.id()))?;
    let mut day = current.day as i64;
    if day < 1 || day > months[index].length as i64 {
        return Err(DomainError::out_of_range("Day", day, schema.id()));
    }

    let mut year = current.year as i64;
    let mut remaining = days;
    let mut crossed_year = false;

    // Every year has the same shape, so whole years land on the same (month, day).
    let days_per_year = schema.total_days_in_year();
    if remaining.abs() >= days_per_year {
        let years = remaining / days_per_year;
        year += years;
        remaining -= years * days_per_year;
        crossed_year = true;
    }

    while remaining != 0 {
        let length = months[index].length as i64;
        if remaining > 0 {
            let days_left_in_month = length - day + 1;
            if remaining < days_left_in_month {
                day += remaining;
                remaining = 0;
            } else {
                remaining -= days_left_in_month;
                day = 1;
                if index + 1 < months.len() {
                    index += 1;
                } else {
                    index = 0;
                    year += 1;
                    crossed_year = true;
                }
            }
        } else {
            let days_to_month_start = day - 1;
            if -remaining <= days_to_month_start {
                day += remaining;
                remaining = 0;
            } else {
                remaining += days_to_month_start + 1;
                if index > 0 {
                    index -= 1;
                } else {
                    index = months.len() - 1;
                    year -= 1;
                    crossed_year = true;
                }
                day = months[index].length as i64;
            }
        }
    }

    let year = i32::try_from(year).map_err(|_| DomainError::out_of_range("Year", year, schema.id()))?;
    Ok(ShiftedDate {
        year,
        month_id: months[index].id.clone(),
        day: day as u32,
        crossed_year,
    })
}

fn advance_by_hours(
    schema: &CalendarSchema,
    current: &CalendarTimestamp,
    hours: i64,
) -> Result<AdvanceResult, DomainError> {
    let hours_per_day = schema.hours_per_day() as i64;
    let total_hours = current.hour_or_zero() as i64 + hours;
    let carried_days = total_hours.div_euclid(hours_per_day);
    let hour = total_hours.rem_euclid(hours_per_day) as u32;

    let (year, month_id, day, crossed_year) = if carried_days != 0 {
        let shifted = shift_days(schema, current, carried_days)?;
        (shifted.year, shifted.month_id, shifted.day, shifted.crossed_year)
    } else {
        (current.year, current.month_id.clone(), current.day, false)
    };

    let precision = current.precision.max(TimestampPrecision::Hour);
    let timestamp = CalendarTimestamp::with_precision(
        current.calendar_id.clone(),
        year,
        month_id,
        day,
        hour,
        current.minute_or_zero(),
        precision,
    );

    Ok(AdvanceResult {
        timestamp,
        normalized: carried_days != 0 || crossed_year,
        carried_days: (carried_days != 0).then_some(carried_days),
        carried_hours: Some(hours),
        carried_minutes: None,
    })
}

fn advance_by_minutes(
    schema: &CalendarSchema,
    current: &CalendarTimestamp,
    minutes: i64,
) -> Result<AdvanceResult, DomainError> {
    let minutes_per_hour = schema.minutes_per_hour() as i64;
    let total_minutes = current.minute_or_zero() as i64 + minutes;
    let carried_hours = total_minutes.div_euclid(minutes_per_hour);
    let minute = total_minutes.rem_euclid(minutes_per_hour) as u32;

    let base = if carried_hours != 0 {
        advance_by_hours(schema, current, carried_hours)?
    } else {
        schema
            .month_index(&current.month_id)
            .ok_or_else(|| DomainError::unknown_month(&current.month_id, schema.id()))?;
        AdvanceResult::unchanged(current.clone())
    };

    let timestamp = CalendarTimestamp::at_minute(
        current.calendar_id.clone(),
        base.timestamp.year,
        base.timestamp.month_id.clone(),
        base.timestamp.day,
        base.timestamp.hour_or_zero(),
        minute,
    );

    let carried = carried_hours != 0;
    Ok(AdvanceResult {
        timestamp,
        normalized: carried || base.normalized,
        carried_days: base.carried_days,
        carried_hours: carried.then_some(carried_hours),
        carried_minutes: carried.then_some(minute as i64),
    })
}

// =============================================================================
// Tests
// =============================================================================
