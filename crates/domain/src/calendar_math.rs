//! Conversions between (month, day), day-of-year and absolute day counts.
//!
//! The absolute day index counts from day 0 of the schema's epoch year, so
//! weekly rules and overlap detection never need to special-case month or year
//! boundaries.

use crate::error::DomainError;
use crate::schema::CalendarSchema;
use crate::timestamp::CalendarTimestamp;

/// Euclidean modulo: the result is always in `[0, divisor)` for a positive divisor.
pub fn modulo(value: i64, divisor: i64) -> i64 {
    value.rem_euclid(divisor)
}

/// Returns the 1-based day of year of `timestamp`.
///
/// # Errors
///
/// Returns `DomainError::UnknownReference` if the month is not in the schema.
pub fn day_of_year(schema: &CalendarSchema, timestamp: &CalendarTimestamp) -> Result<i64, DomainError> {
    let month_index = schema
        .month_index(&timestamp.month_id)
        .ok_or_else(|| DomainError::unknown_month(&timestamp.month_id, schema.id()))?;
    let preceding: i64 = schema.months()[..month_index]
        .iter()
        .map(|m| m.length as i64)
        .sum();
    Ok(preceding + timestamp.day as i64)
}

/// Resolves a 1-based day of year back to a `(month id, day)` pair.
///
/// # Errors
///
/// Returns `DomainError::OutOfRange` if `day_of_year` is outside `[1, total days]`.
pub fn resolve_month_and_day(
    schema: &CalendarSchema,
    day_of_year: i64,
) -> Result<(String, u32), DomainError> {
    if day_of_year < 1 || day_of_year > schema.total_days_in_year() {
        return Err(DomainError::out_of_range("Day-of-year", day_of_year, schema.id()));
    }
    let mut remaining = day_of_year;
    for month in schema.months() {
        let length = month.length as i64;
        if remaining <= length {
            return Ok((month.id.clone(), remaining as u32));
        }
        remaining -= length;
    }
    Err(DomainError::out_of_range("Day-of-year", day_of_year, schema.id()))
}

/// Builds a day-precision timestamp for a 1-based day of `year`.
pub fn timestamp_from_day_of_year(
    schema: &CalendarSchema,
    calendar_id: &str,
    year: i32,
    day_of_year: i64,
) -> Result<CalendarTimestamp, DomainError> {
    let (month_id, day) = resolve_month_and_day(schema, day_of_year)?;
    Ok(CalendarTimestamp::at_day(calendar_id, year, month_id, day))
}

/// Maps a timestamp to its signed day index counted from the epoch year's day 0.
pub fn timestamp_to_absolute_day(
    schema: &CalendarSchema,
    timestamp: &CalendarTimestamp,
) -> Result<i64, DomainError> {
    let days_per_year = schema.total_days_in_year();
    let day_index = day_of_year(schema, timestamp)? - 1;
    let year_offset = timestamp.year as i64 - schema.epoch().year as i64;
    Ok(year_offset * days_per_year + day_index)
}

/// Inverse of [`timestamp_to_absolute_day`]; yields a day-precision timestamp.
pub fn absolute_day_to_timestamp(
    schema: &CalendarSchema,
    calendar_id: &str,
    absolute_day: i64,
) -> Result<CalendarTimestamp, DomainError> {
    let days_per_year = schema.total_days_in_year();
    if days_per_year <= 0 {
        return Err(DomainError::validation(format!(
            "Calendar schema {} has no days configured",
            schema.id()
        )));
    }
    let year_offset = absolute_day.div_euclid(days_per_year);
    let day_index = absolute_day.rem_euclid(days_per_year);
    let year = i32::try_from(schema.epoch().year as i64 + year_offset)
        .map_err(|_| DomainError::out_of_range("Absolute day", absolute_day, schema.id()))?;
    timestamp_from_day_of_year(schema, calendar_id, year, day_index + 1)
}

/// Minutes since the epoch year's day 0 at midnight, with absent time fields as 0.
pub fn timestamp_to_absolute_minutes(
    schema: &CalendarSchema,
    timestamp: &CalendarTimestamp,
) -> Result<i64, DomainError> {
    let absolute_day = timestamp_to_absolute_day(schema, timestamp)?;
    let minutes_per_hour = schema.minutes_per_hour() as i64;
    Ok(absolute_day * schema.minutes_per_day()
        + timestamp.hour_or_zero() as i64 * minutes_per_hour
        + timestamp.minute_or_zero() as i64)
}

/// Clamps `day` into `[1, month length]`.
///
/// # Errors
///
/// Returns `DomainError::UnknownReference` if the month is not in the schema.
pub fn clamp_day_to_month(schema: &CalendarSchema, month_id: &str, day: i64) -> Result<u32, DomainError> {
    let length = schema
        .month_length(month_id)
        .ok_or_else(|| DomainError::unknown_month(month_id, schema.id()))?;
    Ok(day.clamp(1, length as i64) as u32)
}
