//! Calendar timestamps
//!
//! A `CalendarTimestamp` is a point in time expressed in the units of one
//! schema. Timestamps deliberately do not implement `Ord`: two timestamps can
//! only be ordered with the schema that defines their month order, so every
//! comparison goes through [`compare_timestamps_with_schema`].

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::schema::CalendarSchema;

// ============================================================================
// TimestampPrecision
// ============================================================================

/// Which sub-day fields of a timestamp are meaningful
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampPrecision {
    Day,
    Hour,
    Minute,
}

impl TimestampPrecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimestampPrecision::Day => "day",
            TimestampPrecision::Hour => "hour",
            TimestampPrecision::Minute => "minute",
        }
    }
}

impl fmt::Display for TimestampPrecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// CalendarTimestamp
// ============================================================================

/// An immutable point in time tied to a calendar schema
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarTimestamp {
    pub calendar_id: String,
    pub year: i32,
    pub month_id: String,
    /// Day of month (1-indexed)
    pub day: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hour: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minute: Option<u32>,
    pub precision: TimestampPrecision,
}

impl CalendarTimestamp {
    /// Create a day-precision timestamp.
    pub fn at_day(
        calendar_id: impl Into<String>,
        year: i32,
        month_id: impl Into<String>,
        day: u32,
    ) -> Self {
        Self {
            calendar_id: calendar_id.into(),
            year,
            month_id: month_id.into(),
            day,
            hour: None,
            minute: None,
            precision: TimestampPrecision::Day,
        }
    }

    /// Create an hour-precision timestamp.
    pub fn at_hour(
        calendar_id: impl Into<String>,
        year: i32,
        month_id: impl Into<String>,
        day: u32,
        hour: u32,
    ) -> Self {
        Self {
            hour: Some(hour),
            precision: TimestampPrecision::Hour,
            ..Self::at_day(calendar_id, year, month_id, day)
        }
    }

    /// Create a minute-precision timestamp.
    pub fn at_minute(
        calendar_id: impl Into<String>,
        year: i32,
        month_id: impl Into<String>,
        day: u32,
        hour: u32,
        minute: u32,
    ) -> Self {
        Self {
            hour: Some(hour),
            minute: Some(minute),
            precision: TimestampPrecision::Minute,
            ..Self::at_day(calendar_id, year, month_id, day)
        }
    }

    /// Builds a timestamp of the given precision; sub-fields finer than the
    /// precision are dropped, coarser ones default to 0.
    pub fn with_precision(
        calendar_id: impl Into<String>,
        year: i32,
        month_id: impl Into<String>,
        day: u32,
        hour: u32,
        minute: u32,
        precision: TimestampPrecision,
    ) -> Self {
        match precision {
            TimestampPrecision::Day => Self::at_day(calendar_id, year, month_id, day),
            TimestampPrecision::Hour => Self::at_hour(calendar_id, year, month_id, day, hour),
            TimestampPrecision::Minute => {
                Self::at_minute(calendar_id, year, month_id, day, hour, minute)
            }
        }
    }

    /// Returns the hour, treating an absent hour as midnight.
    pub fn hour_or_zero(&self) -> u32 {
        self.hour.unwrap_or(0)
    }

    /// Returns the minute, treating an absent minute as the top of the hour.
    pub fn minute_or_zero(&self) -> u32 {
        self.minute.unwrap_or(0)
    }

    /// Checks the timestamp against a schema: matching calendar id, known
    /// month, day inside the month and time fields inside the time definition.
    pub fn validate_against(&self, schema: &CalendarSchema) -> Result<(), DomainError> {
        if self.calendar_id != schema.id() {
            return Err(DomainError::validation(format!(
                "Timestamp belongs to calendar {} but schema is {}",
                self.calendar_id,
                schema.id()
            )));
        }
        let length = schema
            .month_length(&self.month_id)
            .ok_or_else(|| DomainError::unknown_month(&self.month_id, schema.id()))?;
        if self.day == 0 || self.day > length {
            return Err(DomainError::out_of_range("Day", self.day as i64, schema.id()));
        }
        if let Some(hour) = self.hour {
            if hour >= schema.hours_per_day() {
                return Err(DomainError::out_of_range("Hour", hour as i64, schema.id()));
            }
        }
        if let Some(minute) = self.minute {
            if minute >= schema.minutes_per_hour() {
                return Err(DomainError::out_of_range("Minute", minute as i64, schema.id()));
            }
        }
        Ok(())
    }

    /// Renders a human-readable string, e.g. "Year 1492, Day 15 of Mirtul, 14:30".
    ///
    /// Presentation only; never parse this back or compare on it.
    pub fn format(&self, month_name: Option<&str>) -> String {
        let month = month_name.unwrap_or(&self.month_id);
        match self.precision {
            TimestampPrecision::Day => format!("Year {}, Day {} of {}", self.year, self.day, month),
            TimestampPrecision::Hour => format!(
                "Year {}, Day {} of {}, {:02}:00",
                self.year,
                self.day,
                month,
                self.hour_or_zero()
            ),
            TimestampPrecision::Minute => format!(
                "Year {}, Day {} of {}, {:02}:{:02}",
                self.year,
                self.day,
                month,
                self.hour_or_zero(),
                self.minute_or_zero()
            ),
        }
    }

    /// Formats with the month display name looked up from the schema.
    pub fn format_with_schema(&self, schema: &CalendarSchema) -> String {
        let name = schema.month_by_id(&self.month_id).map(|m| m.name.as_str());
        self.format(name)
    }
}

impl fmt::Display for CalendarTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format(None))
    }
}

// ============================================================================
// Comparators
// ============================================================================

/// Orders two timestamps by year, schema month index, day, hour and minute.
///
/// Absent hours and minutes count as 0. A month id missing from the schema
/// falls back to lexical order so the comparator stays total; such a
/// timestamp fails every arithmetic operation anyway.
pub fn compare_timestamps_with_schema(
    schema: &CalendarSchema,
    a: &CalendarTimestamp,
    b: &CalendarTimestamp,
) -> Ordering {
    a.year
        .cmp(&b.year)
        .then_with(|| {
            if a.month_id == b.month_id {
                return Ordering::Equal;
            }
            match (schema.month_index(&a.month_id), schema.month_index(&b.month_id)) {
                (Some(ai), Some(bi)) => ai.cmp(&bi),
                _ => a.month_id.cmp(&b.month_id),
            }
        })
        .then_with(|| a.day.cmp(&b.day))
        .then_with(|| a.hour_or_zero().cmp(&b.hour_or_zero()))
        .then_with(|| a.minute_or_zero().cmp(&b.minute_or_zero()))
}

/// Orders two timestamps comparing month ids as plain strings.
///
/// This ignores the calendar's month order ("apr" sorts before "jan") and is
/// wrong for scheduling. It exists only for callers that need a stable key
/// with no schema at hand. Use [`compare_timestamps_with_schema`] instead.
pub fn unsafe_lexical_compare(a: &CalendarTimestamp, b: &CalendarTimestamp) -> Ordering {
    a.year
        .cmp(&b.year)
        .then_with(|| a.month_id.cmp(&b.month_id))
        .then_with(|| a.day.cmp(&b.day))
        .then_with(|| a.hour_or_zero().cmp(&b.hour_or_zero()))
        .then_with(|| a.minute_or_zero().cmp(&b.minute_or_zero()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{CalendarEpoch, CalendarMonth};

    fn four_month_schema() -> CalendarSchema {
        CalendarSchema::new(
            "quad",
            "Quad",
            7,
            vec![
                CalendarMonth::new("jan", "January", 30),
                CalendarMonth::new("feb", "February", 30),
                CalendarMonth::new("mar", "March", 30),
                CalendarMonth::new("apr", "April", 30),
            ],
            CalendarEpoch::new(1, "jan", 1),
        )
        .unwrap()
    }

    mod constructors {
        use super::*;

        #[test]
        fn day_precision_has_no_time() {
            let ts = CalendarTimestamp::at_day("quad", 5, "feb", 3);
            assert_eq!(ts.precision, TimestampPrecision::Day);
            assert_eq!(ts.hour, None);
            assert_eq!(ts.minute, None);
            assert_eq!(ts.hour_or_zero(), 0);
        }

        #[test]
        fn minute_precision_keeps_both_fields() {
            let ts = CalendarTimestamp::at_minute("quad", 5, "feb", 3, 14, 30);
            assert_eq!(ts.hour, Some(14));
            assert_eq!(ts.minute, Some(30));
            assert_eq!(ts.precision, TimestampPrecision::Minute);
        }

        #[test]
        fn with_precision_drops_finer_fields() {
            let ts = CalendarTimestamp::with_precision("quad", 5, "feb", 3, 14, 30, TimestampPrecision::Hour);
            assert_eq!(ts, CalendarTimestamp::at_hour("quad", 5, "feb", 3, 14));
        }
    }

    mod comparison {
        use super::*;

        #[test]
        fn schema_aware_uses_month_index() {
            let schema = four_month_schema();
            let jan = CalendarTimestamp::at_day("quad", 1, "jan", 15);
            let feb = CalendarTimestamp::at_day("quad", 1, "feb", 1);
            assert_eq!(compare_timestamps_with_schema(&schema, &jan, &feb), Ordering::Less);
            // Lexically "feb" < "jan", which is the wrong answer.
            assert_eq!(unsafe_lexical_compare(&jan, &feb), Ordering::Greater);
        }

        #[test]
        fn sorting_yields_calendar_order() {
            let schema = four_month_schema();
            let mut stamps = vec![
                CalendarTimestamp::at_day("quad", 1, "apr", 1),
                CalendarTimestamp::at_day("quad", 1, "jan", 1),
                CalendarTimestamp::at_day("quad", 1, "mar", 1),
                CalendarTimestamp::at_day("quad", 1, "feb", 1),
            ];
            stamps.sort_by(|a, b| compare_timestamps_with_schema(&schema, a, b));
            let order: Vec<&str> = stamps.iter().map(|t| t.month_id.as_str()).collect();
            assert_eq!(order, vec!["jan", "feb", "mar", "apr"]);

            stamps.sort_by(unsafe_lexical_compare);
            let lexical: Vec<&str> = stamps.iter().map(|t| t.month_id.as_str()).collect();
            assert_eq!(lexical, vec!["apr", "feb", "jan", "mar"]);
        }

        #[test]
        fn year_dominates_month() {
            let schema = four_month_schema();
            let late = CalendarTimestamp::at_day("quad", 1, "apr", 30);
            let early_next = CalendarTimestamp::at_day("quad", 2, "jan", 1);
            assert_eq!(
                compare_timestamps_with_schema(&schema, &late, &early_next),
                Ordering::Less
            );
        }

        #[test]
        fn missing_time_counts_as_zero() {
            let schema = four_month_schema();
            let day = CalendarTimestamp::at_day("quad", 1, "jan", 1);
            let midnight = CalendarTimestamp::at_minute("quad", 1, "jan", 1, 0, 0);
            let later = CalendarTimestamp::at_minute("quad", 1, "jan", 1, 0, 1);
            assert_eq!(compare_timestamps_with_schema(&schema, &day, &midnight), Ordering::Equal);
            assert_eq!(compare_timestamps_with_schema(&schema, &day, &later), Ordering::Less);
        }
    }

    mod validation {
        use super::*;

        #[test]
        fn valid_timestamp_passes() {
            let ts = CalendarTimestamp::at_minute("quad", 3, "mar", 30, 23, 59);
            assert!(ts.validate_against(&four_month_schema()).is_ok());
        }

        #[test]
        fn wrong_calendar_rejected() {
            let ts = CalendarTimestamp::at_day("other", 3, "mar", 1);
            assert!(matches!(
                ts.validate_against(&four_month_schema()),
                Err(DomainError::Validation(_))
            ));
        }

        #[test]
        fn day_past_month_end_rejected() {
            let ts = CalendarTimestamp::at_day("quad", 3, "mar", 31);
            assert!(matches!(
                ts.validate_against(&four_month_schema()),
                Err(DomainError::OutOfRange { field: "Day", .. })
            ));
        }

        #[test]
        fn hour_past_day_end_rejected() {
            let ts = CalendarTimestamp::at_hour("quad", 3, "mar", 1, 24);
            assert!(ts.validate_against(&four_month_schema()).is_err());
        }
    }

    mod formatting {
        use super::*;

        #[test]
        fn day_precision() {
            let ts = CalendarTimestamp::at_day("quad", 1492, "feb", 15);
            assert_eq!(ts.format(Some("February")), "Year 1492, Day 15 of February");
            assert_eq!(ts.to_string(), "Year 1492, Day 15 of feb");
        }

        #[test]
        fn hour_precision_pads() {
            let ts = CalendarTimestamp::at_hour("quad", 1, "jan", 2, 7);
            assert_eq!(ts.format(None), "Year 1, Day 2 of jan, 07:00");
        }

        #[test]
        fn minute_precision_uses_schema_name() {
            let ts = CalendarTimestamp::at_minute("quad", 1, "apr", 2, 9, 5);
            assert_eq!(
                ts.format_with_schema(&four_month_schema()),
                "Year 1, Day 2 of April, 09:05"
            );
        }
    }
}
