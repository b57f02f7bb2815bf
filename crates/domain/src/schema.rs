//! Calendar schema value objects
//!
//! A `CalendarSchema` is the immutable structural description of a custom
//! calendar: an ordered list of months with arbitrary lengths, a week length,
//! the sub-day granularity and the epoch every absolute day count starts from.
//!
//! Schemas are authored outside this crate. Changing a calendar means building a
//! new schema; there are no mutating operations here.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::timestamp::CalendarTimestamp;

pub const DEFAULT_HOURS_PER_DAY: u32 = 24;
pub const DEFAULT_MINUTES_PER_HOUR: u32 = 60;
pub const DEFAULT_SECONDS_PER_MINUTE: u32 = 60;
pub const DEFAULT_MINUTE_STEP: u32 = 1;
pub const DEFAULT_SCHEMA_VERSION: &str = "1.0.0";

// ============================================================================
// CalendarMonth
// ============================================================================

/// A single month of a calendar
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarMonth {
    /// Stable identifier referenced by timestamps and rules
    pub id: String,
    /// Display name (e.g., "Hammer", "January")
    pub name: String,
    /// Number of days in this month (at least 1)
    pub length: u32,
}

impl CalendarMonth {
    /// Create a new month definition.
    pub fn new(id: impl Into<String>, name: impl Into<String>, length: u32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            length,
        }
    }
}

// ============================================================================
// CalendarEpoch
// ============================================================================

/// The date absolute day 0 is counted from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEpoch {
    pub year: i32,
    pub month_id: String,
    pub day: u32,
}

impl CalendarEpoch {
    pub fn new(year: i32, month_id: impl Into<String>, day: u32) -> Self {
        Self {
            year,
            month_id: month_id.into(),
            day,
        }
    }
}

// ============================================================================
// TimeDefinition
// ============================================================================

/// Sub-day granularity of a schema with defaults applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeDefinition {
    pub hours_per_day: u32,
    pub minutes_per_hour: u32,
    pub seconds_per_minute: u32,
    pub minute_step: u32,
}

impl TimeDefinition {
    /// Returns the number of minutes per day.
    pub fn minutes_per_day(&self) -> i64 {
        self.hours_per_day as i64 * self.minutes_per_hour as i64
    }
}

impl Default for TimeDefinition {
    fn default() -> Self {
        Self {
            hours_per_day: DEFAULT_HOURS_PER_DAY,
            minutes_per_hour: DEFAULT_MINUTES_PER_HOUR,
            seconds_per_minute: DEFAULT_SECONDS_PER_MINUTE,
            minute_step: DEFAULT_MINUTE_STEP,
        }
    }
}

// ============================================================================
// CalendarSchema
// ============================================================================

/// Full structural definition of a custom calendar
///
/// Construction validates the invariants every other module relies on:
/// - at least one month, every month at least one day long, unique month ids
/// - a week of at least one day
/// - non-zero time granularity when given
/// - an epoch that points at an existing month and a day inside it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "CalendarSchemaRecord")]
pub struct CalendarSchema {
    id: String,
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    days_per_week: u32,
    months: Vec<CalendarMonth>,
    #[serde(skip_serializing_if = "Option::is_none")]
    hours_per_day: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    minutes_per_hour: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    seconds_per_minute: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    minute_step: Option<u32>,
    epoch: CalendarEpoch,
    is_default_global: bool,
    schema_version: String,
}

impl CalendarSchema {
    /// Create a new validated schema with the default time definition.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if any structural invariant is violated.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        days_per_week: u32,
        months: Vec<CalendarMonth>,
        epoch: CalendarEpoch,
    ) -> Result<Self, DomainError> {
        let schema = Self {
            id: id.into(),
            name: name.into(),
            description: None,
            days_per_week,
            months,
            hours_per_day: None,
            minutes_per_hour: None,
            seconds_per_minute: None,
            minute_step: None,
            epoch,
            is_default_global: false,
            schema_version: DEFAULT_SCHEMA_VERSION.to_string(),
        };
        schema.validate()?;
        Ok(schema)
    }

    /// Returns a copy of this schema with an explicit time definition.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if any unit is zero.
    pub fn with_time_definition(
        mut self,
        hours_per_day: u32,
        minutes_per_hour: u32,
        seconds_per_minute: u32,
        minute_step: u32,
    ) -> Result<Self, DomainError> {
        self.hours_per_day = Some(hours_per_day);
        self.minutes_per_hour = Some(minutes_per_hour);
        self.seconds_per_minute = Some(seconds_per_minute);
        self.minute_step = Some(minute_step);
        self.validate()?;
        Ok(self)
    }

    /// Returns a copy of this schema with a description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Returns a copy of this schema flagged as the global default.
    pub fn as_default_global(mut self) -> Self {
        self.is_default_global = true;
        self
    }

    fn validate(&self) -> Result<(), DomainError> {
        if self.id.trim().is_empty() {
            return Err(DomainError::validation("Calendar ID cannot be empty"));
        }
        if self.days_per_week == 0 {
            return Err(DomainError::validation(format!(
                "Calendar {} must have at least one day per week",
                self.id
            )));
        }
        if self.months.is_empty() {
            return Err(DomainError::validation(format!(
                "Calendar {} must define at least one month",
                self.id
            )));
        }

        let mut seen = HashSet::with_capacity(self.months.len());
        for month in &self.months {
            if month.length == 0 {
                return Err(DomainError::validation(format!(
                    "Month {} in calendar {} must have at least one day",
                    month.id, self.id
                )));
            }
            if !seen.insert(month.id.as_str()) {
                return Err(DomainError::validation(format!(
                    "Month id {} appears more than once in calendar {}",
                    month.id, self.id
                )));
            }
        }

        let units = [
            ("hoursPerDay", self.hours_per_day),
            ("minutesPerHour", self.minutes_per_hour),
            ("secondsPerMinute", self.seconds_per_minute),
            ("minuteStep", self.minute_step),
        ];
        for (field, value) in units {
            if value == Some(0) {
                return Err(DomainError::validation(format!(
                    "{} must be greater than zero in calendar {}",
                    field, self.id
                )));
            }
        }

        let epoch_month = self
            .month_by_id(&self.epoch.month_id)
            .ok_or_else(|| DomainError::unknown_month(&self.epoch.month_id, &self.id))?;
        if self.epoch.day == 0 || self.epoch.day > epoch_month.length {
            return Err(DomainError::validation(format!(
                "Epoch day {} is outside month {} ({} days)",
                self.epoch.day, epoch_month.id, epoch_month.length
            )));
        }

        Ok(())
    }

    // Accessors

    /// Returns the schema identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the number of days in a week.
    pub fn days_per_week(&self) -> u32 {
        self.days_per_week
    }

    /// Returns the months in calendar order.
    pub fn months(&self) -> &[CalendarMonth] {
        &self.months
    }

    pub fn epoch(&self) -> &CalendarEpoch {
        &self.epoch
    }

    /// Returns the epoch as a day-precision timestamp in this calendar.
    pub fn epoch_timestamp(&self) -> CalendarTimestamp {
        CalendarTimestamp::at_day(
            self.id.clone(),
            self.epoch.year,
            self.epoch.month_id.clone(),
            self.epoch.day,
        )
    }

    pub fn is_default_global(&self) -> bool {
        self.is_default_global
    }

    pub fn schema_version(&self) -> &str {
        &self.schema_version
    }

    // Time definition (defaults applied)

    pub fn hours_per_day(&self) -> u32 {
        self.hours_per_day.unwrap_or(DEFAULT_HOURS_PER_DAY)
    }

    pub fn minutes_per_hour(&self) -> u32 {
        self.minutes_per_hour.unwrap_or(DEFAULT_MINUTES_PER_HOUR)
    }

    pub fn seconds_per_minute(&self) -> u32 {
        self.seconds_per_minute.unwrap_or(DEFAULT_SECONDS_PER_MINUTE)
    }

    pub fn minute_step(&self) -> u32 {
        self.minute_step.unwrap_or(DEFAULT_MINUTE_STEP)
    }

    /// Returns the full time definition with defaults applied.
    pub fn time_definition(&self) -> TimeDefinition {
        TimeDefinition {
            hours_per_day: self.hours_per_day(),
            minutes_per_hour: self.minutes_per_hour(),
            seconds_per_minute: self.seconds_per_minute(),
            minute_step: self.minute_step(),
        }
    }

    /// Returns the number of minutes per day.
    pub fn minutes_per_day(&self) -> i64 {
        self.time_definition().minutes_per_day()
    }

    // Month lookup

    /// Returns the total number of days in a year (sum of month lengths).
    pub fn total_days_in_year(&self) -> i64 {
        self.months.iter().map(|m| m.length as i64).sum()
    }

    pub fn month_by_id(&self, month_id: &str) -> Option<&CalendarMonth> {
        self.months.iter().find(|m| m.id == month_id)
    }

    /// Returns the position of a month in calendar order.
    pub fn month_index(&self, month_id: &str) -> Option<usize> {
        self.months.iter().position(|m| m.id == month_id)
    }

    pub fn month_by_index(&self, index: usize) -> Option<&CalendarMonth> {
        self.months.get(index)
    }

    pub fn month_length(&self, month_id: &str) -> Option<u32> {
        self.month_by_id(month_id).map(|m| m.length)
    }

    /// Returns the month after `month_id`, or `None` at the end of the year.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::UnknownReference` if `month_id` is not in the schema.
    pub fn next_month(&self, month_id: &str) -> Result<Option<&CalendarMonth>, DomainError> {
        let index = self
            .month_index(month_id)
            .ok_or_else(|| DomainError::unknown_month(month_id, &self.id))?;
        Ok(self.months.get(index + 1))
    }

    /// Returns the month before `month_id`, or `None` at the start of the year.
    pub fn previous_month(&self, month_id: &str) -> Result<Option<&CalendarMonth>, DomainError> {
        let index = self
            .month_index(month_id)
            .ok_or_else(|| DomainError::unknown_month(month_id, &self.id))?;
        Ok(index.checked_sub(1).and_then(|i| self.months.get(i)))
    }

    // Built-in calendars

    /// Creates a 365-day Gregorian-shaped calendar without leap years.
    pub fn gregorian() -> Self {
        let months = [
            ("january", "January", 31),
            ("february", "February", 28),
            ("march", "March", 31),
            ("april", "April", 30),
            ("may", "May", 31),
            ("june", "June", 30),
            ("july", "July", 31),
            ("august", "August", 31),
            ("september", "September", 30),
            ("october", "October", 31),
            ("november", "November", 30),
            ("december", "December", 31),
        ];
        Self::builtin(
            "gregorian",
            "Gregorian Calendar",
            7,
            &months,
            CalendarEpoch::new(1, "january", 1),
        )
    }

    /// Creates the Calendar of Harptos (Forgotten Realms).
    ///
    /// - 12 months of 30 days each, tendays instead of 7-day weeks
    /// - The 5 festival days are modelled as single-day months between them
    pub fn harptos() -> Self {
        let months = [
            ("hammer", "Hammer", 30),
            ("midwinter", "Midwinter", 1),
            ("alturiak", "Alturiak", 30),
            ("ches", "Ches", 30),
            ("tarsakh", "Tarsakh", 30),
            ("greengrass", "Greengrass", 1),
            ("mirtul", "Mirtul", 30),
            ("kythorn", "Kythorn", 30),
            ("flamerule", "Flamerule", 30),
            ("midsummer", "Midsummer", 1),
            ("eleasis", "Eleasis", 30),
            ("eleint", "Eleint", 30),
            ("highharvestide", "Highharvestide", 1),
            ("marpenoth", "Marpenoth", 30),
            ("uktar", "Uktar", 30),
            ("feast_of_the_moon", "Feast of the Moon", 1),
            ("nightal", "Nightal", 30),
        ];
        Self::builtin(
            "harptos",
            "Calendar of Harptos",
            10,
            &months,
            CalendarEpoch::new(1492, "hammer", 1),
        )
    }

    fn builtin(
        id: &str,
        name: &str,
        days_per_week: u32,
        months: &[(&str, &str, u32)],
        epoch: CalendarEpoch,
    ) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: None,
            days_per_week,
            months: months
                .iter()
                .map(|(id, name, length)| CalendarMonth::new(*id, *name, *length))
                .collect(),
            hours_per_day: None,
            minutes_per_hour: None,
            seconds_per_minute: None,
            minute_step: None,
            epoch,
            is_default_global: false,
            schema_version: DEFAULT_SCHEMA_VERSION.to_string(),
        }
    }
}

/// Unvalidated wire shape; deserialisation goes through `CalendarSchema::validate`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CalendarSchemaRecord {
    id: String,
    name: String,
    #[serde(default)]
    description: Option<String>,
    days_per_week: u32,
    months: Vec<CalendarMonth>,
    #[serde(default)]
    hours_per_day: Option<u32>,
    #[serde(default)]
    minutes_per_hour: Option<u32>,
    #[serde(default)]
    seconds_per_minute: Option<u32>,
    #[serde(default)]
    minute_step: Option<u32>,
    epoch: CalendarEpoch,
    #[serde(default)]
    is_default_global: bool,
    #[serde(default = "default_schema_version")]
    schema_version: String,
}

fn default_schema_version() -> String {
    DEFAULT_SCHEMA_VERSION.to_string()
}

impl TryFrom<CalendarSchemaRecord> for CalendarSchema {
    type Error = DomainError;

    fn try_from(record: CalendarSchemaRecord) -> Result<Self, Self::Error> {
        let schema = Self {
            id: record.id,
            name: record.name,
            description: record.description,
            days_per_week: record.days_per_week,
            months: record.months,
            hours_per_day: record.hours_per_day,
            minutes_per_hour: record.minutes_per_hour,
            seconds_per_minute: record.seconds_per_minute,
            minute_step: record.minute_step,
            epoch: record.epoch,
            is_default_global: record.is_default_global,
            schema_version: record.schema_version,
        };
        schema.validate()?;
        Ok(schema)
    }
}

// ============================================================================
// Tests
// ============================================================================
