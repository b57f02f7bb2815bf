//! Repeat rules: abstract recurrence patterns evaluated against a schema
//!
//! A rule answers two questions for an anchor timestamp: what is the next
//! matching date, and which dates match inside a range. Results are
//! day-precision base dates; events and phenomena apply their own time policy
//! on top.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::calendar_math::{
    absolute_day_to_timestamp, clamp_day_to_month, modulo, timestamp_from_day_of_year,
    timestamp_to_absolute_day,
};
use crate::error::DomainError;
use crate::schema::CalendarSchema;
use crate::timestamp::{compare_timestamps_with_schema, CalendarTimestamp};

/// Result cap for range scans when the caller does not give one
pub const DEFAULT_RANGE_LIMIT: usize = 12;

// =============================================================================
// Rule Types
// =============================================================================

/// Recurrence pattern, tagged by `type` on the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RepeatRule {
    /// Same day of year every year; the offset wraps around the year length
    #[serde(rename = "annual_offset", rename_all = "camelCase")]
    AnnualOffset { offset_day_of_year: i64 },

    /// Fixed (month, day) every year; the day is clamped to the month length
    #[serde(rename = "monthly_position", rename_all = "camelCase")]
    MonthlyPosition { month_id: String, day: i64 },

    /// A weekday index, every `interval` weeks counted from the epoch week
    #[serde(rename = "weekly_dayIndex", rename_all = "camelCase")]
    WeeklyDayIndex {
        day_index: i64,
        #[serde(default = "default_interval")]
        interval: u32,
    },

    /// Resolved by an injected [`AstronomicalEventCalculator`]
    #[serde(rename = "astronomical")]
    Astronomical(AstronomicalRule),

    /// Reserved for host extensions; never resolvable by the core
    #[serde(rename = "custom", rename_all = "camelCase")]
    Custom { custom_rule_id: String },
}

fn default_interval() -> u32 {
    1
}

impl RepeatRule {
    pub fn annual_offset(offset_day_of_year: i64) -> Self {
        Self::AnnualOffset { offset_day_of_year }
    }

    pub fn monthly_position(month_id: impl Into<String>, day: i64) -> Self {
        Self::MonthlyPosition {
            month_id: month_id.into(),
            day,
        }
    }

    pub fn weekly(day_index: i64, interval: u32) -> Self {
        Self::WeeklyDayIndex { day_index, interval }
    }

    /// Wire tag of the rule family, used in error context.
    pub fn rule_type(&self) -> &'static str {
        match self {
            RepeatRule::AnnualOffset { .. } => "annual_offset",
            RepeatRule::MonthlyPosition { .. } => "monthly_position",
            RepeatRule::WeeklyDayIndex { .. } => "weekly_dayIndex",
            RepeatRule::Astronomical(_) => "astronomical",
            RepeatRule::Custom { .. } => "custom",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AstronomicalSource {
    Sunrise,
    Sunset,
    MoonPhase,
    Eclipse,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AstronomicalRule {
    pub source: AstronomicalSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_calendar_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset_minutes: Option<i64>,
}

impl AstronomicalRule {
    pub fn new(source: AstronomicalSource) -> Self {
        Self {
            source,
            reference_calendar_id: None,
            offset_minutes: None,
        }
    }
}

// =============================================================================
// Queries
// =============================================================================

/// Options for a single next-occurrence lookup
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OccurrenceQuery {
    /// Whether a match exactly at the anchor counts
    pub include_start: bool,
}

impl OccurrenceQuery {
    pub fn inclusive() -> Self {
        Self {
            include_start: true,
        }
    }

    pub fn exclusive() -> Self {
        Self {
            include_start: false,
        }
    }
}

/// Options for a range scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeQuery {
    pub include_start: bool,
    pub limit: usize,
}

impl RangeQuery {
    pub fn new(include_start: bool, limit: usize) -> Self {
        Self {
            include_start,
            limit,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn including_start(mut self) -> Self {
        self.include_start = true;
        self
    }

    fn first_step(&self) -> OccurrenceQuery {
        OccurrenceQuery {
            include_start: self.include_start,
        }
    }
}

impl Default for RangeQuery {
    fn default() -> Self {
        Self {
            include_start: false,
            limit: DEFAULT_RANGE_LIMIT,
        }
    }
}

// =============================================================================
// Injected Services
// =============================================================================

/// Strategy for rules that depend on real or simulated astronomy.
///
/// The core ships no implementation. Calls are synchronous; an asynchronous
/// source must be resolved by the caller before re-entering rule evaluation.
pub trait AstronomicalEventCalculator: Send + Sync {
    fn resolve_next_occurrence(
        &self,
        schema: &CalendarSchema,
        calendar_id: &str,
        rule: &AstronomicalRule,
        start: &CalendarTimestamp,
        query: OccurrenceQuery,
    ) -> Result<Option<CalendarTimestamp>, DomainError>;

    fn resolve_occurrences_in_range(
        &self,
        schema: &CalendarSchema,
        calendar_id: &str,
        rule: &AstronomicalRule,
        range_start: &CalendarTimestamp,
        range_end: &CalendarTimestamp,
        query: RangeQuery,
    ) -> Result<Vec<CalendarTimestamp>, DomainError>;
}

/// Collaborators available to rule evaluation.
///
/// `custom` rules have no entry here: a host that wants them resolves the
/// `custom_rule_id` itself before calling into the core.
#[derive(Clone, Default)]
pub struct RepeatRuleServices {
    astronomical_calculator: Option<Arc<dyn AstronomicalEventCalculator>>,
}

impl RepeatRuleServices {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_astronomical_calculator(calculator: Arc<dyn AstronomicalEventCalculator>) -> Self {
        Self {
            astronomical_calculator: Some(calculator),
        }
    }

    pub fn astronomical_calculator(&self) -> Option<&dyn AstronomicalEventCalculator> {
        self.astronomical_calculator.as_deref()
    }
}

impl fmt::Debug for RepeatRuleServices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepeatRuleServices")
            .field(
                "astronomical_calculator",
                &self.astronomical_calculator.is_some(),
            )
            .finish()
    }
}

// =============================================================================
// Evaluation
// =============================================================================

/// Computes the next date matching `rule` after `anchor`.
///
/// Errors propagate unchanged: a broken rule should surface at the call site.
pub fn next_occurrence(
    schema: &CalendarSchema,
    calendar_id: &str,
    rule: &RepeatRule,
    anchor: &CalendarTimestamp,
    query: OccurrenceQuery,
    services: &RepeatRuleServices,
) -> Result<Option<CalendarTimestamp>, DomainError> {
    match rule {
        RepeatRule::AnnualOffset { offset_day_of_year } => {
            next_annual(schema, calendar_id, *offset_day_of_year, anchor, query).map(Some)
        }
        RepeatRule::MonthlyPosition { month_id, day } => {
            next_monthly(schema, calendar_id, month_id, *day, anchor, query).map(Some)
        }
        RepeatRule::WeeklyDayIndex {
            day_index,
            interval,
        } => next_weekly(schema, calendar_id, *day_index, *interval, anchor, query).map(Some),
        RepeatRule::Astronomical(astronomical) => {
            let calculator = services
                .astronomical_calculator()
                .ok_or_else(|| DomainError::unsupported_rule(rule.rule_type()))?;
            calculator.resolve_next_occurrence(schema, calendar_id, astronomical, anchor, query)
        }
        RepeatRule::Custom { .. } => Err(DomainError::unsupported_rule(rule.rule_type())),
    }
}

/// Lists dates matching `rule` between `range_start` and `range_end` (inclusive).
///
/// Reversed endpoints are swapped. The scan stops at `query.limit`, past the
/// range end, or as soon as a step fails to move forward.
pub fn occurrences_in_range(
    schema: &CalendarSchema,
    calendar_id: &str,
    rule: &RepeatRule,
    range_start: &CalendarTimestamp,
    range_end: &CalendarTimestamp,
    query: RangeQuery,
    services: &RepeatRuleServices,
) -> Result<Vec<CalendarTimestamp>, DomainError> {
    if query.limit == 0 {
        return Ok(Vec::new());
    }

    let (start, end) = match compare_timestamps_with_schema(schema, range_start, range_end) {
        Ordering::Greater => (range_end, range_start),
        _ => (range_start, range_end),
    };

    if let RepeatRule::Astronomical(astronomical) = rule {
        let calculator = services
            .astronomical_calculator()
            .ok_or_else(|| DomainError::unsupported_rule(rule.rule_type()))?;
        let mut found = calculator.resolve_occurrences_in_range(
            schema,
            calendar_id,
            astronomical,
            start,
            end,
            query,
        )?;
        found.truncate(query.limit);
        return Ok(found);
    }

    let mut found: Vec<CalendarTimestamp> = Vec::new();
    let mut cursor = next_occurrence(schema, calendar_id, rule, start, query.first_step(), services)?;

    while let Some(candidate) = cursor {
        if found.len() >= query.limit
            || compare_timestamps_with_schema(schema, &candidate, end) == Ordering::Greater
        {
            break;
        }
        if let Some(previous) = found.last() {
            if compare_timestamps_with_schema(schema, &candidate, previous) != Ordering::Greater {
                break;
            }
        }
        cursor = next_occurrence(
            schema,
            calendar_id,
            rule,
            &candidate,
            OccurrenceQuery::exclusive(),
            services,
        )?;
        found.push(candidate);
    }

    Ok(found)
}

/// Picks `candidate` if it is after `anchor` (or equal and inclusive),
/// otherwise builds the same position one year later.
fn this_year_or_next<F>(
    schema: &CalendarSchema,
    candidate: CalendarTimestamp,
    anchor: &CalendarTimestamp,
    query: OccurrenceQuery,
    next_year: F,
) -> Result<CalendarTimestamp, DomainError>
where
    F: FnOnce(i32) -> Result<CalendarTimestamp, DomainError>,
{
    match compare_timestamps_with_schema(schema, &candidate, anchor) {
        Ordering::Greater => Ok(candidate),
        Ordering::Equal if query.include_start => Ok(candidate),
        _ => {
            let year = anchor
                .year
                .checked_add(1)
                .ok_or_else(|| DomainError::out_of_range("Year", anchor.year as i64, schema.id()))?;
            next_year(year)
        }
    }
}

fn next_annual(
    schema: &CalendarSchema,
    calendar_id: &str,
    offset_day_of_year: i64,
    anchor: &CalendarTimestamp,
    query: OccurrenceQuery,
) -> Result<CalendarTimestamp, DomainError> {
    let total_days = schema.total_days_in_year();
    if total_days <= 0 {
        return Err(DomainError::invalid_rule(
            "annual_offset",
            schema.id(),
            "calendar has no days configured",
        ));
    }

    let day_of_year = modulo(offset_day_of_year - 1, total_days) + 1;
    let candidate = timestamp_from_day_of_year(schema, calendar_id, anchor.year, day_of_year)?;
    this_year_or_next(schema, candidate, anchor, query, |year| {
        timestamp_from_day_of_year(schema, calendar_id, year, day_of_year)
    })
}

fn next_monthly(
    schema: &CalendarSchema,
    calendar_id: &str,
    month_id: &str,
    day: i64,
    anchor: &CalendarTimestamp,
    query: OccurrenceQuery,
) -> Result<CalendarTimestamp, DomainError> {
    let day = clamp_day_to_month(schema, month_id, day)?;
    let candidate = CalendarTimestamp::at_day(calendar_id, anchor.year, month_id, day);
    this_year_or_next(schema, candidate, anchor, query, |year| {
        Ok(CalendarTimestamp::at_day(calendar_id, year, month_id, day))
    })
}

fn next_weekly(
    schema: &CalendarSchema,
    calendar_id: &str,
    day_index: i64,
    interval: u32,
    anchor: &CalendarTimestamp,
    query: OccurrenceQuery,
) -> Result<CalendarTimestamp, DomainError> {
    let days_per_week = schema.days_per_week() as i64;
    if day_index < 0 || day_index >= days_per_week {
        return Err(DomainError::invalid_rule(
            "weekly_dayIndex",
            schema.id(),
            format!(
                "dayIndex {} is out of range [0, {})",
                day_index, days_per_week
            ),
        ));
    }
    let interval = interval.max(1) as i64;

    let interval_days = days_per_week * interval;

    let absolute = timestamp_to_absolute_day(schema, anchor)?;
    let mut delta = modulo(day_index - modulo(absolute, days_per_week), days_per_week);
    if delta == 0 && !query.include_start {
        delta = interval_days;
    }
    // A partial week rounds up to the next interval boundary from the anchor.
    if interval > 1 && delta % days_per_week != 0 {
        delta += modulo(interval_days - delta % interval_days, interval_days);
    }

    absolute_day_to_timestamp(schema, calendar_id, absolute + delta)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{CalendarEpoch, CalendarMonth};
    use serde_json::json;

    // Three 20-day months, 6-day week, epoch year 1.
    fn tri() -> CalendarSchema {
        CalendarSchema::new(
            "tri",
            "Tri",
            6,
            vec![
                CalendarMonth::new("a", "Alpha", 20),
                CalendarMonth::new("b", "Beta", 20),
                CalendarMonth::new("c", "Gamma", 20),
            ],
            CalendarEpoch::new(1, "a", 1),
        )
        .unwrap()
    }

    fn ts(year: i32, month: &str, day: u32) -> CalendarTimestamp {
        CalendarTimestamp::at_day("tri", year, month, day)
    }

    fn next(rule: &RepeatRule, anchor: &CalendarTimestamp, include_start: bool) -> CalendarTimestamp {
        next_occurrence(
            &tri(),
            "tri",
            rule,
            anchor,
            OccurrenceQuery { include_start },
            &RepeatRuleServices::none(),
        )
        .unwrap()
        .unwrap()
    }

    mod annual {
        use super::*;

        #[test]
        fn later_this_year() {
            let rule = RepeatRule::annual_offset(25);
            assert_eq!(next(&rule, &ts(5, "a", 10), false), ts(5, "b", 5));
        }

        #[test]
        fn already_passed_rolls_to_next_year() {
            let rule = RepeatRule::annual_offset(25);
            assert_eq!(next(&rule, &ts(5, "c", 1), false), ts(6, "b", 5));
        }

        #[test]
        fn exact_anchor_respects_include_start() {
            let rule = RepeatRule::annual_offset(25);
            assert_eq!(next(&rule, &ts(5, "b", 5), true), ts(5, "b", 5));
            assert_eq!(next(&rule, &ts(5, "b", 5), false), ts(6, "b", 5));
        }

        #[test]
        fn offset_wraps_around_short_year() {
            // 250 on a 60-day year is day 10.
            let rule = RepeatRule::annual_offset(250);
            assert_eq!(next(&rule, &ts(5, "a", 1), false), ts(5, "a", 10));
        }

        #[test]
        fn non_positive_offset_wraps_backwards() {
            assert_eq!(next(&RepeatRule::annual_offset(0), &ts(5, "a", 1), false), ts(5, "c", 20));
            assert_eq!(next(&RepeatRule::annual_offset(-1), &ts(5, "a", 1), false), ts(5, "c", 19));
        }

        #[test]
        fn later_time_on_the_same_day_rolls_over() {
            let rule = RepeatRule::annual_offset(25);
            let anchor = CalendarTimestamp::at_hour("tri", 5, "b", 5, 8);
            assert_eq!(next(&rule, &anchor, true), ts(6, "b", 5));
        }
    }

    mod monthly {
        use super::*;

        #[test]
        fn upcoming_position() {
            let rule = RepeatRule::monthly_position("b", 7);
            assert_eq!(next(&rule, &ts(3, "a", 15), false), ts(3, "b", 7));
        }

        #[test]
        fn passed_position_rolls_to_next_year() {
            let rule = RepeatRule::monthly_position("a", 7);
            assert_eq!(next(&rule, &ts(3, "a", 15), false), ts(4, "a", 7));
        }

        #[test]
        fn day_is_clamped_to_month_length() {
            let rule = RepeatRule::monthly_position("b", 45);
            assert_eq!(next(&rule, &ts(3, "a", 1), false), ts(3, "b", 20));
        }

        #[test]
        fn unknown_month_is_an_error() {
            let result = next_occurrence(
                &tri(),
                "tri",
                &RepeatRule::monthly_position("zz", 1),
                &ts(3, "a", 1),
                OccurrenceQuery::default(),
                &RepeatRuleServices::none(),
            );
            assert!(matches!(result, Err(DomainError::UnknownReference { .. })));
        }
    }

    mod weekly {
        use super::*;

        #[test]
        fn next_matching_weekday() {
            // Day 2 of year 1 is absolute day 1, weekday 1; weekday 4 is day 5.
            let rule = RepeatRule::weekly(4, 1);
            assert_eq!(next(&rule, &ts(1, "a", 2), false), ts(1, "a", 5));
        }

        #[test]
        fn same_weekday_excluded_jumps_a_week() {
            let rule = RepeatRule::weekly(1, 1);
            assert_eq!(next(&rule, &ts(1, "a", 2), false), ts(1, "a", 8));
            assert_eq!(next(&rule, &ts(1, "a", 2), true), ts(1, "a", 2));
        }

        #[test]
        fn wraps_across_year_boundary() {
            // Day 60 of year 1 is absolute 59, weekday 5; weekday 0 is absolute 60.
            let rule = RepeatRule::weekly(0, 1);
            assert_eq!(next(&rule, &ts(1, "c", 20), false), ts(2, "a", 1));
        }

        #[test]
        fn before_epoch_uses_euclidean_weekdays() {
            // Absolute -1 is weekday 5.
            let rule = RepeatRule::weekly(5, 1);
            assert_eq!(next(&rule, &ts(0, "c", 20), true), ts(0, "c", 20));
        }

        #[test]
        fn interval_same_weekday_excluded_jumps_whole_interval() {
            // a8 is absolute 7, weekday 1.
            let rule = RepeatRule::weekly(1, 2);
            assert_eq!(next(&rule, &ts(1, "a", 8), false), ts(1, "a", 20));
            assert_eq!(next(&rule, &ts(1, "a", 8), true), ts(1, "a", 8));
        }

        #[test]
        fn interval_partial_week_rounds_up_to_interval_boundary() {
            // From a1 (weekday 0) the natural delta of 2 rounds up to 12.
            let rule = RepeatRule::weekly(2, 2);
            assert_eq!(next(&rule, &ts(1, "a", 1), false), ts(1, "a", 13));
            assert_eq!(next(&rule, &ts(1, "a", 1), true), ts(1, "a", 13));
        }

        #[test]
        fn interval_is_counted_from_the_anchor() {
            let schema = tri();
            let rule = RepeatRule::weekly(3, 3);
            let mut cursor = ts(1, "a", 1);
            let mut previous = timestamp_to_absolute_day(&schema, &cursor).unwrap();
            for _ in 0..10 {
                cursor = next(&rule, &cursor, false);
                let absolute = timestamp_to_absolute_day(&schema, &cursor).unwrap();
                assert_eq!(absolute - previous, 18);
                previous = absolute;
            }
            assert_eq!(cursor, ts(4, "a", 1));
        }

        #[test]
        fn day_index_out_of_range_is_invalid() {
            let result = next_occurrence(
                &tri(),
                "tri",
                &RepeatRule::weekly(6, 1),
                &ts(1, "a", 1),
                OccurrenceQuery::default(),
                &RepeatRuleServices::none(),
            );
            let err = result.unwrap_err();
            assert!(matches!(
                err,
                DomainError::InvalidRule {
                    rule_type: "weekly_dayIndex",
                    ..
                }
            ));
            assert!(err.to_string().contains("tri"));
        }
    }

    mod unsupported {
        use super::*;

        struct NoonEveryDay;

        impl AstronomicalEventCalculator for NoonEveryDay {
            fn resolve_next_occurrence(
                &self,
                schema: &CalendarSchema,
                calendar_id: &str,
                _rule: &AstronomicalRule,
                start: &CalendarTimestamp,
                _query: OccurrenceQuery,
            ) -> Result<Option<CalendarTimestamp>, DomainError> {
                let absolute = timestamp_to_absolute_day(schema, start)?;
                absolute_day_to_timestamp(schema, calendar_id, absolute + 1).map(Some)
            }

            fn resolve_occurrences_in_range(
                &self,
                schema: &CalendarSchema,
                calendar_id: &str,
                _rule: &AstronomicalRule,
                range_start: &CalendarTimestamp,
                _range_end: &CalendarTimestamp,
                _query: RangeQuery,
            ) -> Result<Vec<CalendarTimestamp>, DomainError> {
                let absolute = timestamp_to_absolute_day(schema, range_start)?;
                (1..=30)
                    .map(|offset| absolute_day_to_timestamp(schema, calendar_id, absolute + offset))
                    .collect()
            }
        }

        fn sunrise() -> RepeatRule {
            RepeatRule::Astronomical(AstronomicalRule::new(AstronomicalSource::Sunrise))
        }

        #[test]
        fn astronomical_without_calculator_fails_fast() {
            let result = next_occurrence(
                &tri(),
                "tri",
                &sunrise(),
                &ts(1, "a", 1),
                OccurrenceQuery::default(),
                &RepeatRuleServices::none(),
            );
            assert!(matches!(
                result,
                Err(DomainError::UnsupportedRule {
                    rule_type: "astronomical"
                })
            ));
        }

        #[test]
        fn astronomical_delegates_to_calculator() {
            let services = RepeatRuleServices::with_astronomical_calculator(Arc::new(NoonEveryDay));
            let result = next_occurrence(
                &tri(),
                "tri",
                &sunrise(),
                &ts(1, "a", 1),
                OccurrenceQuery::default(),
                &services,
            )
            .unwrap();
            assert_eq!(result, Some(ts(1, "a", 2)));
        }

        #[test]
        fn astronomical_range_is_truncated_to_limit() {
            let services = RepeatRuleServices::with_astronomical_calculator(Arc::new(NoonEveryDay));
            let found = occurrences_in_range(
                &tri(),
                "tri",
                &sunrise(),
                &ts(1, "a", 1),
                &ts(1, "c", 1),
                RangeQuery::default().with_limit(4),
                &services,
            )
            .unwrap();
            assert_eq!(found.len(), 4);
        }

        #[test]
        fn custom_is_never_supported() {
            let rule = RepeatRule::Custom {
                custom_rule_id: "lunar-festival".to_string(),
            };
            let services = RepeatRuleServices::with_astronomical_calculator(Arc::new(NoonEveryDay));
            let result = next_occurrence(
                &tri(),
                "tri",
                &rule,
                &ts(1, "a", 1),
                OccurrenceQuery::default(),
                &services,
            );
            assert!(result.unwrap_err().is_unsupported());
        }
    }

    mod range {
        use super::*;

        fn scan(rule: &RepeatRule, from: CalendarTimestamp, to: CalendarTimestamp, query: RangeQuery) -> Vec<CalendarTimestamp> {
            occurrences_in_range(&tri(), "tri", rule, &from, &to, query, &RepeatRuleServices::none()).unwrap()
        }

        #[test]
        fn weekly_range_lists_every_match() {
            let found = scan(&RepeatRule::weekly(0, 1), ts(1, "a", 1), ts(1, "b", 1), RangeQuery::default().including_start());
            let days: Vec<u32> = found.iter().map(|t| t.day).collect();
            assert_eq!(days, vec![1, 7, 13, 19]);
            assert_eq!(found.last().map(|t| t.month_id.as_str()), Some("a"));
        }

        #[test]
        fn include_start_applies_to_first_step_only() {
            let rule = RepeatRule::weekly(0, 1);
            let excluded = scan(&rule, ts(1, "a", 1), ts(1, "a", 20), RangeQuery::default());
            assert_eq!(excluded.first(), Some(&ts(1, "a", 7)));
            let included = scan(&rule, ts(1, "a", 1), ts(1, "a", 20), RangeQuery::default().including_start());
            assert_eq!(included.first(), Some(&ts(1, "a", 1)));
        }

        #[test]
        fn end_is_inclusive() {
            let found = scan(&RepeatRule::weekly(0, 1), ts(1, "a", 1), ts(1, "a", 13), RangeQuery::default());
            assert_eq!(found, vec![ts(1, "a", 7), ts(1, "a", 13)]);
        }

        #[test]
        fn reversed_endpoints_are_swapped() {
            let rule = RepeatRule::annual_offset(10);
            let forward = scan(&rule, ts(1, "a", 1), ts(4, "a", 1), RangeQuery::default());
            let reversed = scan(&rule, ts(4, "a", 1), ts(1, "a", 1), RangeQuery::default());
            assert_eq!(forward, reversed);
            assert_eq!(forward.len(), 3);
        }

        #[test]
        fn limit_caps_results() {
            let found = scan(&RepeatRule::weekly(0, 1), ts(1, "a", 1), ts(50, "a", 1), RangeQuery::default());
            assert_eq!(found.len(), DEFAULT_RANGE_LIMIT);
            let none = scan(&RepeatRule::weekly(0, 1), ts(1, "a", 1), ts(50, "a", 1), RangeQuery::default().with_limit(0));
            assert!(none.is_empty());
        }

        #[test]
        fn results_strictly_increase() {
            let schema = tri();
            for rule in [
                RepeatRule::annual_offset(33),
                RepeatRule::monthly_position("c", 99),
                RepeatRule::weekly(5, 4),
            ] {
                let found = scan(&rule, ts(1, "a", 1), ts(30, "a", 1), RangeQuery::default().with_limit(50));
                assert!(!found.is_empty());
                for pair in found.windows(2) {
                    assert_eq!(
                        compare_timestamps_with_schema(&schema, &pair[0], &pair[1]),
                        Ordering::Less
                    );
                }
            }
        }

        #[test]
        fn errors_propagate() {
            let result = occurrences_in_range(
                &tri(),
                "tri",
                &RepeatRule::weekly(9, 1),
                &ts(1, "a", 1),
                &ts(2, "a", 1),
                RangeQuery::default(),
                &RepeatRuleServices::none(),
            );
            assert!(result.is_err());
        }
    }

    mod serde_shape {
        use super::*;

        #[test]
        fn tagged_by_type() {
            let rule: RepeatRule = serde_json::from_value(json!({ "type": "weekly_dayIndex", "dayIndex": 3 })).unwrap();
            assert_eq!(rule, RepeatRule::weekly(3, 1));

            let rule: RepeatRule = serde_json::from_value(json!({
                "type": "astronomical",
                "source": "moon_phase",
                "offsetMinutes": -30
            }))
            .unwrap();
            assert!(matches!(
                rule,
                RepeatRule::Astronomical(AstronomicalRule {
                    source: AstronomicalSource::MoonPhase,
                    offset_minutes: Some(-30),
                    ..
                })
            ));
        }

        #[test]
        fn serializes_camel_case_fields() {
            let value = serde_json::to_value(RepeatRule::monthly_position("b", 4)).unwrap();
            assert_eq!(value, json!({ "type": "monthly_position", "monthId": "b", "day": 4 }));
        }
    }
}
