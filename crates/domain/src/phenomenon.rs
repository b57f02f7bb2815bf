//! Phenomena: recurring happenings visible across calendars
//!
//! Seasons, tides, moon phases and holidays share the recurring-event shape
//! but have no bounds and may be shared by several calendars. The
//! [`PhenomenonEngine`] evaluates them, including the lenient multi-phenomenon
//! listings used for "upcoming" panels and time-advance triggers.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::DomainError;
use crate::hooks::{sort_hooks_by_priority, HookDescriptor};
use crate::occurrence::{
    sort_occurrences_by_timestamp, ClockTime, Occurrence, OccurrenceBatch, OccurrenceSource,
    ScheduledTime, TimePolicy,
};
use crate::repeat_rule::{
    next_occurrence, occurrences_in_range, OccurrenceQuery, RangeQuery, RepeatRule,
    RepeatRuleServices,
};
use crate::schema::{CalendarSchema, DEFAULT_SCHEMA_VERSION};
use crate::timestamp::CalendarTimestamp;

pub const DEFAULT_PHENOMENON_PRIORITY: i32 = 0;

// =============================================================================
// Types
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhenomenonCategory {
    Season,
    Astronomy,
    Weather,
    Tide,
    Holiday,
    Custom,
}

impl PhenomenonCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            PhenomenonCategory::Season => "season",
            PhenomenonCategory::Astronomy => "astronomy",
            PhenomenonCategory::Weather => "weather",
            PhenomenonCategory::Tide => "tide",
            PhenomenonCategory::Holiday => "holiday",
            PhenomenonCategory::Custom => "custom",
        }
    }
}

impl fmt::Display for PhenomenonCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhenomenonVisibility {
    AllCalendars,
    Selected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectType {
    Weather,
    Narrative,
    Mechanical,
}

/// Game-facing consequence of a phenomenon (weather change, story beat, rule modifier)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhenomenonEffect {
    #[serde(rename = "type")]
    pub effect_type: EffectType,
    #[serde(default)]
    pub payload: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub applies_to: Vec<String>,
}

impl PhenomenonEffect {
    pub fn new(effect_type: EffectType) -> Self {
        Self {
            effect_type,
            payload: Map::new(),
            applies_to: Vec::new(),
        }
    }

    pub fn with_payload(mut self, key: impl Into<String>, value: Value) -> Self {
        self.payload.insert(key.into(), value);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Phenomenon {
    pub id: String,
    pub name: String,
    pub category: PhenomenonCategory,
    pub visibility: PhenomenonVisibility,
    #[serde(default)]
    pub applies_to_calendar_ids: Vec<String>,
    pub rule: RepeatRule,
    pub time_policy: TimePolicy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<ClockTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset_minutes: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub effects: Vec<PhenomenonEffect>,
    #[serde(default)]
    pub priority: i32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hooks: Vec<HookDescriptor>,
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
}

fn default_schema_version() -> String {
    DEFAULT_SCHEMA_VERSION.to_string()
}

impl Phenomenon {
    /// Creates an all-day phenomenon visible in every calendar.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        category: PhenomenonCategory,
        rule: RepeatRule,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category,
            visibility: PhenomenonVisibility::AllCalendars,
            applies_to_calendar_ids: Vec::new(),
            rule,
            time_policy: TimePolicy::AllDay,
            start_time: None,
            offset_minutes: None,
            duration_minutes: None,
            effects: Vec::new(),
            priority: DEFAULT_PHENOMENON_PRIORITY,
            tags: Vec::new(),
            notes: None,
            hooks: Vec::new(),
            schema_version: default_schema_version(),
        }
    }

    /// Restricts visibility to the given calendars.
    pub fn visible_in<I, S>(mut self, calendar_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.visibility = PhenomenonVisibility::Selected;
        self.applies_to_calendar_ids = calendar_ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_schedule(mut self, scheduled: ScheduledTime) -> Self {
        self.time_policy = scheduled.policy;
        self.start_time = scheduled.start_time;
        self.offset_minutes = scheduled.offset_minutes;
        self.duration_minutes = scheduled.duration_minutes;
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_hooks(mut self, hooks: Vec<HookDescriptor>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn with_effects(mut self, effects: Vec<PhenomenonEffect>) -> Self {
        self.effects = effects;
        self
    }

    pub fn is_visible_for(&self, calendar_id: &str) -> bool {
        match self.visibility {
            PhenomenonVisibility::AllCalendars => true,
            PhenomenonVisibility::Selected => self
                .applies_to_calendar_ids
                .iter()
                .any(|id| id == calendar_id),
        }
    }

    /// The clock time used by the fixed policy; `None` for other policies.
    pub fn effective_start_time(&self) -> Option<ClockTime> {
        match self.time_policy {
            TimePolicy::Fixed => Some(self.start_time.unwrap_or_default()),
            TimePolicy::AllDay | TimePolicy::Offset => None,
        }
    }

    pub fn requires_offset_computation(&self) -> bool {
        self.time_policy == TimePolicy::Offset
    }

    pub fn scheduled_time(&self) -> ScheduledTime {
        ScheduledTime {
            policy: self.time_policy,
            start_time: self.start_time,
            offset_minutes: self.offset_minutes,
            duration_minutes: self.duration_minutes,
        }
    }

    fn occurrence(
        &self,
        schema: &CalendarSchema,
        calendar_id: &str,
        base: &CalendarTimestamp,
    ) -> Result<Occurrence, DomainError> {
        let window = self.scheduled_time().window(schema, calendar_id, base)?;
        Ok(Occurrence {
            source: OccurrenceSource::Phenomenon,
            source_id: self.id.clone(),
            calendar_id: calendar_id.to_string(),
            label: self.name.clone(),
            category: Some(self.category.as_str().to_string()),
            start: window.start,
            end: window.end,
            duration_minutes: window.duration_minutes,
            all_day: self.time_policy == TimePolicy::AllDay,
            priority: self.priority,
            hooks: sort_hooks_by_priority(&self.hooks),
            effects: self.effects.clone(),
        })
    }
}

/// Orders by descending priority, then by name.
pub fn compare_phenomena_by_priority(a: &Phenomenon, b: &Phenomenon) -> Ordering {
    b.priority
        .cmp(&a.priority)
        .then_with(|| a.name.cmp(&b.name))
}

// =============================================================================
// Engine
// =============================================================================

/// Evaluates phenomena against a schema with the configured rule services.
///
/// Single lookups propagate errors. The multi-phenomenon listings skip a
/// failing phenomenon and report it in the returned batch instead.
#[derive(Debug, Clone, Default)]
pub struct PhenomenonEngine {
    services: RepeatRuleServices,
}

impl PhenomenonEngine {
    pub fn new(services: RepeatRuleServices) -> Self {
        Self { services }
    }

    pub fn services(&self) -> &RepeatRuleServices {
        &self.services
    }

    pub fn next_occurrence(
        &self,
        phenomenon: &Phenomenon,
        schema: &CalendarSchema,
        calendar_id: &str,
        start: &CalendarTimestamp,
        query: OccurrenceQuery,
    ) -> Result<Option<Occurrence>, DomainError> {
        let base = next_occurrence(schema, calendar_id, &phenomenon.rule, start, query, &self.services)?;
        base.map(|base| phenomenon.occurrence(schema, calendar_id, &base))
            .transpose()
    }

    pub fn occurrences_in_range(
        &self,
        phenomenon: &Phenomenon,
        schema: &CalendarSchema,
        calendar_id: &str,
        range_start: &CalendarTimestamp,
        range_end: &CalendarTimestamp,
        query: RangeQuery,
    ) -> Result<Vec<Occurrence>, DomainError> {
        let bases = occurrences_in_range(
            schema,
            calendar_id,
            &phenomenon.rule,
            range_start,
            range_end,
            query,
            &self.services,
        )?;
        bases
            .iter()
            .map(|base| phenomenon.occurrence(schema, calendar_id, base))
            .collect()
    }

    /// Next occurrence (at or after `from`) of every phenomenon visible in
    /// `calendar_id`, sorted by start and cut to `limit`.
    pub fn upcoming_for_calendar(
        &self,
        phenomena: &[Phenomenon],
        schema: &CalendarSchema,
        calendar_id: &str,
        from: &CalendarTimestamp,
        limit: usize,
    ) -> OccurrenceBatch {
        let mut batch = OccurrenceBatch::default();
        for phenomenon in phenomena.iter().filter(|p| p.is_visible_for(calendar_id)) {
            let result = self.next_occurrence(phenomenon, schema, calendar_id, from, OccurrenceQuery::inclusive());
            if let Some(Some(found)) = batch.record(&phenomenon.id, result) {
                batch.occurrences.push(found);
            }
        }
        sort_occurrences_by_timestamp(schema, &mut batch.occurrences);
        batch.occurrences.truncate(limit);
        batch
    }

    /// Occurrences of every visible phenomenon inside the range, sorted by start.
    pub fn triggered_between(
        &self,
        phenomena: &[Phenomenon],
        schema: &CalendarSchema,
        calendar_id: &str,
        from: &CalendarTimestamp,
        to: &CalendarTimestamp,
        query: RangeQuery,
    ) -> OccurrenceBatch {
        let mut batch = OccurrenceBatch::default();
        for phenomenon in phenomena.iter().filter(|p| p.is_visible_for(calendar_id)) {
            let result = self.occurrences_in_range(phenomenon, schema, calendar_id, from, to, query);
            if let Some(found) = batch.record(&phenomenon.id, result) {
                batch.occurrences.extend(found);
            }
        }
        sort_occurrences_by_timestamp(schema, &mut batch.occurrences);
        batch
    }
}

// =============================================================================
// Tests
// =============================================================================
