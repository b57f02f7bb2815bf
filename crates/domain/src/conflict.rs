//! Conflict detection and priority resolution
//!
//! Occurrences from events and phenomena that overlap in absolute time form a
//! conflict group. Each group elects one active occurrence; the rest are
//! suppressed and only the active one's hooks and effects fire.

use serde::Serialize;

use crate::calendar_math::timestamp_to_absolute_minutes;
use crate::error::DomainError;
use crate::hooks::{sort_hooks_by_priority, HookDescriptor};
use crate::occurrence::Occurrence;
use crate::phenomenon::PhenomenonEffect;
use crate::schema::CalendarSchema;
use crate::timestamp::CalendarTimestamp;

/// Time span covered by a conflict group
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictWindow {
    pub start: CalendarTimestamp,
    pub end: CalendarTimestamp,
}

/// A maximal run of overlapping occurrences, sorted by start
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictGroup {
    pub window: ConflictWindow,
    pub occurrences: Vec<Occurrence>,
}

impl ConflictGroup {
    pub fn has_conflict(&self) -> bool {
        self.occurrences.len() > 1
    }
}

/// Outcome of electing the active occurrence of one group
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictResolution {
    pub window: ConflictWindow,
    /// Non-empty; the first entry is the active occurrence
    ordered: Vec<Occurrence>,
    pub triggered_hooks: Vec<HookDescriptor>,
    pub triggered_effects: Vec<PhenomenonEffect>,
}

impl ConflictResolution {
    pub fn ordered(&self) -> &[Occurrence] {
        &self.ordered
    }

    pub fn active(&self) -> &Occurrence {
        &self.ordered[0]
    }

    pub fn suppressed(&self) -> &[Occurrence] {
        &self.ordered[1..]
    }
}

struct Timed {
    start: i64,
    end: i64,
    occurrence: Occurrence,
}

fn to_timed(schema: &CalendarSchema, occurrence: Occurrence) -> Result<Timed, DomainError> {
    let start = timestamp_to_absolute_minutes(schema, &occurrence.start)?;
    let end = timestamp_to_absolute_minutes(schema, &occurrence.end)?.max(start);
    Ok(Timed {
        start,
        end,
        occurrence,
    })
}

/// Groups overlapping occurrences with a sweep over absolute minutes.
///
/// An occurrence joins the running group when it starts before the group's
/// latest end, or at the very instant the group starts (so zero-length
/// occurrences at the same moment still conflict). Back-to-back windows do
/// not overlap.
///
/// # Errors
///
/// Fails if an occurrence references a month missing from `schema`.
pub fn detect_conflicts(
    schema: &CalendarSchema,
    occurrences: &[Occurrence],
) -> Result<Vec<ConflictGroup>, DomainError> {
    let mut timed = occurrences
        .iter()
        .cloned()
        .map(|o| to_timed(schema, o))
        .collect::<Result<Vec<_>, _>>()?;

    timed.sort_by(|a, b| {
        a.start
            .cmp(&b.start)
            .then_with(|| b.occurrence.priority.cmp(&a.occurrence.priority))
            .then_with(|| a.occurrence.source_id.cmp(&b.occurrence.source_id))
    });

    let mut groups = Vec::new();
    let mut current: Vec<Timed> = Vec::new();
    let mut group_start = 0;
    let mut group_end = 0;

    for item in timed {
        let joins = !current.is_empty() && (item.start < group_end || item.start == group_start);
        if !joins {
            if let Some(group) = close_group(std::mem::take(&mut current)) {
                groups.push(group);
            }
            group_start = item.start;
            group_end = item.end;
        }
        group_end = group_end.max(item.end);
        current.push(item);
    }
    if let Some(group) = close_group(current) {
        groups.push(group);
    }

    Ok(groups)
}

fn close_group(members: Vec<Timed>) -> Option<ConflictGroup> {
    let first = members.first()?;
    let start = first.occurrence.start.clone();
    let latest = members.iter().max_by_key(|m| m.end)?;
    let end = latest.occurrence.end.clone();
    Some(ConflictGroup {
        window: ConflictWindow { start, end },
        occurrences: members.into_iter().map(|m| m.occurrence).collect(),
    })
}

/// Elects the active occurrence of each group: highest priority, then the
/// earliest absolute start, then the smallest source id.
pub fn resolve_conflicts(
    schema: &CalendarSchema,
    groups: Vec<ConflictGroup>,
) -> Result<Vec<ConflictResolution>, DomainError> {
    let mut resolutions = Vec::with_capacity(groups.len());
    for group in groups {
        if group.occurrences.is_empty() {
            continue;
        }
        let mut timed = group
            .occurrences
            .into_iter()
            .map(|o| to_timed(schema, o))
            .collect::<Result<Vec<_>, _>>()?;
        timed.sort_by(|a, b| {
            b.occurrence
                .priority
                .cmp(&a.occurrence.priority)
                .then_with(|| a.start.cmp(&b.start))
                .then_with(|| a.occurrence.source_id.cmp(&b.occurrence.source_id))
        });
        let ordered: Vec<Occurrence> = timed.into_iter().map(|t| t.occurrence).collect();
        let active = &ordered[0];
        let triggered_hooks = sort_hooks_by_priority(&active.hooks);
        let triggered_effects = active.effects.clone();
        resolutions.push(ConflictResolution {
            window: group.window,
            ordered,
            triggered_hooks,
            triggered_effects,
        });
    }
    Ok(resolutions)
}

/// Detects and resolves in one step.
pub fn resolve_occurrences(
    schema: &CalendarSchema,
    occurrences: &[Occurrence],
) -> Result<Vec<ConflictResolution>, DomainError> {
    let groups = detect_conflicts(schema, occurrences)?;
    resolve_conflicts(schema, groups)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::HookType;
    use crate::occurrence::OccurrenceSource;
    use crate::phenomenon::EffectType;
    use crate::schema::{CalendarEpoch, CalendarMonth};

    fn schema() -> CalendarSchema {
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

    fn at(month: &str, day: u32, hour: u32, minute: u32) -> CalendarTimestamp {
        CalendarTimestamp::at_minute("quad", 1, month, day, hour, minute)
    }

    fn occ(id: &str, start: CalendarTimestamp, end: CalendarTimestamp, priority: i32) -> Occurrence {
        Occurrence {
            source: OccurrenceSource::EventSingle,
            source_id: id.to_string(),
            calendar_id: "quad".to_string(),
            label: id.to_string(),
            category: None,
            start,
            end,
            duration_minutes: 0,
            all_day: false,
            priority,
            hooks: Vec::new(),
            effects: Vec::new(),
        }
    }

    mod detection {
        use super::*;

        #[test]
        fn empty_input_has_no_groups() {
            assert!(detect_conflicts(&schema(), &[]).unwrap().is_empty());
        }

        #[test]
        fn overlapping_windows_share_a_group() {
            let list = vec![
                occ("a", at("jan", 1, 10, 0), at("jan", 1, 12, 0), 0),
                occ("b", at("jan", 1, 11, 0), at("jan", 1, 13, 0), 0),
                occ("c", at("jan", 1, 12, 30), at("jan", 1, 14, 0), 0),
                occ("d", at("jan", 2, 9, 0), at("jan", 2, 10, 0), 0),
            ];
            let groups = detect_conflicts(&schema(), &list).unwrap();
            assert_eq!(groups.len(), 2);
            assert_eq!(groups[0].occurrences.len(), 3);
            assert_eq!(groups[0].window.start, at("jan", 1, 10, 0));
            assert_eq!(groups[0].window.end, at("jan", 1, 14, 0));
            assert!(!groups[1].has_conflict());
        }

        #[test]
        fn back_to_back_windows_do_not_conflict() {
            let list = vec![
                occ("a", at("jan", 1, 10, 0), at("jan", 1, 11, 0), 0),
                occ("b", at("jan", 1, 11, 0), at("jan", 1, 12, 0), 0),
            ];
            assert_eq!(detect_conflicts(&schema(), &list).unwrap().len(), 2);
        }

        #[test]
        fn simultaneous_instants_conflict() {
            let list = vec![
                occ("a", at("feb", 3, 8, 0), at("feb", 3, 8, 0), 0),
                occ("b", at("feb", 3, 8, 0), at("feb", 3, 8, 0), 0),
            ];
            let groups = detect_conflicts(&schema(), &list).unwrap();
            assert_eq!(groups.len(), 1);
            assert!(groups[0].has_conflict());
        }

        #[test]
        fn grouping_follows_calendar_order_not_month_names() {
            // "apr" sorts before "jan" lexically but is later in the year.
            let list = vec![
                occ("spring", at("apr", 1, 0, 0), at("apr", 1, 1, 0), 0),
                occ("winter", at("jan", 1, 0, 0), at("jan", 1, 1, 0), 0),
            ];
            let groups = detect_conflicts(&schema(), &list).unwrap();
            assert_eq!(groups[0].occurrences[0].source_id, "winter");
            assert_eq!(groups[1].occurrences[0].source_id, "spring");
        }

        #[test]
        fn unknown_month_is_an_error() {
            let list = vec![occ("x", at("smarch", 1, 0, 0), at("smarch", 1, 0, 0), 0)];
            assert!(detect_conflicts(&schema(), &list).is_err());
        }
    }

    mod resolution {
        use super::*;

        #[test]
        fn highest_priority_wins() {
            let list = vec![
                occ("low", at("jan", 1, 10, 0), at("jan", 1, 12, 0), 1),
                occ("high", at("jan", 1, 11, 0), at("jan", 1, 12, 0), 9),
            ];
            let resolutions = resolve_occurrences(&schema(), &list).unwrap();
            assert_eq!(resolutions.len(), 1);
            assert_eq!(resolutions[0].active().source_id, "high");
            assert_eq!(resolutions[0].suppressed().len(), 1);
            assert_eq!(resolutions[0].suppressed()[0].source_id, "low");
        }

        #[test]
        fn equal_priority_prefers_earliest_start() {
            let list = vec![
                occ("z-early", at("feb", 1, 10, 0), at("feb", 1, 12, 0), 2),
                occ("a-late", at("feb", 1, 11, 0), at("feb", 1, 12, 0), 2),
            ];
            let resolutions = resolve_occurrences(&schema(), &list).unwrap();
            assert_eq!(resolutions[0].active().source_id, "z-early");
        }

        #[test]
        fn earliest_start_uses_calendar_order() {
            // One long occurrence from jan into apr overlapping one in feb.
            let list = vec![
                occ("b", at("jan", 20, 0, 0), at("apr", 5, 0, 0), 1),
                occ("a", at("feb", 2, 0, 0), at("feb", 3, 0, 0), 1),
            ];
            let resolutions = resolve_occurrences(&schema(), &list).unwrap();
            assert_eq!(resolutions[0].active().source_id, "b");
        }

        #[test]
        fn same_instant_same_priority_is_deterministic() {
            let first = occ("alpha", at("mar", 4, 6, 0), at("mar", 4, 7, 0), 3);
            let second = occ("beta", at("mar", 4, 6, 0), at("mar", 4, 7, 0), 3);
            for list in [vec![first.clone(), second.clone()], vec![second, first]] {
                let resolutions = resolve_occurrences(&schema(), &list).unwrap();
                assert_eq!(resolutions.len(), 1);
                assert_eq!(resolutions[0].active().source_id, "alpha");
                assert_eq!(resolutions[0].ordered().len(), 2);
            }
        }

        #[test]
        fn only_the_active_occurrence_triggers() {
            let mut winner = occ("winner", at("jan", 5, 0, 0), at("jan", 6, 0, 0), 5);
            winner.source = OccurrenceSource::Phenomenon;
            winner.hooks = vec![
                HookDescriptor::new("second", HookType::Script),
                HookDescriptor::new("first", HookType::Webhook).with_priority(2),
            ];
            winner.effects = vec![PhenomenonEffect::new(EffectType::Weather)];
            let mut loser = occ("loser", at("jan", 5, 0, 0), at("jan", 6, 0, 0), 1);
            loser.hooks = vec![HookDescriptor::new("never", HookType::Script)];

            let resolutions = resolve_occurrences(&schema(), &[loser, winner]).unwrap();
            let hook_ids: Vec<&str> = resolutions[0].triggered_hooks.iter().map(|h| h.id.as_str()).collect();
            assert_eq!(hook_ids, vec!["first", "second"]);
            assert_eq!(resolutions[0].triggered_effects.len(), 1);
        }

        #[test]
        fn empty_groups_are_ignored() {
            let group = ConflictGroup {
                window: ConflictWindow {
                    start: at("jan", 1, 0, 0),
                    end: at("jan", 1, 0, 0),
                },
                occurrences: Vec::new(),
            };
            assert!(resolve_conflicts(&schema(), vec![group]).unwrap().is_empty());
        }
    }
}
