//! Schedule entity operations.
//!
//! Loads events and phenomena and turns them into occurrences for one calendar.
//! Every listing is lenient: an event or phenomenon that fails to expand is
//! reported in the batch's `skipped` list instead of failing the whole call.

use std::sync::Arc;

use almanac_domain::{
    events_in_range, next_event_occurrences, sort_occurrences_by_timestamp, CalendarEvent,
    CalendarSchema, CalendarTimestamp, OccurrenceBatch, OccurrenceQuery, Phenomenon,
    PhenomenonEngine, RangeQuery, RepeatRuleServices, SkippedSource,
};

use crate::infrastructure::ports::{EventRepo, PhenomenonRepo, RepoError};

/// Schedule entity operations.
pub struct Schedule {
    events: Arc<dyn EventRepo>,
    phenomena: Arc<dyn PhenomenonRepo>,
    engine: PhenomenonEngine,
}

impl Schedule {
    pub fn new(
        events: Arc<dyn EventRepo>,
        phenomena: Arc<dyn PhenomenonRepo>,
        services: RepeatRuleServices,
    ) -> Self {
        Self {
            events,
            phenomena,
            engine: PhenomenonEngine::new(services),
        }
    }

    pub async fn events_for(&self, calendar_id: &str) -> Result<Vec<CalendarEvent>, RepoError> {
        self.events.list_for_calendar(calendar_id).await
    }

    pub async fn phenomena(&self) -> Result<Vec<Phenomenon>, RepoError> {
        self.phenomena.list_all().await
    }

    /// Event and phenomenon occurrences starting in `(from, to]`, sorted.
    pub async fn triggered_between(
        &self,
        schema: &CalendarSchema,
        from: &CalendarTimestamp,
        to: &CalendarTimestamp,
        range_limit: usize,
    ) -> Result<OccurrenceBatch, RepoError> {
        let query = RangeQuery::new(false, range_limit);
        let events = self.events_for(schema.id()).await?;
        let phenomena = self.phenomena().await?;

        let mut batch = events_in_range(
            &events,
            schema,
            schema.id(),
            from,
            to,
            query,
            self.engine.services(),
        );
        batch.merge(
            self.engine
                .triggered_between(&phenomena, schema, schema.id(), from, to, query),
        );
        sort_occurrences_by_timestamp(schema, &mut batch.occurrences);
        Ok(batch)
    }

    /// Next occurrence of each event at or after `from`, sorted and cut to `limit`.
    pub async fn upcoming_events(
        &self,
        schema: &CalendarSchema,
        from: &CalendarTimestamp,
        limit: usize,
    ) -> Result<OccurrenceBatch, RepoError> {
        let events = self.events_for(schema.id()).await?;
        let mut batch = next_event_occurrences(
            &events,
            schema,
            schema.id(),
            from,
            OccurrenceQuery::inclusive(),
            self.engine.services(),
        );
        sort_occurrences_by_timestamp(schema, &mut batch.occurrences);
        batch.occurrences.truncate(limit);
        Ok(batch)
    }

    /// Next occurrence of each visible phenomenon at or after `from`.
    pub async fn upcoming_phenomena(
        &self,
        schema: &CalendarSchema,
        from: &CalendarTimestamp,
        limit: usize,
    ) -> Result<OccurrenceBatch, RepoError> {
        let phenomena = self.phenomena().await?;
        Ok(self
            .engine
            .upcoming_for_calendar(&phenomena, schema, schema.id(), from, limit))
    }
}

/// Emits one warning per source that could not be expanded.
pub fn log_skipped(operation: &'static str, calendar_id: &str, skipped: &[SkippedSource]) {
    for item in skipped {
        tracing::warn!(
            operation,
            calendar_id = %calendar_id,
            source_id = %item.source_id,
            error = %item.error,
            "Skipped source while computing occurrences"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use almanac_domain::{
        create_single_event, CalendarEpoch, CalendarMonth, OccurrenceSource, PhenomenonCategory,
        RepeatRule,
    };

    use crate::infrastructure::ports::{MockEventRepo, MockPhenomenonRepo};

    fn schema() -> CalendarSchema {
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
        .expect("valid schema")
    }

    fn day(year: i32, month: &str, d: u32) -> CalendarTimestamp {
        CalendarTimestamp::at_day("tri", year, month, d)
    }

    fn schedule(events: Vec<CalendarEvent>, phenomena: Vec<Phenomenon>) -> Schedule {
        let mut event_repo = MockEventRepo::new();
        event_repo
            .expect_list_for_calendar()
            .returning(move |_| Ok(events.clone()));
        let mut phenomenon_repo = MockPhenomenonRepo::new();
        phenomenon_repo
            .expect_list_all()
            .returning(move || Ok(phenomena.clone()));
        Schedule::new(
            Arc::new(event_repo),
            Arc::new(phenomenon_repo),
            RepeatRuleServices::none(),
        )
    }

    #[tokio::test]
    async fn triggered_window_excludes_start_and_includes_end() {
        let events = vec![
            create_single_event("on-start", "tri", "Start", day(1, "a", 5)).into(),
            create_single_event("inside", "tri", "Inside", day(1, "a", 7)).into(),
            create_single_event("on-end", "tri", "End", day(1, "a", 9)).into(),
            create_single_event("after", "tri", "After", day(1, "a", 10)).into(),
        ];
        let schedule = schedule(events, Vec::new());

        let batch = schedule
            .triggered_between(&schema(), &day(1, "a", 5), &day(1, "a", 9), 12)
            .await
            .expect("load");

        let ids: Vec<&str> = batch.occurrences.iter().map(|o| o.source_id.as_str()).collect();
        assert_eq!(ids, vec!["inside", "on-end"]);
        assert!(batch.is_clean());
    }

    #[tokio::test]
    async fn triggered_merges_phenomena_in_calendar_order() {
        let events = vec![create_single_event("fair", "tri", "Fair", day(1, "b", 3)).into()];
        let phenomena = vec![Phenomenon::new(
            "midmonth",
            "Midmonth",
            PhenomenonCategory::Holiday,
            RepeatRule::monthly_position("a", 10),
        )];
        let schedule = schedule(events, phenomena);

        let batch = schedule
            .triggered_between(&schema(), &day(1, "a", 1), &day(1, "b", 5), 12)
            .await
            .expect("load");

        let sources: Vec<(OccurrenceSource, &str)> = batch
            .occurrences
            .iter()
            .map(|o| (o.source, o.source_id.as_str()))
            .collect();
        assert_eq!(
            sources,
            vec![
                (OccurrenceSource::Phenomenon, "midmonth"),
                (OccurrenceSource::EventSingle, "fair"),
            ]
        );
    }

    #[tokio::test]
    async fn failing_phenomenon_is_skipped_not_fatal() {
        let phenomena = vec![
            Phenomenon::new(
                "broken",
                "Broken",
                PhenomenonCategory::Custom,
                RepeatRule::monthly_position("nope", 1),
            ),
            Phenomenon::new(
                "weekly",
                "Weekly",
                PhenomenonCategory::Custom,
                RepeatRule::weekly(0, 1),
            ),
        ];
        let schedule = schedule(Vec::new(), phenomena);

        let batch = schedule
            .upcoming_phenomena(&schema(), &day(1, "a", 1), 5)
            .await
            .expect("load");

        assert_eq!(batch.occurrences.len(), 1);
        assert_eq!(batch.occurrences[0].source_id, "weekly");
        assert_eq!(batch.skipped.len(), 1);
        assert_eq!(batch.skipped[0].source_id, "broken");
    }

    #[tokio::test]
    async fn upcoming_events_are_sorted_and_limited() {
        let events = vec![
            create_single_event("late", "tri", "Late", day(1, "c", 1)).into(),
            create_single_event("soon", "tri", "Soon", day(1, "a", 2)).into(),
            create_single_event("past", "tri", "Past", day(0, "c", 1)).into(),
            create_single_event("mid", "tri", "Mid", day(1, "b", 1)).into(),
        ];
        let schedule = schedule(events, Vec::new());

        let batch = schedule
            .upcoming_events(&schema(), &day(1, "a", 1), 2)
            .await
            .expect("load");

        let ids: Vec<&str> = batch.occurrences.iter().map(|o| o.source_id.as_str()).collect();
        assert_eq!(ids, vec!["soon", "mid"]);
    }
}
