//! Time use cases.
//!
//! Handles calendar time operations including:
//! - Advancing the active calendar by days, hours or minutes
//! - Firing the hooks of whatever became active along the way
//! - Setting an exact timestamp

use std::cmp::Ordering;
use std::sync::Arc;

use almanac_domain::{
    advance_time, compare_timestamps_with_schema, resolve_occurrences, AdvanceResult,
    CalendarTimestamp, ConflictResolution, DomainError, Occurrence, SkippedSource, TimeUnit,
};
use uuid::Uuid;

use crate::config::ScheduleLimits;
use crate::entities::{log_skipped, Calendar, CalendarError, Schedule};
use crate::infrastructure::ports::{ClockPort, HookDispatchContext, HookDispatcher, RepoError};

/// Container for time use cases.
pub struct TimeUseCases {
    pub advance: Arc<AdvanceTime>,
    pub set_timestamp: Arc<SetTimestamp>,
}

impl TimeUseCases {
    pub fn new(advance: Arc<AdvanceTime>, set_timestamp: Arc<SetTimestamp>) -> Self {
        Self {
            advance,
            set_timestamp,
        }
    }
}

// =============================================================================
// Advance Time
// =============================================================================

/// A hook whose dispatch failed. The advance itself still succeeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedHook {
    pub hook_id: String,
    pub source_id: String,
    pub message: String,
}

/// Everything that happened during one advance.
#[derive(Debug, Clone)]
pub struct AdvanceTimeOutcome {
    pub calendar_id: String,
    pub previous: CalendarTimestamp,
    pub result: AdvanceResult,
    /// Occurrences starting in `(previous, current]`, in calendar order.
    pub triggered: Vec<Occurrence>,
    pub resolutions: Vec<ConflictResolution>,
    /// Ids of hooks handed to the dispatcher successfully, in dispatch order.
    pub dispatched_hooks: Vec<String>,
    pub failed_hooks: Vec<FailedHook>,
    pub upcoming_phenomena: Vec<Occurrence>,
    pub skipped: Vec<SkippedSource>,
}

impl AdvanceTimeOutcome {
    pub fn current(&self) -> &CalendarTimestamp {
        &self.result.timestamp
    }
}

/// Use case for moving the active calendar forward (or backward) in time.
///
/// Steps:
/// 1. Resolve the active calendar and its current timestamp
/// 2. Advance with carry across hours, days, months and years
/// 3. Collect event and phenomenon occurrences passed over, resolve conflicts
/// 4. Persist the new timestamp, then dispatch the winners' hooks
/// 5. Report the upcoming phenomena from the new position
///
/// Moving backward never triggers anything.
pub struct AdvanceTime {
    calendar: Arc<Calendar>,
    schedule: Arc<Schedule>,
    hooks: Arc<dyn HookDispatcher>,
    clock: Arc<dyn ClockPort>,
    limits: ScheduleLimits,
}

impl AdvanceTime {
    pub fn new(
        calendar: Arc<Calendar>,
        schedule: Arc<Schedule>,
        hooks: Arc<dyn HookDispatcher>,
        clock: Arc<dyn ClockPort>,
        limits: ScheduleLimits,
    ) -> Self {
        Self {
            calendar,
            schedule,
            hooks,
            clock,
            limits,
        }
    }

    pub async fn execute(
        &self,
        amount: i64,
        unit: TimeUnit,
    ) -> Result<AdvanceTimeOutcome, AdvanceTimeError> {
        let schema = self.calendar.active_schema().await?;
        let calendar_id = schema.id().to_string();
        let previous = self.calendar.current_timestamp(&schema).await?;

        tracing::info!(
            calendar_id = %calendar_id,
            amount,
            unit = %unit,
            from = %previous.format_with_schema(&schema),
            "Advancing time"
        );

        let result = advance_time(&schema, &previous, amount, unit)?;
        let moved_forward =
            compare_timestamps_with_schema(&schema, &result.timestamp, &previous) == Ordering::Greater;

        let mut skipped = Vec::new();
        let (triggered, resolutions) = if moved_forward {
            let batch = self
                .schedule
                .triggered_between(&schema, &previous, &result.timestamp, self.limits.range)
                .await?;
            log_skipped("advance_time", &calendar_id, &batch.skipped);
            skipped.extend(batch.skipped);
            let resolutions = resolve_occurrences(&schema, &batch.occurrences)?;
            (batch.occurrences, resolutions)
        } else {
            (Vec::new(), Vec::new())
        };

        self.calendar.save_timestamp(&result.timestamp).await?;

        let (dispatched_hooks, failed_hooks) =
            self.dispatch_hooks(&result.timestamp, &resolutions).await;

        let upcoming = self
            .schedule
            .upcoming_phenomena(&schema, &result.timestamp, self.limits.upcoming)
            .await?;
        log_skipped("upcoming_phenomena", &calendar_id, &upcoming.skipped);
        skipped.extend(upcoming.skipped);

        tracing::info!(
            calendar_id = %calendar_id,
            to = %result.timestamp.format_with_schema(&schema),
            normalized = result.normalized,
            triggered = triggered.len(),
            conflicts = resolutions.iter().filter(|r| !r.suppressed().is_empty()).count(),
            dispatched = dispatched_hooks.len(),
            failed = failed_hooks.len(),
            "Time advanced"
        );

        Ok(AdvanceTimeOutcome {
            calendar_id,
            previous,
            result,
            triggered,
            resolutions,
            dispatched_hooks,
            failed_hooks,
            upcoming_phenomena: upcoming.occurrences,
            skipped,
        })
    }

    async fn dispatch_hooks(
        &self,
        current: &CalendarTimestamp,
        resolutions: &[ConflictResolution],
    ) -> (Vec<String>, Vec<FailedHook>) {
        let dispatch_id = Uuid::new_v4();
        let dispatched_at = self.clock.now();
        let mut dispatched = Vec::new();
        let mut failed = Vec::new();

        for resolution in resolutions {
            let active = resolution.active();
            let context = HookDispatchContext::for_occurrence(
                dispatch_id,
                dispatched_at,
                current,
                active,
                resolution.triggered_effects.clone(),
            );
            for hook in &resolution.triggered_hooks {
                match self.hooks.dispatch(hook, &context).await {
                    Ok(()) => dispatched.push(hook.id.clone()),
                    Err(e) => {
                        tracing::warn!(
                            hook_id = %hook.id,
                            source_id = %active.source_id,
                            error = %e,
                            "Hook dispatch failed"
                        );
                        failed.push(FailedHook {
                            hook_id: hook.id.clone(),
                            source_id: active.source_id.clone(),
                            message: e.to_string(),
                        });
                    }
                }
            }
        }

        (dispatched, failed)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AdvanceTimeError {
    #[error("Calendar error: {0}")]
    Calendar(#[from] CalendarError),
    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),
}

// =============================================================================
// Set Timestamp
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct SetTimestampOutcome {
    pub previous: CalendarTimestamp,
    pub current: CalendarTimestamp,
}

/// Use case for jumping the active calendar to an exact timestamp.
///
/// Nothing is triggered; the target only has to belong to the active calendar
/// and fit its months and time definition.
pub struct SetTimestamp {
    calendar: Arc<Calendar>,
}

impl SetTimestamp {
    pub fn new(calendar: Arc<Calendar>) -> Self {
        Self { calendar }
    }

    pub async fn execute(
        &self,
        target: CalendarTimestamp,
    ) -> Result<SetTimestampOutcome, SetTimestampError> {
        let schema = self.calendar.active_schema().await?;

        if target.calendar_id != schema.id() {
            return Err(SetTimestampError::CalendarMismatch {
                expected: schema.id().to_string(),
                actual: target.calendar_id,
            });
        }
        target.validate_against(&schema)?;

        let previous = self.calendar.current_timestamp(&schema).await?;
        self.calendar.save_timestamp(&target).await?;

        tracing::info!(
            calendar_id = %schema.id(),
            from = %previous.format_with_schema(&schema),
            to = %target.format_with_schema(&schema),
            "Timestamp set"
        );

        Ok(SetTimestampOutcome {
            previous,
            current: target,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SetTimestampError {
    #[error("Timestamp belongs to calendar {actual}, active calendar is {expected}")]
    CalendarMismatch { expected: String, actual: String },
    #[error("Calendar error: {0}")]
    Calendar(#[from] CalendarError),
    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),
    #[error("Invalid timestamp: {0}")]
    Domain(#[from] DomainError),
}
