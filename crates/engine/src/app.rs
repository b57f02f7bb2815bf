//! Application state and composition.

use std::sync::Arc;

use almanac_domain::RepeatRuleServices;

use crate::config::AlmanacConfig;
use crate::entities::{Calendar, Schedule};
use crate::infrastructure::{
    clock::SystemClock,
    hooks::TracingHookDispatcher,
    memory::InMemoryAlmanacStore,
    ports::{CalendarRepo, CalendarStateRepo, ClockPort, EventRepo, HookDispatcher, PhenomenonRepo},
};
use crate::use_cases;

/// Main application state.
///
/// Holds the repository ports and the use cases built on top of them.
pub struct App {
    pub repositories: Repositories,
    pub use_cases: UseCases,
    pub config: AlmanacConfig,
}

/// Container for all repository ports.
#[derive(Clone)]
pub struct Repositories {
    pub calendar: Arc<dyn CalendarRepo>,
    pub calendar_state: Arc<dyn CalendarStateRepo>,
    pub event: Arc<dyn EventRepo>,
    pub phenomenon: Arc<dyn PhenomenonRepo>,
}

impl Repositories {
    /// Uses one in-memory store for every port.
    pub fn in_memory(store: Arc<InMemoryAlmanacStore>) -> Self {
        Self {
            calendar: store.clone(),
            calendar_state: store.clone(),
            event: store.clone(),
            phenomenon: store,
        }
    }
}

/// Container for all use cases.
pub struct UseCases {
    pub time: use_cases::TimeUseCases,
    pub upcoming: use_cases::UpcomingUseCases,
}

impl App {
    /// Create a new App with all dependencies wired up.
    pub fn new(
        repositories: Repositories,
        hooks: Arc<dyn HookDispatcher>,
        clock: Arc<dyn ClockPort>,
        services: RepeatRuleServices,
        config: AlmanacConfig,
    ) -> Self {
        let calendar = Arc::new(Calendar::new(
            repositories.calendar.clone(),
            repositories.calendar_state.clone(),
        ));
        let schedule = Arc::new(Schedule::new(
            repositories.event.clone(),
            repositories.phenomenon.clone(),
            services,
        ));

        let time = use_cases::TimeUseCases::new(
            Arc::new(use_cases::AdvanceTime::new(
                calendar.clone(),
                schedule.clone(),
                hooks,
                clock,
                config.limits,
            )),
            Arc::new(use_cases::SetTimestamp::new(calendar.clone())),
        );
        let upcoming = use_cases::UpcomingUseCases::new(Arc::new(
            use_cases::UpcomingOccurrences::new(calendar, schedule, config.limits.upcoming),
        ));

        Self {
            repositories,
            use_cases: UseCases { time, upcoming },
            config,
        }
    }

    /// App over an in-memory store, a logging hook dispatcher and the system clock.
    pub fn in_memory(config: AlmanacConfig) -> Self {
        Self::new(
            Repositories::in_memory(Arc::new(InMemoryAlmanacStore::new())),
            Arc::new(TracingHookDispatcher::new()),
            Arc::new(SystemClock::new()),
            RepeatRuleServices::none(),
            config,
        )
    }
}
