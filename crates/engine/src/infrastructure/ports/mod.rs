//! Port traits for infrastructure boundaries.
//!
//! These are the ONLY abstractions in the engine. Everything else is concrete types.
//! Ports exist for:
//! - Calendar, event and phenomenon storage (in-memory today, a database later)
//! - Hook dispatch (tracing today, webhooks and scripts later)
//! - Clock (for testing)

mod error;
mod external;
mod repos;
mod testing;

// =============================================================================
// Repository Ports
// =============================================================================
pub use repos::{CalendarRepo, CalendarStateRepo, EventRepo, PhenomenonRepo};

// =============================================================================
// External Service Ports
// =============================================================================
pub use external::{HookDispatchContext, HookDispatcher};

// =============================================================================
// Test-Only Mocks (only available during test builds)
// =============================================================================
#[cfg(test)]
pub use repos::{MockCalendarRepo, MockCalendarStateRepo, MockEventRepo, MockPhenomenonRepo};

#[cfg(test)]
pub use external::MockHookDispatcher;

#[cfg(test)]
pub use testing::MockClockPort;

// =============================================================================
// Testing Ports
// =============================================================================
pub use testing::ClockPort;

// =============================================================================
// Error Types
// =============================================================================
pub use error::{HookDispatchError, RepoError};
