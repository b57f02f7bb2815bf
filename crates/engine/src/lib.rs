//! Almanac Engine library.
//!
//! This crate connects the pure calendar core in `almanac-domain` to storage,
//! hook dispatch and the wall clock.
//!
//! ## Structure
//!
//! - `entities/` - Calendar and schedule operations wrapping the ports
//! - `use_cases/` - Advance time, set timestamp, upcoming listings
//! - `infrastructure/` - External dependency implementations (ports + adapters)
//! - `config` - Environment configuration
//! - `app` - Application composition

pub mod app;
pub mod config;
pub mod entities;
pub mod infrastructure;
pub mod use_cases;

pub use app::App;
pub use config::AlmanacConfig;
