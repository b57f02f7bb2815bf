//! Environment configuration.
//!
//! Supported environment variables:
//! - ALMANAC_UPCOMING_LIMIT: items per upcoming listing (default 5, at least 1)
//! - ALMANAC_RANGE_LIMIT: cap for range scans (default 12, at least 1)
//! - ALMANAC_LOG_FILTER: default tracing filter when RUST_LOG is unset
//! - ALMANAC_ADVANCE_AMOUNT / ALMANAC_ADVANCE_UNIT: step taken by the demo binary
//!
//! Invalid values are ignored with a warning and the default is kept.

use std::str::FromStr;

use almanac_domain::{TimeUnit, DEFAULT_RANGE_LIMIT};

pub const DEFAULT_UPCOMING_LIMIT: usize = 5;
pub const DEFAULT_LOG_FILTER: &str = "almanac_engine=info";

/// Caps applied by the scheduling use cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleLimits {
    pub upcoming: usize,
    pub range: usize,
}

impl Default for ScheduleLimits {
    fn default() -> Self {
        Self {
            upcoming: DEFAULT_UPCOMING_LIMIT,
            range: DEFAULT_RANGE_LIMIT,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlmanacConfig {
    pub limits: ScheduleLimits,
    pub log_filter: String,
    pub advance_amount: i64,
    pub advance_unit: TimeUnit,
}

impl Default for AlmanacConfig {
    fn default() -> Self {
        Self {
            limits: ScheduleLimits::default(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            advance_amount: 1,
            advance_unit: TimeUnit::Day,
        }
    }
}

impl AlmanacConfig {
    /// Reads the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(limit) = parse_var::<usize>(&lookup, "ALMANAC_UPCOMING_LIMIT") {
            if limit >= 1 {
                config.limits.upcoming = limit;
            } else {
                tracing::warn!(limit, "ALMANAC_UPCOMING_LIMIT must be at least 1, ignoring");
            }
        }

        if let Some(limit) = parse_var::<usize>(&lookup, "ALMANAC_RANGE_LIMIT") {
            if limit >= 1 {
                config.limits.range = limit;
            } else {
                tracing::warn!(limit, "ALMANAC_RANGE_LIMIT must be at least 1, ignoring");
            }
        }

        if let Some(filter) = log_filter_from(&lookup) {
            config.log_filter = filter;
        }

        if let Some(amount) = parse_var::<i64>(&lookup, "ALMANAC_ADVANCE_AMOUNT") {
            config.advance_amount = amount;
        }

        if let Some(unit) = parse_var::<TimeUnit>(&lookup, "ALMANAC_ADVANCE_UNIT") {
            config.advance_unit = unit;
        }

        config
    }
}

/// Tracing filter from the environment, before the subscriber exists.
pub fn log_filter_from_env() -> String {
    log_filter_from(&|key: &str| std::env::var(key).ok())
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string())
}

fn log_filter_from(lookup: &impl Fn(&str) -> Option<String>) -> Option<String> {
    lookup("ALMANAC_LOG_FILTER")
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &'static str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Invalid configuration value, using default");
            None
        }
    }
}
