//! Unified error types for the calendar domain
//!
//! Every failure raised by the calendar core is a `DomainError`. Variants carry
//! enough context (rule type, schema id, offending field) for an outer layer to
//! render a message without re-deriving what went wrong.

use thiserror::Error;

/// Unified error type for calendar operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Construction-time validation failed (schema or timestamp shape)
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A repeat rule is well-formed but not valid for the schema it runs against
    #[error("Invalid {rule_type} rule for schema {schema_id}: {message}")]
    InvalidRule {
        rule_type: &'static str,
        schema_id: String,
        message: String,
    },

    /// The rule family has no resolver in this configuration
    #[error("Repeat rule type \"{rule_type}\" is not supported")]
    UnsupportedRule { rule_type: &'static str },

    /// The time policy has no implementation
    #[error("Time policy \"{policy}\" is not supported")]
    UnsupportedTimePolicy { policy: String },

    /// A numeric input fell outside the range the schema allows
    #[error("{field} {value} is out of range for schema {schema_id}")]
    OutOfRange {
        field: &'static str,
        value: i64,
        schema_id: String,
    },

    /// An id did not resolve against the schema
    #[error("{entity_type} with id {id} not found in schema {schema_id}")]
    UnknownReference {
        entity_type: &'static str,
        id: String,
        schema_id: String,
    },

    /// Parse error (for `FromStr` implementations)
    #[error("Parse error: {0}")]
    Parse(String),
}

impl DomainError {
    /// Creates a validation error for malformed schemas or timestamps.
    ///
    /// # Example
    /// ```ignore
    /// if months.is_empty() {
    ///     return Err(DomainError::validation("Calendar must define at least one month"));
    /// }
    /// ```
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create an invalid rule error
    pub fn invalid_rule(
        rule_type: &'static str,
        schema_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidRule {
            rule_type,
            schema_id: schema_id.into(),
            message: message.into(),
        }
    }

    /// Create an unsupported rule error
    pub fn unsupported_rule(rule_type: &'static str) -> Self {
        Self::UnsupportedRule { rule_type }
    }

    /// Create an unsupported time policy error
    pub fn unsupported_time_policy(policy: impl Into<String>) -> Self {
        Self::UnsupportedTimePolicy {
            policy: policy.into(),
        }
    }

    /// Create an out-of-range error
    pub fn out_of_range(field: &'static str, value: i64, schema_id: impl Into<String>) -> Self {
        Self::OutOfRange {
            field,
            value,
            schema_id: schema_id.into(),
        }
    }

    /// Create an unknown month reference error
    pub fn unknown_month(month_id: impl Into<String>, schema_id: impl Into<String>) -> Self {
        Self::UnknownReference {
            entity_type: "Month",
            id: month_id.into(),
            schema_id: schema_id.into(),
        }
    }

    /// Creates a parse error for string-to-type conversion failures.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Returns true for errors that signal a missing extension rather than bad input.
    pub fn is_unsupported(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedRule { .. } | Self::UnsupportedTimePolicy { .. }
        )
    }
}
