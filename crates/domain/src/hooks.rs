//! Automation hook descriptors shared by events and phenomena
//!
//! A hook is an opaque instruction for the host to run when an occurrence
//! becomes active (call a webhook, run a script, emit a map event). The core
//! only orders them; dispatching belongs to the integrating layer.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::DomainError;

/// What kind of automation a hook performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookType {
    Webhook,
    Script,
    CartographerEvent,
}

impl HookType {
    pub fn as_str(&self) -> &'static str {
        match self {
            HookType::Webhook => "webhook",
            HookType::Script => "script",
            HookType::CartographerEvent => "cartographer_event",
        }
    }
}

impl fmt::Display for HookType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for HookType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "webhook" => Ok(Self::Webhook),
            "script" => Ok(Self::Script),
            "cartographer_event" => Ok(Self::CartographerEvent),
            other => Err(DomainError::parse(format!("Unknown hook type: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HookDescriptor {
    pub id: String,
    #[serde(rename = "type")]
    pub hook_type: HookType,
    /// Free-form configuration interpreted by the dispatcher
    #[serde(default)]
    pub config: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
}

impl HookDescriptor {
    pub fn new(id: impl Into<String>, hook_type: HookType) -> Self {
        Self {
            id: id.into(),
            hook_type,
            config: Map::new(),
            priority: None,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_config(mut self, key: impl Into<String>, value: Value) -> Self {
        self.config.insert(key.into(), value);
        self
    }

    /// Returns the priority, treating an absent one as 0.
    pub fn effective_priority(&self) -> i32 {
        self.priority.unwrap_or(0)
    }
}

/// Orders hooks by descending priority, then by id.
pub fn compare_hooks(a: &HookDescriptor, b: &HookDescriptor) -> Ordering {
    b.effective_priority()
        .cmp(&a.effective_priority())
        .then_with(|| a.id.cmp(&b.id))
}

/// Returns a copy of `hooks` in dispatch order.
pub fn sort_hooks_by_priority(hooks: &[HookDescriptor]) -> Vec<HookDescriptor> {
    let mut sorted = hooks.to_vec();
    sorted.sort_by(compare_hooks);
    sorted
}
