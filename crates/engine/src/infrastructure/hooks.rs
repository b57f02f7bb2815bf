//! Hook dispatcher that logs instead of calling out.
//!
//! Webhook and script execution belong to the host; this adapter records each
//! dispatch and emits it through `tracing` so the demo binary and tests can see
//! which hooks fired and with what context.

use almanac_domain::{HookDescriptor, HookType};
use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::infrastructure::ports::{HookDispatchContext, HookDispatchError, HookDispatcher};

/// One hook that went through the dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchRecord {
    pub hook: HookDescriptor,
    pub context: HookDispatchContext,
}

#[derive(Default)]
pub struct TracingHookDispatcher {
    records: RwLock<Vec<DispatchRecord>>,
}

impl TracingHookDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn records(&self) -> Vec<DispatchRecord> {
        self.records.read().await.clone()
    }
}

#[async_trait]
impl HookDispatcher for TracingHookDispatcher {
    async fn dispatch(
        &self,
        hook: &HookDescriptor,
        context: &HookDispatchContext,
    ) -> Result<(), HookDispatchError> {
        if hook.hook_type == HookType::Webhook && !hook.config.contains_key("url") {
            return Err(HookDispatchError::rejected(
                &hook.id,
                "webhook config has no url",
            ));
        }

        let payload = serde_json::to_string(context)
            .map_err(|e| HookDispatchError::rejected(&hook.id, e))?;

        tracing::info!(
            dispatch_id = %context.dispatch_id,
            hook_id = %hook.id,
            hook_type = %hook.hook_type,
            source_id = %context.source_id,
            calendar_id = %context.calendar_id,
            payload = %payload,
            "Dispatched hook"
        );

        self.records.write().await.push(DispatchRecord {
            hook: hook.clone(),
            context: context.clone(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use almanac_domain::{CalendarTimestamp, Occurrence, OccurrenceSource};
    use chrono::Utc;
    use serde_json::json;
    use uuid::Uuid;

    fn context() -> HookDispatchContext {
        let start = CalendarTimestamp::at_day("gregorian", 2024, "march", 20);
        let occurrence = Occurrence {
            source: OccurrenceSource::Phenomenon,
            source_id: "equinox".to_string(),
            calendar_id: "gregorian".to_string(),
            label: "Equinox".to_string(),
            category: Some("season".to_string()),
            start: start.clone(),
            end: start.clone(),
            duration_minutes: 1440,
            all_day: true,
            priority: 0,
            hooks: Vec::new(),
            effects: Vec::new(),
        };
        HookDispatchContext::for_occurrence(Uuid::nil(), Utc::now(), &start, &occurrence, Vec::new())
    }

    #[tokio::test]
    async fn records_dispatched_hooks() {
        let dispatcher = TracingHookDispatcher::new();
        let hook = HookDescriptor::new("notify", HookType::CartographerEvent);

        dispatcher.dispatch(&hook, &context()).await.expect("dispatch");

        let records = dispatcher.records().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].hook.id, "notify");
        assert_eq!(records[0].context.source_id, "equinox");
    }

    #[tokio::test]
    async fn webhook_without_url_is_rejected() {
        let dispatcher = TracingHookDispatcher::new();
        let bare = HookDescriptor::new("ping", HookType::Webhook);

        let err = dispatcher.dispatch(&bare, &context()).await.unwrap_err();
        assert!(matches!(err, HookDispatchError::Rejected { ref hook_id, .. } if hook_id == "ping"));
        assert!(dispatcher.records().await.is_empty());

        let with_url = bare.with_config("url", json!("https://example.invalid/hook"));
        dispatcher.dispatch(&with_url, &context()).await.expect("dispatch");
        assert_eq!(dispatcher.records().await.len(), 1);
    }
}
