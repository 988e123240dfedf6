//! Execution recorder.
//!
//! Appends one audit event per processed action message.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use actioner_core::message::{ActionEvent, ActionLabel, ActionMessage, ActionRule};
use actioner_storage::EventStore;

use crate::error::ActionError;

/// Writes action events to the audit store. Failures are not retried.
#[derive(Clone)]
pub struct ExecutionRecorder {
    store: Arc<dyn EventStore>,
}

impl ExecutionRecorder {
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self { store }
    }

    /// Record that `action_label` was acted on for `content_id`.
    ///
    /// Each rule is serialized on its own so it stays individually
    /// recoverable from the stored event.
    pub fn record(
        &self,
        content_id: &str,
        action_label: &ActionLabel,
        action_rules: &[ActionRule],
        performed_at: DateTime<Utc>,
    ) -> Result<ActionEvent, ActionError> {
        let event = ActionEvent::new(content_id, action_label, action_rules, performed_at)?;
        self.store.append(&event)?;
        tracing::debug!(
            event_id = %event.id,
            content_id = %event.content_id,
            action_label = %event.action_label,
            rules = event.action_rules.len(),
            "Action event recorded"
        );
        Ok(event)
    }

    pub fn record_message(
        &self,
        message: &ActionMessage,
        performed_at: DateTime<Utc>,
    ) -> Result<ActionEvent, ActionError> {
        self.record(
            &message.content_key,
            &message.action_label,
            &message.action_rules,
            performed_at,
        )
    }
}

impl std::fmt::Debug for ExecutionRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionRecorder").finish()
    }
}
