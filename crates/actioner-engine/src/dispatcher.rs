//! Action dispatcher.
//!
//! Resolves the performer for an action message's label and runs it against
//! the message's match view.

use std::sync::Arc;

use actioner_core::message::ActionMessage;

use crate::error::ActionError;
use crate::handler::ActionRegistry;

/// Runs the registered performer for an action message.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<ActionRegistry>,
}

impl Dispatcher {
    pub fn new(registry: Arc<ActionRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ActionRegistry {
        &self.registry
    }

    /// Dispatch one action message.
    ///
    /// Returns `Ok(true)` when a performer was found and ran, `Ok(false)` when
    /// no performer is registered for the label. Performer errors are
    /// returned unchanged; nothing is retried or recorded here.
    pub async fn dispatch(&self, message: &ActionMessage) -> Result<bool, ActionError> {
        let Some(performer) = self.registry.resolve(&message.action_label) else {
            tracing::warn!(
                action_label = %message.action_label,
                content_key = %message.content_key,
                "No action performer registered for label"
            );
            return Ok(false);
        };

        tracing::debug!(
            action_label = %message.action_label,
            kind = %performer.kind(),
            content_key = %message.content_key,
            "Performing action"
        );
        performer.perform_action(&message.match_view()).await?;
        Ok(true)
    }
}
