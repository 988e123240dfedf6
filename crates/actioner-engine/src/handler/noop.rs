//! No-op action performer.
//!
//! For labels whose only effect is the audit trail.

use async_trait::async_trait;

use actioner_core::config::ActionKind;
use actioner_core::message::{ActionLabel, MatchMessage};

use crate::error::ActionError;
use crate::handler::ActionPerformer;

/// Performer that logs the match and succeeds.
pub struct NoopActionPerformer {
    label: ActionLabel,
}

impl NoopActionPerformer {
    pub fn new(label: ActionLabel) -> Self {
        Self { label }
    }
}

#[async_trait]
impl ActionPerformer for NoopActionPerformer {
    fn kind(&self) -> ActionKind {
        ActionKind::Noop
    }

    async fn perform_action(&self, match_message: &MatchMessage) -> Result<(), ActionError> {
        tracing::info!(
            action_label = %self.label,
            content_key = %match_message.content_key,
            signals = match_message.matching_banked_signals.len(),
            "No-op action performed"
        );
        Ok(())
    }
}
