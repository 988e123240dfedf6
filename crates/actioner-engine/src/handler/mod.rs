//! Action performer trait and label registry.
//!
//! Every handler implements the single-method [`ActionPerformer`] trait. The
//! [`ActionRegistry`] maps action labels to performers and is built once at
//! startup, then only read.

pub mod noop;
pub mod webhook;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use actioner_core::config::{ActionDefinition, ActionKind};
use actioner_core::message::{ActionLabel, MatchMessage};

use crate::error::ActionError;

pub use noop::NoopActionPerformer;
pub use webhook::WebhookActionPerformer;

/// A concrete response to a match.
///
/// Performers receive only the match evidence, never the label or rules
/// that caused them to run.
#[async_trait]
pub trait ActionPerformer: Send + Sync {
    /// The handler variant, for logging.
    fn kind(&self) -> ActionKind;

    /// Carry out the side effect for one match.
    async fn perform_action(&self, match_message: &MatchMessage) -> Result<(), ActionError>;
}

/// Mapping from action label to performer.
///
/// Registering a label twice is rejected; the first registration stays.
#[derive(Clone, Default)]
pub struct ActionRegistry {
    performers: HashMap<ActionLabel, Arc<dyn ActionPerformer>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from `[[actions]]` configuration entries.
    pub fn from_definitions(definitions: &[ActionDefinition]) -> Result<Self, ActionError> {
        let mut registry = Self::new();
        for definition in definitions {
            let label = ActionLabel::new(definition.label.clone());
            let performer: Arc<dyn ActionPerformer> = match definition.kind {
                ActionKind::Noop => Arc::new(NoopActionPerformer::new(label.clone())),
                ActionKind::Webhook => {
                    Arc::new(WebhookActionPerformer::from_definition(definition)?)
                }
            };
            registry.register(label, performer)?;
        }
        tracing::info!(labels = registry.len(), "Action registry built");
        Ok(registry)
    }

    pub fn register(
        &mut self,
        label: ActionLabel,
        performer: Arc<dyn ActionPerformer>,
    ) -> Result<(), ActionError> {
        if self.performers.contains_key(&label) {
            return Err(ActionError::DuplicateLabel(label));
        }
        tracing::debug!(
            action_label = %label,
            kind = %performer.kind(),
            "Registered action performer"
        );
        self.performers.insert(label, performer);
        Ok(())
    }

    /// Look up the performer for a label. `None` means nothing is registered.
    pub fn resolve(&self, label: &ActionLabel) -> Option<Arc<dyn ActionPerformer>> {
        self.performers.get(label).cloned()
    }

    /// Registered labels in sorted order.
    pub fn labels(&self) -> Vec<ActionLabel> {
        let mut labels: Vec<ActionLabel> = self.performers.keys().cloned().collect();
        labels.sort();
        labels
    }

    pub fn len(&self) -> usize {
        self.performers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.performers.is_empty()
    }
}

impl std::fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionRegistry")
            .field("labels", &self.labels())
            .finish()
    }
}
