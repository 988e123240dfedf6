//! Error types for the action engine.

use uuid::Uuid;

use actioner_core::error::ActionerError;
use actioner_core::message::ActionLabel;

/// Errors from handler registration, execution and audit recording.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("Action handler failed: {0}")]
    HandlerFailed(String),
    #[error("Action label already registered: {0}")]
    DuplicateLabel(ActionLabel),
    #[error("Invalid action definition: {0}")]
    InvalidDefinition(String),
    #[error("Storage error: {0}")]
    Storage(#[from] ActionerError),
}

/// A failure attributed to one transport message of a batch.
#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error("Message {message_id} could not be decoded: {reason}")]
    Deserialization { message_id: String, reason: String },
    #[error("Message {message_id} handler failed: {source}")]
    Handler {
        message_id: String,
        source: ActionError,
        audit: FailureAudit,
    },
    #[error("Message {message_id} could not be recorded: {source}")]
    Storage {
        message_id: String,
        source: ActionError,
    },
}

/// Audit outcome for a message whose handler failed.
#[derive(Debug)]
pub enum FailureAudit {
    /// The handler-error policy does not record failed messages.
    Skipped,
    Recorded { event_id: Uuid },
    /// Recording was attempted and failed as well.
    WriteFailed(ActionError),
}

impl IntakeError {
    /// Transport identifier of the message this failure belongs to.
    pub fn message_id(&self) -> &str {
        match self {
            IntakeError::Deserialization { message_id, .. }
            | IntakeError::Handler { message_id, .. }
            | IntakeError::Storage { message_id, .. } => message_id,
        }
    }
}
