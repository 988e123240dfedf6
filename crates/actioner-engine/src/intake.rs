//! Intake loop.
//!
//! Processes one batch of transport messages per invocation: decode,
//! dispatch, record, then report per-message outcomes so the transport can
//! redeliver what failed.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use actioner_core::config::{AckMode, HandlerErrorPolicy, IntakeConfig};
use actioner_core::error::ActionerError;
use actioner_core::message::ActionMessage;

use crate::dispatcher::Dispatcher;
use crate::error::{FailureAudit, IntakeError};
use crate::recorder::ExecutionRecorder;

/// One opaque message as delivered by the queue transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportMessage {
    pub message_id: String,
    pub body: String,
}

impl TransportMessage {
    pub fn new(message_id: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            message_id: message_id.into(),
            body: body.into(),
        }
    }
}

/// The host's batch envelope: `{"Records": [{"messageId": ..., "body": ...}]}`.
#[derive(Debug, Deserialize)]
pub struct TransportBatch {
    #[serde(rename = "Records", default)]
    records: Vec<TransportRecord>,
}

#[derive(Debug, Deserialize)]
struct TransportRecord {
    #[serde(rename = "messageId", default)]
    message_id: Option<String>,
    body: String,
}

impl TransportBatch {
    pub fn from_json(json: &str) -> Result<Self, ActionerError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Records without a `messageId` are identified as `index-<n>` by their
    /// position in the batch.
    pub fn into_messages(self) -> Vec<TransportMessage> {
        self.records
            .into_iter()
            .enumerate()
            .map(|(index, record)| TransportMessage {
                message_id: record
                    .message_id
                    .unwrap_or_else(|| format!("index-{}", index)),
                body: record.body,
            })
            .collect()
    }
}

/// What happened to one message.
#[derive(Debug)]
pub enum MessageOutcome {
    /// A performer ran and the event was recorded.
    Performed { event_id: Uuid },
    /// No performer is registered for the label; the event was still recorded.
    Unresolved { event_id: Uuid },
    Failed(IntakeError),
}

#[derive(Debug)]
pub struct MessageReport {
    pub message_id: String,
    pub outcome: MessageOutcome,
}

/// Per-message outcomes of one batch, in delivery order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub messages: Vec<MessageReport>,
}

impl BatchReport {
    pub fn failures(&self) -> impl Iterator<Item = &IntakeError> {
        self.messages.iter().filter_map(|m| match &m.outcome {
            MessageOutcome::Failed(err) => Some(err),
            _ => None,
        })
    }

    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
    }

    pub fn performed_count(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| matches!(m.outcome, MessageOutcome::Performed { .. }))
            .count()
    }

    pub fn unresolved_count(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| matches!(m.outcome, MessageOutcome::Unresolved { .. }))
            .count()
    }

    /// Build the acknowledgement returned to the transport.
    ///
    /// Under [`AckMode::Partial`] only failed messages are listed. Under
    /// [`AckMode::Batch`] any failure lists every message so the whole batch
    /// is redelivered.
    pub fn response(&self, ack_mode: AckMode) -> BatchResponse {
        let failed: Vec<&str> = match ack_mode {
            AckMode::Partial => self.failures().map(IntakeError::message_id).collect(),
            AckMode::Batch if self.is_success() => Vec::new(),
            AckMode::Batch => self.messages.iter().map(|m| m.message_id.as_str()).collect(),
        };
        BatchResponse {
            action_performed: failed.is_empty(),
            batch_item_failures: failed
                .into_iter()
                .map(|id| BatchItemFailure {
                    item_identifier: id.to_string(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResponse {
    pub action_performed: bool,
    #[serde(rename = "batchItemFailures")]
    pub batch_item_failures: Vec<BatchItemFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchItemFailure {
    #[serde(rename = "itemIdentifier")]
    pub item_identifier: String,
}

/// Drives dispatch and recording for each message of a batch.
#[derive(Debug, Clone)]
pub struct IntakeLoop {
    dispatcher: Dispatcher,
    recorder: ExecutionRecorder,
    config: IntakeConfig,
}

impl IntakeLoop {
    pub fn new(dispatcher: Dispatcher, recorder: ExecutionRecorder, config: IntakeConfig) -> Self {
        Self {
            dispatcher,
            recorder,
            config,
        }
    }

    pub fn config(&self) -> &IntakeConfig {
        &self.config
    }

    /// Process a batch sequentially. A failing message never stops the
    /// remaining ones; every failure ends up in the report.
    pub async fn process_batch(&self, batch: &[TransportMessage]) -> BatchReport {
        let mut report = BatchReport::default();
        for message in batch {
            let outcome = self.process_message(message).await;
            if let MessageOutcome::Failed(err) = &outcome {
                tracing::error!(message_id = %message.message_id, error = %err, "Message failed");
            }
            report.messages.push(MessageReport {
                message_id: message.message_id.clone(),
                outcome,
            });
        }
        tracing::info!(
            messages = batch.len(),
            performed = report.performed_count(),
            unresolved = report.unresolved_count(),
            failed = report.failures().count(),
            "Batch processed"
        );
        report
    }

    async fn process_message(&self, transport: &TransportMessage) -> MessageOutcome {
        let message_id = transport.message_id.clone();

        let message = match ActionMessage::from_wire(&transport.body) {
            Ok(message) => message,
            Err(e) => {
                return MessageOutcome::Failed(IntakeError::Deserialization {
                    message_id,
                    reason: e.to_string(),
                })
            }
        };

        tracing::info!(
            message_id = %message_id,
            content_key = %message.content_key,
            action_label = %message.action_label,
            "Performing action"
        );

        let performed = match self.dispatcher.dispatch(&message).await {
            Ok(performed) => performed,
            Err(source) => {
                let audit = match self.config.on_handler_error {
                    HandlerErrorPolicy::Skip => FailureAudit::Skipped,
                    HandlerErrorPolicy::Record => {
                        match self.recorder.record_message(&message, Utc::now()) {
                            Ok(event) => FailureAudit::Recorded { event_id: event.id },
                            Err(e) => {
                                tracing::error!(
                                    message_id = %message_id,
                                    error = %e,
                                    "Failed to record action event after handler failure"
                                );
                                FailureAudit::WriteFailed(e)
                            }
                        }
                    }
                };
                return MessageOutcome::Failed(IntakeError::Handler {
                    message_id,
                    source,
                    audit,
                });
            }
        };

        // Recorded even when no performer exists: the directive was observed.
        match self.recorder.record_message(&message, Utc::now()) {
            Ok(event) if performed => MessageOutcome::Performed { event_id: event.id },
            Ok(event) => MessageOutcome::Unresolved { event_id: event.id },
            Err(source) => MessageOutcome::Failed(IntakeError::Storage { message_id, source }),
        }
    }
}
