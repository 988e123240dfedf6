//! Match and action message model.
//!
//! Immutable value types exchanged between the upstream evaluator, the
//! queue transport and the action engine, plus the audit record derived
//! from a processed action message.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ActionerError, Result};

/// Envelope version written by this build for new action rules.
pub const CURRENT_RULE_VERSION: u32 = 1;

// =============================================================================
// Value objects
// =============================================================================

/// One piece of evidence that content matched a known reference signal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BankedSignal {
    pub signal_id: String,
    pub bank_id: String,
    pub bank_name: String,
}

impl BankedSignal {
    pub fn new(
        signal_id: impl Into<String>,
        bank_id: impl Into<String>,
        bank_name: impl Into<String>,
    ) -> Self {
        Self {
            signal_id: signal_id.into(),
            bank_id: bank_id.into(),
            bank_name: bank_name.into(),
        }
    }
}

/// Identifier naming a class of response to a match.
///
/// Pure identity: compared by value and used as the registry key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionLabel(String);

impl ActionLabel {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ActionLabel {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ActionLabel {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// The policy rule that decided a label should fire.
///
/// Rules are opaque to the engine. Each one travels in a versioned envelope
/// so a structured representation can replace `body` later without
/// breaking messages already on the queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRule {
    pub version: u32,
    pub name: String,
    #[serde(default)]
    pub body: serde_json::Value,
}

impl ActionRule {
    /// Create a rule in the current envelope version.
    pub fn new(name: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            version: CURRENT_RULE_VERSION,
            name: name.into(),
            body,
        }
    }

    /// Serialize this rule on its own, independent of any message.
    pub fn to_blob(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Recover a rule from a blob produced by [`ActionRule::to_blob`].
    pub fn from_blob(blob: &str) -> Result<Self> {
        Ok(serde_json::from_str(blob)?)
    }
}

// =============================================================================
// Messages
// =============================================================================

/// Match evidence without any decision attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchMessage {
    pub content_key: String,
    pub matched_hash: String,
    pub matching_banked_signals: Vec<BankedSignal>,
}

impl MatchMessage {
    /// Build a match message. A match without signals is rejected.
    pub fn new(
        content_key: impl Into<String>,
        matched_hash: impl Into<String>,
        matching_banked_signals: Vec<BankedSignal>,
    ) -> Result<Self> {
        if matching_banked_signals.is_empty() {
            return Err(ActionerError::InvalidMessage(
                "matching_banked_signals must not be empty".to_string(),
            ));
        }
        Ok(Self {
            content_key: content_key.into(),
            matched_hash: matched_hash.into(),
            matching_banked_signals,
        })
    }
}

/// A match message plus the resolved label and the rules that produced it.
///
/// This is the unit placed on the transport and consumed by the dispatcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionMessage {
    pub content_key: String,
    pub matched_hash: String,
    pub matching_banked_signals: Vec<BankedSignal>,
    pub action_label: ActionLabel,
    #[serde(default)]
    pub action_rules: Vec<ActionRule>,
}

impl ActionMessage {
    pub fn from_match(
        match_message: MatchMessage,
        action_label: ActionLabel,
        action_rules: Vec<ActionRule>,
    ) -> Self {
        Self {
            content_key: match_message.content_key,
            matched_hash: match_message.matched_hash,
            matching_banked_signals: match_message.matching_banked_signals,
            action_label,
            action_rules,
        }
    }

    /// The match evidence handed to handlers. Label and rules are dropped.
    pub fn match_view(&self) -> MatchMessage {
        MatchMessage {
            content_key: self.content_key.clone(),
            matched_hash: self.matched_hash.clone(),
            matching_banked_signals: self.matching_banked_signals.clone(),
        }
    }

    /// Encode for the queue transport.
    pub fn to_wire(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode a transport message body.
    ///
    /// Fails on malformed JSON, missing fields, or an empty signal list.
    pub fn from_wire(body: &str) -> Result<Self> {
        let message: ActionMessage = serde_json::from_str(body)?;
        if message.matching_banked_signals.is_empty() {
            return Err(ActionerError::InvalidMessage(format!(
                "action message for {} has no matching banked signals",
                message.content_key
            )));
        }
        Ok(message)
    }
}

// =============================================================================
// Audit record
// =============================================================================

/// Durable proof that an action was attempted for a content item.
///
/// Write-once. `action_rules` holds one independently serialized blob per
/// rule so individual rules stay recoverable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionEvent {
    pub id: Uuid,
    pub content_id: String,
    pub performed_at: DateTime<Utc>,
    pub action_label: String,
    pub action_rules: Vec<String>,
}

impl ActionEvent {
    pub fn new(
        content_id: impl Into<String>,
        action_label: &ActionLabel,
        action_rules: &[ActionRule],
        performed_at: DateTime<Utc>,
    ) -> Result<Self> {
        let action_rules = action_rules
            .iter()
            .map(ActionRule::to_blob)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            id: Uuid::new_v4(),
            content_id: content_id.into(),
            performed_at,
            action_label: action_label.as_str().to_string(),
            action_rules,
        })
    }

    pub fn from_message(message: &ActionMessage, performed_at: DateTime<Utc>) -> Result<Self> {
        Self::new(
            message.content_key.clone(),
            &message.action_label,
            &message.action_rules,
            performed_at,
        )
    }

    /// Decode the stored rule blobs back into rules.
    pub fn decode_rules(&self) -> Result<Vec<ActionRule>> {
        self.action_rules
            .iter()
            .map(|blob| ActionRule::from_blob(blob))
            .collect()
    }
}
