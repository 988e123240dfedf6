use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{ActionerError, Result};

/// Top-level configuration for the actioner.
///
/// Loaded once per process from `~/.actioner/config.toml` by default. The
/// `actions` list defines which handler each action label resolves to.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionerConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub intake: IntakeConfig,
    #[serde(default)]
    pub actions: Vec<ActionDefinition>,
}

impl ActionerConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ActionerConfig = toml::from_str(&content)?;
        info!(
            actions = config.actions.len(),
            "Configuration loaded from {}",
            path.display()
        );
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults only if
    /// the file does not exist. A file that exists but cannot be read or
    /// parsed is an error.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Err(ActionerError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("No config at {}. Using defaults.", path.display());
                Ok(Self::default())
            }
            other => other,
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| ActionerError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// General process settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Audit store location.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database holding the action event table.
    pub db_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: "~/.actioner/actions.db".to_string(),
        }
    }
}

/// Batch acknowledgement and failure policies for the intake loop.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IntakeConfig {
    pub ack_mode: AckMode,
    pub on_handler_error: HandlerErrorPolicy,
}

/// How failed messages are reported back to the transport.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AckMode {
    /// Report each failed message so only those are redelivered.
    #[default]
    Partial,
    /// Any failure fails the whole batch.
    Batch,
}

/// Whether an audit event is still written when the handler fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandlerErrorPolicy {
    #[default]
    Skip,
    Record,
}

/// The handler implementation behind an action label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Logs the match and does nothing else.
    Noop,
    /// Sends the match to an external HTTP endpoint.
    Webhook,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionKind::Noop => write!(f, "noop"),
            ActionKind::Webhook => write!(f, "webhook"),
        }
    }
}

/// HTTP method used by a webhook action.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WebhookMethod {
    #[default]
    Post,
    Put,
    Get,
    Delete,
}

impl fmt::Display for WebhookMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WebhookMethod::Post => write!(f, "POST"),
            WebhookMethod::Put => write!(f, "PUT"),
            WebhookMethod::Get => write!(f, "GET"),
            WebhookMethod::Delete => write!(f, "DELETE"),
        }
    }
}

/// One `[[actions]]` entry mapping a label to a handler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionDefinition {
    pub label: String,
    pub kind: ActionKind,
    /// Endpoint for webhook actions. Required when `kind = "webhook"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub method: WebhookMethod,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

fn default_timeout_secs() -> u64 {
    10
}

impl ActionDefinition {
    pub fn noop(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            kind: ActionKind::Noop,
            url: None,
            method: WebhookMethod::default(),
            timeout_secs: default_timeout_secs(),
            headers: BTreeMap::new(),
        }
    }

    pub fn webhook(
        label: impl Into<String>,
        url: impl Into<String>,
        method: WebhookMethod,
    ) -> Self {
        Self {
            label: label.into(),
            kind: ActionKind::Webhook,
            url: Some(url.into()),
            method,
            timeout_secs: default_timeout_secs(),
            headers: BTreeMap::new(),
        }
    }
}
