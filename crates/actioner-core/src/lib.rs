pub mod config;
pub mod error;
pub mod message;

pub use config::{
    AckMode, ActionDefinition, ActionKind, ActionerConfig, HandlerErrorPolicy, WebhookMethod,
};
pub use error::{ActionerError, Result};
pub use message::{ActionEvent, ActionLabel, ActionMessage, ActionRule, BankedSignal, MatchMessage};
