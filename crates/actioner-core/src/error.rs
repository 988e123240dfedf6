use thiserror::Error;

/// Top-level error type for the actioner system.
///
/// Subsystem crates define their own error types and wrap this one so that
/// the `?` operator works across crate boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ActionerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<toml::de::Error> for ActionerError {
    fn from(err: toml::de::Error) -> Self {
        ActionerError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for ActionerError {
    fn from(err: toml::ser::Error) -> Self {
        ActionerError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for ActionerError {
    fn from(err: serde_json::Error) -> Self {
        ActionerError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for actioner operations.
pub type Result<T> = std::result::Result<T, ActionerError>;
