use thiserror::Error;

/// Top-level error type for the Velvet system.
///
/// Each variant wraps a subsystem-specific failure. Subsystem crates define
/// their own error types and implement `From<SubsystemError> for VelvetError`
/// so that the `?` operator works seamlessly across crate boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum VelvetError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Language model error: {0}")]
    LanguageModel(String),

    #[error("Distance error: {0}")]
    Distance(String),

    #[error("Chat error: {0}")]
    Chat(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for VelvetError {
    fn from(err: toml::de::Error) -> Self {
        VelvetError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for VelvetError {
    fn from(err: toml::ser::Error) -> Self {
        VelvetError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for VelvetError {
    fn from(err: serde_json::Error) -> Self {
        VelvetError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Velvet operations.
pub type Result<T> = std::result::Result<T, VelvetError>;
