//! Error types for the assistant engine.

use velvet_core::error::VelvetError;

/// Errors from the chat engine.
///
/// Internal stages degrade locally instead of erroring; only input
/// validation and total fallback-chain exhaustion reach the caller.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("assistant is disabled")]
    Disabled,
    #[error("message cannot be empty")]
    EmptyMessage,
    #[error("message exceeds maximum length of {0} characters")]
    MessageTooLong(usize),
    #[error("query failed on every tier: {0}")]
    QueryFailed(String),
    #[error("store error: {0}")]
    Store(String),
}

impl ChatError {
    /// A message safe to put on the wire.
    pub fn user_message(&self) -> String {
        match self {
            ChatError::Disabled => "The assistant is currently unavailable.".to_string(),
            ChatError::EmptyMessage => "Message is required.".to_string(),
            ChatError::MessageTooLong(max) => {
                format!("Message is too long (maximum {} characters).", max)
            }
            ChatError::QueryFailed(_) | ChatError::Store(_) => {
                "Something went wrong while looking that up. Please try again.".to_string()
            }
        }
    }
}

impl From<VelvetError> for ChatError {
    fn from(err: VelvetError) -> Self {
        ChatError::Store(err.to_string())
    }
}
