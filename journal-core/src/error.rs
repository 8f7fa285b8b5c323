//! Error types for the journal

use thiserror::Error;

/// Journal-wide error type
#[derive(Error, Debug)]
pub enum JournalError {
    /// Missing credentials or unresolved account; requires an operator fix,
    /// never retried automatically.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Remote auth call failed; retried at the next scheduled refresh.
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Parse error: {0}")]
    Parse(String),

    /// A window sync failed before any row was written.
    #[error("Sync error: {0}")]
    Sync(String),

    /// A storage transaction failed for a non-duplicate reason; the whole
    /// batch was rolled back.
    #[error("Persist error: {0}")]
    Persist(String),
}

impl JournalError {
    pub fn config(msg: impl Into<String>) -> Self {
        JournalError::Config(msg.into())
    }

    pub fn auth(msg: impl Into<String>) -> Self {
        JournalError::Auth(msg.into())
    }

    pub fn network(msg: impl Into<String>) -> Self {
        JournalError::Network(msg.into())
    }

    pub fn api(msg: impl Into<String>) -> Self {
        JournalError::Api(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        JournalError::Parse(msg.into())
    }

    pub fn sync(msg: impl Into<String>) -> Self {
        JournalError::Sync(msg.into())
    }

    pub fn persist(msg: impl Into<String>) -> Self {
        JournalError::Persist(msg.into())
    }
}

/// Result type alias for journal operations
pub type JournalResult<T> = Result<T, JournalError>;
