use thiserror::Error;

/// Errors surfaced by the session pipeline plumbing
#[derive(Debug, Error)]
pub enum FlowError {
    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("generation queue is closed")]
    QueueClosed,
}

pub type Result<T> = std::result::Result<T, FlowError>;
