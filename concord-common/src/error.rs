// src/error.rs
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConcordError {
    /// A lane was advanced for a key that has no registered queue.
    /// Completion bookkeeping is out of sync; never recoverable.
    #[error("Queue consistency violated: no queue registered for key {key}")]
    QueueConsistency { key: String },

    #[error("Queued task for key {key} aborted before producing a result")]
    TaskAborted { key: String },

    #[error("Task failed: {0}")]
    Task(String),

    /// The merge function rejected a vote. The topic is left untouched.
    #[error("Reduce failed for topic {topic}: {reason}")]
    Reduce { topic: String, reason: String },

    #[error("Invalid config: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ConcordError>;
