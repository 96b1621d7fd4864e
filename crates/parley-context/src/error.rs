use thiserror::Error;

/// Failures reading or writing conversation contexts.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// A SQLite operation failed.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A stored entry did not have the expected shape.
    #[error("corrupt context for {key}: {reason}")]
    Corrupt { key: String, reason: String },

    /// The store could not be reached (e.g. its lock was poisoned).
    #[error("context store unavailable: {0}")]
    Unavailable(String),

    /// A context must hold at least one turn.
    #[error("context {key} has no turns")]
    EmptyContext { key: String },
}

pub type Result<T> = std::result::Result<T, PersistenceError>;
