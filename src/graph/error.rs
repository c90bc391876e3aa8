use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Failed to acquire database lock")]
    LockPoisoned,

    #[error("Unknown edge kind in store: {0}")]
    UnknownEdgeKind(String),
}
