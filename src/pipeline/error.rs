use thiserror::Error;

use crate::graph::StoreError;
use crate::registry::RegistryError;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Malformed dependency payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("Listing page {page} failed {attempts} times in a row: {source}")]
    ListingFailed {
        page: usize,
        attempts: u32,
        source: RegistryError,
    },

    #[error("Worker pool is closed")]
    PoolClosed,
}
