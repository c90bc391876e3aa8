use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::ecosystem::{Ecosystem, UnknownEcosystem};
use crate::registry::{npm, nuget};

// =============================================================================
// Resolution constants
// =============================================================================

/// Default number of concurrent workers per phase
pub const DEFAULT_WORKERS: usize = 8;

/// Default number of packages handed to one resolver worker
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Default `NEXT` hop bound when searching for a current target
pub const DEFAULT_MAX_DEPTH: u32 = 250;

// =============================================================================
// Crawl constants
// =============================================================================

/// Default number of concurrent package fetches while crawling
pub const DEFAULT_CRAWL_WORKERS: usize = 10;

/// Default number of package ids per npm listing page
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Delay between starting each fetch request to avoid rate limiting (10ms)
pub const FETCH_STAGGER_DELAY_MS: u64 = 10;

/// Default number of tries for one listing page before the crawl gives up
pub const DEFAULT_LISTING_ATTEMPTS: u32 = 5;

/// Default delay before retrying a failed listing page, doubled per retry
pub const DEFAULT_LISTING_RETRY_DELAY_MS: u64 = 1000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    UnknownEcosystem(#[from] UnknownEcosystem),

    #[error("Failed to read config file {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config file: {0}")]
    Json(#[from] serde_json::Error),
}

/// Miner configuration structure
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct MinerConfig {
    pub resolver: ResolverConfig,
    pub chain: ChainConfig,
    pub target: TargetConfig,
    pub crawl: CrawlConfig,
}

impl MinerConfig {
    /// Read a JSON config file. Missing fields keep their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(serde_json::from_str(&raw)?)
    }
}

/// Dependency resolution settings
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ResolverConfig {
    pub workers: usize,
    pub batch_size: usize,
    /// Log progress every this many batches
    pub progress_interval: u64,
    /// Process batches on the worker pool instead of one at a time
    pub parallel: bool,
    /// Page through packages instead of loading them all first
    pub streaming: bool,
    /// Also recreate `REFERENCES` edges of constraints that already exist
    pub relink_existing: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            batch_size: DEFAULT_BATCH_SIZE,
            progress_interval: 4,
            parallel: true,
            streaming: true,
            relink_existing: false,
        }
    }
}

/// Version chain settings
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ChainConfig {
    pub workers: usize,
    /// Log progress every this many libraries
    pub progress_interval: u64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            progress_interval: 1000,
        }
    }
}

/// Current target settings
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct TargetConfig {
    pub max_depth: u32,
    pub workers: usize,
    /// Log progress every this many constraints
    pub progress_interval: u64,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            workers: DEFAULT_WORKERS,
            progress_interval: 50,
        }
    }
}

/// Registry crawl settings
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct CrawlConfig {
    pub workers: usize,
    pub page_size: usize,
    pub start_page: usize,
    /// Stop before this page
    pub end_page: Option<usize>,
    /// Consecutive failures of one listing page that end the crawl
    pub max_listing_attempts: u32,
    pub listing_retry_delay_ms: u64,
    pub npm_registry_url: String,
    pub npm_replicate_url: String,
    pub nuget_service_index_url: String,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_CRAWL_WORKERS,
            page_size: DEFAULT_PAGE_SIZE,
            start_page: 0,
            end_page: None,
            max_listing_attempts: DEFAULT_LISTING_ATTEMPTS,
            listing_retry_delay_ms: DEFAULT_LISTING_RETRY_DELAY_MS,
            npm_registry_url: npm::DEFAULT_REGISTRY_URL.to_string(),
            npm_replicate_url: npm::DEFAULT_REPLICATE_URL.to_string(),
            nuget_service_index_url: nuget::DEFAULT_SERVICE_INDEX_URL.to_string(),
        }
    }
}

/// Returns the path to the data directory for dependency-miner.
/// Uses $XDG_DATA_HOME/dependency-miner if XDG_DATA_HOME is set,
/// otherwise falls back to ~/.local/share/dependency-miner,
/// or ./dependency-miner if neither is available.
pub fn data_dir() -> PathBuf {
    data_dir_with_env(std::env::var("XDG_DATA_HOME").ok(), dirs::home_dir())
}

/// Returns the path to the graph database of an ecosystem.
pub fn db_path(ecosystem: Ecosystem) -> PathBuf {
    data_dir().join(format!("{}-graph.db", ecosystem))
}

/// Returns the path to the log file.
pub fn log_path() -> PathBuf {
    data_dir().join("dependency-miner.log")
}

/// Returns the path to the per-item failure log.
pub fn error_log_path() -> PathBuf {
    data_dir().join("resolver_errors.txt")
}

/// Returns the path to the crawl checkpoint of an ecosystem.
pub fn checkpoint_path(ecosystem: Ecosystem) -> PathBuf {
    data_dir().join(format!("{}-progress.txt", ecosystem))
}

fn data_dir_with_env(xdg_data_home: Option<String>, home_dir: Option<PathBuf>) -> PathBuf {
    let data_dir = xdg_data_home
        .map(PathBuf::from)
        .or_else(|| home_dir.map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));

    data_dir.join("dependency-miner")
}
