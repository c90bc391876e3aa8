//! Mining phases over the graph store
//!
//! - [`crawl`]: registry -> package nodes
//! - [`dependencies`]: package payloads -> constraints, `DEPENDS_ON`, `REFERENCES`
//! - [`chain`]: `NEXT` edges between the releases of a library
//! - [`target`]: `CURRENT_TARGET` edge per constraint
//!
//! Each phase can be rerun; existing nodes and edges are left as they are.

pub mod chain;
pub mod crawl;
pub mod dependencies;
pub mod error;
pub mod error_log;
pub mod pool;
pub mod stats;
pub mod target;

pub use chain::VersionChainBuilder;
pub use crawl::Crawler;
pub use dependencies::DependencyGraphResolver;
pub use error::PipelineError;
pub use error_log::ErrorLog;
pub use pool::WorkerPool;
pub use stats::{PhaseStats, Tally};
pub use target::{LatestTargetResolver, choose_target};
