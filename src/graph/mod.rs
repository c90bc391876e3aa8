//! Dependency graph storage
//!
//! Packages and constraints are nodes keyed by their coordinate string.
//! Edges connect them by coordinate and are only created between nodes
//! that already exist.

pub mod error;
pub mod sqlite;
pub mod store;
pub mod types;

pub use error::StoreError;
pub use sqlite::SqliteGraphStore;
pub use store::GraphStore;
#[cfg(test)]
pub use store::MockGraphStore;
pub use types::{
    ConstraintNode, DependencyRecord, EdgeKind, PackageNode, ReachableVersion, UpsertOutcome,
    VersionEntry,
};
