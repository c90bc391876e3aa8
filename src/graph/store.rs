//! Storage contract consumed by the resolution phases

#[cfg(test)]
use mockall::automock;

use crate::graph::error::StoreError;
use crate::graph::types::{
    ConstraintNode, DependencyRecord, EdgeKind, PackageNode, ReachableVersion, UpsertOutcome,
    VersionEntry,
};

/// Read and write access to the dependency graph of one ecosystem
#[cfg_attr(test, automock)]
pub trait GraphStore: Send + Sync + 'static {
    /// Insert a package node, leaving an existing one with the same coordinate untouched
    fn upsert_package(&self, package: &PackageNode) -> Result<UpsertOutcome, StoreError>;

    fn find_package(&self, coordinate: &str) -> Result<Option<PackageNode>, StoreError>;

    fn package_count(&self) -> Result<u64, StoreError>;

    /// Up to `limit` packages with a row id greater than `after`, in row id order
    fn dependency_page(
        &self,
        after: Option<i64>,
        limit: usize,
    ) -> Result<Vec<DependencyRecord>, StoreError>;

    fn constraint_exists(&self, coordinate: &str) -> Result<bool, StoreError>;

    fn find_constraint(&self, coordinate: &str) -> Result<Option<ConstraintNode>, StoreError>;

    /// Atomically create the constraint unless its coordinate is already taken
    fn upsert_constraint(&self, constraint: &ConstraintNode)
    -> Result<UpsertOutcome, StoreError>;

    /// Link two existing nodes. Returns false if an endpoint is missing or the
    /// edge (or a conflicting single-valued edge) already exists.
    fn create_edge(&self, kind: EdgeKind, source: &str, target: &str)
    -> Result<bool, StoreError>;

    fn edge_targets(&self, kind: EdgeKind, source: &str) -> Result<Vec<String>, StoreError>;

    fn all_versions_of(&self, library: &str) -> Result<Vec<VersionEntry>, StoreError>;

    /// Libraries none of whose versions has an outgoing `NEXT` edge
    fn libraries_without_next_edges(&self) -> Result<Vec<String>, StoreError>;

    /// Constraints with at least one `REFERENCES` edge but no `CURRENT_TARGET`
    fn constraints_missing_current_target(&self) -> Result<Vec<ConstraintNode>, StoreError>;

    /// Versions reachable from the constraint's referenced set within `max_hops` `NEXT` hops
    fn reachable_versions(
        &self,
        constraint: &str,
        max_hops: u32,
    ) -> Result<Vec<ReachableVersion>, StoreError>;
}
