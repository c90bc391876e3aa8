//! Node and edge types of the dependency graph

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::ecosystem::Ecosystem;
use crate::graph::error::StoreError;

/// One released version of a library
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageNode {
    pub ecosystem: Ecosystem,
    pub library: String,
    pub version: String,
    pub published_at: Option<DateTime<Utc>>,
    /// Declared dependencies as the registry delivered them, serialized to JSON
    pub dependencies: String,
}

impl PackageNode {
    /// Graph key of the release: `{library}:{version}`
    pub fn coordinate(&self) -> String {
        format!("{}:{}", self.library, self.version)
    }
}

/// A dependency range node, shared by every package declaring the same range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstraintNode {
    pub ecosystem: Ecosystem,
    pub coordinate: String,
    pub library: String,
    pub range_spec: String,
    pub floating: bool,
    /// Placeholder for a range that could not be parsed
    pub sentinel: bool,
}

impl ConstraintNode {
    pub fn new(ecosystem: Ecosystem, library: &str, range_spec: &str, floating: bool) -> Self {
        Self {
            ecosystem,
            coordinate: format!("{}:{}", library, range_spec),
            library: library.to_string(),
            range_spec: range_spec.to_string(),
            floating,
            sentinel: false,
        }
    }

    /// Floating, unresolved stand-in so later runs do not retry the parse
    pub fn sentinel(ecosystem: Ecosystem, library: &str, range_spec: &str) -> Self {
        Self {
            sentinel: true,
            ..Self::new(ecosystem, library, range_spec, true)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    /// Package -> Constraint
    DependsOn,
    /// Constraint -> Package, for every version the range contains
    References,
    /// Package -> Package, chronological succession within a library
    Next,
    /// Constraint -> Package, the version the range resolves to today
    CurrentTarget,
}

impl EdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeKind::DependsOn => "DEPENDS_ON",
            EdgeKind::References => "REFERENCES",
            EdgeKind::Next => "NEXT",
            EdgeKind::CurrentTarget => "CURRENT_TARGET",
        }
    }

    /// Node tables of the (source, target) endpoints
    pub(crate) fn endpoint_tables(&self) -> (&'static str, &'static str) {
        match self {
            EdgeKind::DependsOn => ("packages", "constraints"),
            EdgeKind::References => ("constraints", "packages"),
            EdgeKind::Next => ("packages", "packages"),
            EdgeKind::CurrentTarget => ("constraints", "packages"),
        }
    }
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EdgeKind {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DEPENDS_ON" => Ok(EdgeKind::DependsOn),
            "REFERENCES" => Ok(EdgeKind::References),
            "NEXT" => Ok(EdgeKind::Next),
            "CURRENT_TARGET" => Ok(EdgeKind::CurrentTarget),
            _ => Err(StoreError::UnknownEdgeKind(s.to_string())),
        }
    }
}

/// Result of a get-or-create write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Existing,
}

/// A package row as seen by the dependency resolver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyRecord {
    /// Keyset cursor for [`crate::graph::GraphStore::dependency_page`]
    pub row_id: i64,
    pub coordinate: String,
    pub library: String,
    pub dependencies: String,
}

/// One release of a library, as listed for range matching and chaining
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionEntry {
    pub coordinate: String,
    pub version: String,
    pub published_at: Option<DateTime<Utc>>,
}

/// A version reachable from a constraint's referenced set over `NEXT` edges
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReachableVersion {
    pub coordinate: String,
    pub version: String,
    pub published_at: Option<DateTime<Utc>>,
    /// Fewest `NEXT` hops from any referenced version; 0 for referenced ones
    pub hops: u32,
    /// No outgoing `NEXT` edge
    pub is_tip: bool,
    /// Directly referenced by the constraint
    pub is_referenced: bool,
}

impl ReachableVersion {
    pub fn is_prerelease(&self) -> bool {
        self.version.contains(['-', '+'])
    }
}
