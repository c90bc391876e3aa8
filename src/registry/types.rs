use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One published version of a package with its declared dependencies
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRelease {
    pub version: String,
    pub published_at: Option<DateTime<Utc>>,
    pub dependencies: DeclaredDependencies,
}

/// A NuGet dependency entry, flattened out of its dependency group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NugetDependency {
    pub package_id: String,
    #[serde(default)]
    pub version_range: String,
    #[serde(default)]
    pub dependency_group_id: String,
}

/// Dependencies in the shape the registry declares them
///
/// Stored on the package node as JSON: an object for npm, an array for NuGet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DeclaredDependencies {
    /// npm style `library -> range` mapping, in declaration order
    Mapping(IndexMap<String, String>),
    /// NuGet style records
    Records(Vec<NugetDependency>),
}

impl Default for DeclaredDependencies {
    fn default() -> Self {
        Self::Mapping(IndexMap::new())
    }
}

impl DeclaredDependencies {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Mapping(mapping) => mapping.is_empty(),
            Self::Records(records) => records.is_empty(),
        }
    }

    /// Normalize to `(library, range)` pairs
    pub fn into_pairs(self) -> Vec<(String, String)> {
        match self {
            Self::Mapping(mapping) => mapping.into_iter().collect(),
            Self::Records(records) => records
                .into_iter()
                .map(|record| (record.package_id, record.version_range))
                .collect(),
        }
    }
}
