//! Registry test utilities

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use indexmap::IndexMap;

use dependency_miner::ecosystem::Ecosystem;
use dependency_miner::registry::{
    DeclaredDependencies, NugetDependency, PackageRelease, Registry, RegistryError,
};

/// In-memory registry serving fixed listing pages and releases
pub struct StubRegistry {
    ecosystem: Ecosystem,
    pages: Vec<Vec<String>>,
    releases: HashMap<String, Vec<PackageRelease>>,
}

impl StubRegistry {
    pub fn new(ecosystem: Ecosystem) -> Self {
        Self {
            ecosystem,
            pages: Vec::new(),
            releases: HashMap::new(),
        }
    }

    /// Append a listing page. Ids without releases answer `NotFound`.
    pub fn with_page(mut self, ids: &[&str]) -> Self {
        self.pages.push(ids.iter().map(|id| id.to_string()).collect());
        self
    }

    /// Add a release published on the given day of January 2024
    pub fn with_release(
        mut self,
        package: &str,
        version: &str,
        day: u32,
        dependencies: &[(&str, &str)],
    ) -> Self {
        let declared = match self.ecosystem {
            Ecosystem::Nuget => DeclaredDependencies::Records(
                dependencies
                    .iter()
                    .map(|(id, range)| NugetDependency {
                        package_id: id.to_string(),
                        version_range: range.to_string(),
                        dependency_group_id: "net8.0".to_string(),
                    })
                    .collect(),
            ),
            _ => DeclaredDependencies::Mapping(
                dependencies
                    .iter()
                    .map(|(id, range)| (id.to_string(), range.to_string()))
                    .collect::<IndexMap<_, _>>(),
            ),
        };

        self.releases
            .entry(package.to_string())
            .or_default()
            .push(PackageRelease {
                version: version.to_string(),
                published_at: Some(Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap()),
                dependencies: declared,
            });
        self
    }
}

#[async_trait]
impl Registry for StubRegistry {
    fn ecosystem(&self) -> Ecosystem {
        self.ecosystem
    }

    async fn list_package_ids(&self, page: usize) -> Result<Option<Vec<String>>, RegistryError> {
        Ok(self.pages.get(page).cloned())
    }

    async fn fetch_package_versions(
        &self,
        package_id: &str,
    ) -> Result<Vec<PackageRelease>, RegistryError> {
        match self.releases.get(package_id) {
            Some(releases) => Ok(releases.clone()),
            None => Err(RegistryError::NotFound(package_id.to_string())),
        }
    }
}
