//! npm registry implementation
//!
//! Package ids come from the CouchDB replica's `_all_docs` listing, versions
//! from the registry's full package document.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::ecosystem::Ecosystem;
use crate::registry::error::RegistryError;
use crate::registry::types::{DeclaredDependencies, PackageRelease};
use crate::registry::{Registry, get_json, http_client};

/// Default base URL for npm registry
pub const DEFAULT_REGISTRY_URL: &str = "https://registry.npmjs.org";

/// Default base URL for the CouchDB replica serving `_all_docs`
pub const DEFAULT_REPLICATE_URL: &str = "https://replicate.npmjs.com";

#[derive(Debug, Deserialize)]
struct AllDocsResponse {
    rows: Vec<AllDocsRow>,
}

#[derive(Debug, Deserialize)]
struct AllDocsRow {
    id: String,
}

/// Full package document. Manifests and publish times stay untyped so one
/// odd version (`"dependencies": []`, `time.unpublished`) cannot fail the rest.
#[derive(Debug, Deserialize)]
struct NpmPackageResponse {
    #[serde(default)]
    versions: IndexMap<String, Value>,
    #[serde(default)]
    time: IndexMap<String, Value>,
}

pub struct NpmRegistry {
    client: reqwest::Client,
    registry_url: String,
    replicate_url: String,
    page_size: usize,
}

impl NpmRegistry {
    pub fn new(registry_url: &str, replicate_url: &str, page_size: usize) -> Self {
        Self {
            client: http_client(),
            registry_url: registry_url.trim_end_matches('/').to_string(),
            replicate_url: replicate_url.trim_end_matches('/').to_string(),
            page_size: page_size.max(1),
        }
    }

    /// Encode package name for URL (handles scoped packages)
    fn encode_package_name(package_name: &str) -> String {
        if package_name.starts_with('@') {
            // Scoped package: @scope/name -> @scope%2Fname
            package_name.replace('/', "%2F")
        } else {
            package_name.to_string()
        }
    }

    /// String-valued entries of a manifest's `dependencies` object; any other
    /// shape declares nothing
    fn read_dependencies(
        package_id: &str,
        version: &str,
        manifest: &Value,
    ) -> DeclaredDependencies {
        let Some(declared) = manifest.get("dependencies") else {
            return DeclaredDependencies::default();
        };

        let Some(entries) = declared.as_object() else {
            debug!(
                "Ignoring non-object dependencies of {}:{}: {}",
                package_id, version, declared
            );
            return DeclaredDependencies::default();
        };

        let mapping = entries
            .iter()
            .filter_map(|(library, range)| match range.as_str() {
                Some(range) => Some((library.clone(), range.to_string())),
                None => {
                    debug!(
                        "Ignoring dependency {} of {}:{} with range {}",
                        library, package_id, version, range
                    );
                    None
                }
            })
            .collect();

        DeclaredDependencies::Mapping(mapping)
    }

    fn parse_time(raw: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|at| at.with_timezone(&Utc))
    }
}

impl Default for NpmRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_REGISTRY_URL, DEFAULT_REPLICATE_URL, 100)
    }
}

#[async_trait::async_trait]
impl Registry for NpmRegistry {
    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Npm
    }

    async fn list_package_ids(&self, page: usize) -> Result<Option<Vec<String>>, RegistryError> {
        let url = format!(
            "{}/_all_docs?limit={}&skip={}",
            self.replicate_url,
            self.page_size,
            page * self.page_size
        );

        let listing: AllDocsResponse = get_json(&self.client, &url, "_all_docs").await?;

        if listing.rows.is_empty() {
            return Ok(None);
        }

        // Design documents live next to packages in the replica
        let ids = listing
            .rows
            .into_iter()
            .map(|row| row.id)
            .filter(|id| !id.starts_with("_design/"))
            .collect();

        Ok(Some(ids))
    }

    async fn fetch_package_versions(
        &self,
        package_id: &str,
    ) -> Result<Vec<PackageRelease>, RegistryError> {
        let url = format!(
            "{}/{}",
            self.registry_url,
            Self::encode_package_name(package_id)
        );

        let document: NpmPackageResponse = get_json(&self.client, &url, package_id).await?;
        debug!(
            "Fetched {} versions of {}",
            document.versions.len(),
            package_id
        );

        let releases = document
            .versions
            .into_iter()
            .map(|(version, manifest)| PackageRelease {
                published_at: document
                    .time
                    .get(&version)
                    .and_then(Value::as_str)
                    .and_then(Self::parse_time),
                dependencies: Self::read_dependencies(package_id, &version, &manifest),
                version,
            })
            .collect();

        Ok(releases)
    }
}
