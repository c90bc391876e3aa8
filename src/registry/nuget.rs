//! NuGet V3 API implementation
//!
//! Package ids are read from the catalog, one catalog page per listing page
//! (pages ordered by commit timestamp). Versions come from the registration
//! index of each package.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::ecosystem::Ecosystem;
use crate::registry::error::RegistryError;
use crate::registry::types::{DeclaredDependencies, NugetDependency, PackageRelease};
use crate::registry::{Registry, get_json, http_client};

/// Default NuGet V3 service index
pub const DEFAULT_SERVICE_INDEX_URL: &str = "https://api.nuget.org/v3/index.json";

#[derive(Debug, Deserialize)]
struct ServiceIndex {
    resources: Vec<ServiceResource>,
}

#[derive(Debug, Deserialize)]
struct ServiceResource {
    #[serde(rename = "@id")]
    id: String,
    #[serde(rename = "@type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct CatalogIndex {
    items: Vec<CatalogPageRef>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CatalogPageRef {
    #[serde(rename = "@id")]
    url: String,
    commit_time_stamp: String,
}

#[derive(Debug, Deserialize)]
struct CatalogPage {
    #[serde(default)]
    items: Vec<CatalogLeafRef>,
}

#[derive(Debug, Deserialize)]
struct CatalogLeafRef {
    #[serde(rename = "nuget:id")]
    package_id: String,
}

#[derive(Debug, Deserialize)]
struct RegistrationIndex {
    #[serde(default)]
    items: Vec<RegistrationPage>,
}

#[derive(Debug, Deserialize)]
struct RegistrationPage {
    #[serde(rename = "@id")]
    url: String,
    /// Absent when the page has to be fetched separately
    items: Option<Vec<RegistrationLeaf>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegistrationLeaf {
    catalog_entry: CatalogEntry,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CatalogEntry {
    version: String,
    #[serde(default)]
    published: Option<String>,
    #[serde(default)]
    dependency_groups: Vec<DependencyGroup>,
}

#[derive(Debug, Deserialize)]
struct DependencyGroup {
    #[serde(rename = "@id", default)]
    id: String,
    #[serde(default)]
    dependencies: Vec<GroupDependency>,
}

#[derive(Debug, Deserialize)]
struct GroupDependency {
    id: String,
    #[serde(default)]
    range: Option<String>,
}

/// Resources resolved once from the service index
#[derive(Debug)]
struct Endpoints {
    catalog_pages: Vec<String>,
    registrations_base_url: String,
}

pub struct NugetRegistry {
    client: reqwest::Client,
    service_index_url: String,
    endpoints: OnceCell<Endpoints>,
}

impl NugetRegistry {
    pub fn new(service_index_url: &str) -> Self {
        Self {
            client: http_client(),
            service_index_url: service_index_url.to_string(),
            endpoints: OnceCell::new(),
        }
    }

    async fn endpoints(&self) -> Result<&Endpoints, RegistryError> {
        self.endpoints
            .get_or_try_init(|| self.load_endpoints())
            .await
    }

    async fn load_endpoints(&self) -> Result<Endpoints, RegistryError> {
        let index: ServiceIndex =
            get_json(&self.client, &self.service_index_url, "service index").await?;

        let resource = |kind: &str| {
            index
                .resources
                .iter()
                .find(|resource| resource.kind.starts_with(kind))
                .map(|resource| resource.id.clone())
                .ok_or_else(|| {
                    RegistryError::InvalidResponse(format!("No {} resource in service index", kind))
                })
        };

        let catalog_url = resource("Catalog/3.0.0")?;
        let registrations_base_url = resource("RegistrationsBaseUrl")?;

        info!("Downloading NuGet catalog index from {}", catalog_url);
        let catalog: CatalogIndex = get_json(&self.client, &catalog_url, "catalog").await?;

        let mut pages = catalog.items;
        pages.sort_by(|a, b| a.commit_time_stamp.cmp(&b.commit_time_stamp));
        info!("NuGet catalog has {} pages", pages.len());

        Ok(Endpoints {
            catalog_pages: pages.into_iter().map(|page| page.url).collect(),
            registrations_base_url: format!("{}/", registrations_base_url.trim_end_matches('/')),
        })
    }

    fn parse_time(raw: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|at| at.with_timezone(&Utc))
    }

    fn into_release(entry: CatalogEntry, package_id: &str) -> PackageRelease {
        let records = entry
            .dependency_groups
            .into_iter()
            .flat_map(|group| {
                let group_id = group.id;
                group
                    .dependencies
                    .into_iter()
                    .map(move |dependency| NugetDependency {
                        package_id: dependency.id,
                        version_range: dependency.range.unwrap_or_default(),
                        dependency_group_id: group_id.clone(),
                    })
            })
            .collect();

        debug!("Read {}:{}", package_id, entry.version);

        PackageRelease {
            published_at: entry.published.as_deref().and_then(Self::parse_time),
            version: entry.version,
            dependencies: DeclaredDependencies::Records(records),
        }
    }
}

impl Default for NugetRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_SERVICE_INDEX_URL)
    }
}

#[async_trait::async_trait]
impl Registry for NugetRegistry {
    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Nuget
    }

    async fn list_package_ids(&self, page: usize) -> Result<Option<Vec<String>>, RegistryError> {
        let endpoints = self.endpoints().await?;

        let Some(page_url) = endpoints.catalog_pages.get(page) else {
            return Ok(None);
        };

        debug!("Fetching catalog page {}: {}", page, page_url);
        let catalog_page: CatalogPage = get_json(&self.client, page_url, page_url).await?;

        // A page lists every commit, so one package shows up once per version
        let mut seen = HashSet::new();
        let ids = catalog_page
            .items
            .into_iter()
            .map(|leaf| leaf.package_id)
            .filter(|id| seen.insert(id.to_lowercase()))
            .collect();

        Ok(Some(ids))
    }

    async fn fetch_package_versions(
        &self,
        package_id: &str,
    ) -> Result<Vec<PackageRelease>, RegistryError> {
        let endpoints = self.endpoints().await?;
        let url = format!(
            "{}{}/index.json",
            endpoints.registrations_base_url,
            package_id.to_lowercase()
        );

        let index: RegistrationIndex = get_json(&self.client, &url, package_id).await?;

        let mut releases = Vec::new();
        for page in index.items {
            let leaves = match page.items {
                Some(leaves) => leaves,
                None => {
                    let full: RegistrationIndexPage =
                        get_json(&self.client, &page.url, package_id).await?;
                    full.items
                }
            };

            releases.extend(
                leaves
                    .into_iter()
                    .map(|leaf| Self::into_release(leaf.catalog_entry, package_id)),
            );
        }

        Ok(releases)
    }
}

#[derive(Debug, Deserialize)]
struct RegistrationIndexPage {
    #[serde(default)]
    items: Vec<RegistrationLeaf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Server, ServerGuard};

    async fn mock_service_index(server: &mut ServerGuard) {
        let base = server.url();
        server
            .mock("GET", "/v3/index.json")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(format!(
                r#"{{"version": "3.0.0", "resources": [
                    {{"@id": "{base}/v3/registration5-semver1/", "@type": "RegistrationsBaseUrl"}},
                    {{"@id": "{base}/v3/catalog0/index.json", "@type": "Catalog/3.0.0"}}
                ]}}"#
            ))
            .create_async()
            .await;

        server
            .mock("GET", "/v3/catalog0/index.json")
            .with_status(200)
            .with_body(format!(
                r#"{{"count": 2, "items": [
                    {{"@id": "{base}/v3/catalog0/page1.json", "commitTimeStamp": "2015-03-01T00:00:00Z", "count": 2}},
                    {{"@id": "{base}/v3/catalog0/page0.json", "commitTimeStamp": "2015-02-01T00:00:00Z", "count": 1}}
                ]}}"#
            ))
            .create_async()
            .await;
    }

    #[tokio::test]
    async fn list_package_ids_walks_catalog_pages_by_commit_time() {
        let mut server = Server::new_async().await;
        mock_service_index(&mut server).await;

        server
            .mock("GET", "/v3/catalog0/page0.json")
            .with_status(200)
            .with_body(r#"{"items": [{"@id": "x", "nuget:id": "Serilog", "nuget:version": "1.0.0"}]}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/v3/catalog0/page1.json")
            .with_status(200)
            .with_body(
                r#"{"items": [
                    {"@id": "a", "nuget:id": "Polly", "nuget:version": "1.0.0"},
                    {"@id": "b", "nuget:id": "polly", "nuget:version": "1.1.0"},
                    {"@id": "c", "nuget:id": "Dapper", "nuget:version": "2.0.0"}
                ]}"#,
            )
            .create_async()
            .await;

        let registry = NugetRegistry::new(&format!("{}/v3/index.json", server.url()));

        assert_eq!(
            registry.list_package_ids(0).await.unwrap(),
            Some(vec!["Serilog".to_string()])
        );
        assert_eq!(
            registry.list_package_ids(1).await.unwrap(),
            Some(vec!["Polly".to_string(), "Dapper".to_string()])
        );
        assert_eq!(registry.list_package_ids(2).await.unwrap(), None);
    }

    #[tokio::test]
    async fn fetch_package_versions_flattens_dependency_groups() {
        let mut server = Server::new_async().await;
        mock_service_index(&mut server).await;

        let mock = server
            .mock("GET", "/v3/registration5-semver1/serilog.sinks.file/index.json")
            .with_status(200)
            .with_body(
                r#"{"count": 1, "items": [{
                    "@id": "page",
                    "count": 1,
                    "items": [{
                        "catalogEntry": {
                            "id": "Serilog.Sinks.File",
                            "version": "5.0.0",
                            "published": "2021-06-08T03:18:45.57+00:00",
                            "dependencyGroups": [
                                {
                                    "@id": "group-net45",
                                    "targetFramework": ".NETFramework4.5",
                                    "dependencies": [{"id": "Serilog", "range": "[2.10.0, )"}]
                                },
                                {
                                    "@id": "group-netstandard",
                                    "dependencies": [{"id": "System.IO"}]
                                },
                                {"@id": "group-empty"}
                            ]
                        }
                    }]
                }]}"#,
            )
            .create_async()
            .await;

        let registry = NugetRegistry::new(&format!("{}/v3/index.json", server.url()));
        let releases = registry
            .fetch_package_versions("Serilog.Sinks.File")
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(releases.len(), 1);
        assert_eq!(releases[0].version, "5.0.0");
        assert!(releases[0].published_at.is_some());
        assert_eq!(
            releases[0].dependencies,
            DeclaredDependencies::Records(vec![
                NugetDependency {
                    package_id: "Serilog".to_string(),
                    version_range: "[2.10.0, )".to_string(),
                    dependency_group_id: "group-net45".to_string(),
                },
                NugetDependency {
                    package_id: "System.IO".to_string(),
                    version_range: String::new(),
                    dependency_group_id: "group-netstandard".to_string(),
                },
            ])
        );
    }

    #[tokio::test]
    async fn fetch_package_versions_follows_out_of_line_pages() {
        let mut server = Server::new_async().await;
        mock_service_index(&mut server).await;
        let base = server.url();

        server
            .mock("GET", "/v3/registration5-semver1/big/index.json")
            .with_status(200)
            .with_body(format!(
                r#"{{"count": 1, "items": [{{"@id": "{base}/v3/registration5-semver1/big/page/1.0.0/2.0.0.json", "count": 2}}]}}"#
            ))
            .create_async()
            .await;
        let page = server
            .mock("GET", "/v3/registration5-semver1/big/page/1.0.0/2.0.0.json")
            .with_status(200)
            .with_body(
                r#"{"items": [
                    {"catalogEntry": {"version": "1.0.0"}},
                    {"catalogEntry": {"version": "2.0.0"}}
                ]}"#,
            )
            .create_async()
            .await;

        let registry = NugetRegistry::new(&format!("{}/v3/index.json", server.url()));
        let releases = registry.fetch_package_versions("Big").await.unwrap();

        page.assert_async().await;
        let versions: Vec<&str> = releases.iter().map(|r| r.version.as_str()).collect();
        assert_eq!(versions, vec!["1.0.0", "2.0.0"]);
        assert!(releases.iter().all(|r| r.dependencies.is_empty()));
    }

    #[tokio::test]
    async fn fetch_package_versions_returns_not_found_for_unknown_package() {
        let mut server = Server::new_async().await;
        mock_service_index(&mut server).await;

        server
            .mock("GET", "/v3/registration5-semver1/missing/index.json")
            .with_status(404)
            .create_async()
            .await;

        let registry = NugetRegistry::new(&format!("{}/v3/index.json", server.url()));
        let result = registry.fetch_package_versions("Missing").await;

        assert!(matches!(result, Err(RegistryError::NotFound(id)) if id == "Missing"));
    }
}
