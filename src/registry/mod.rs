//! Package registry sources for the crawl phase

pub mod error;
pub mod npm;
pub mod nuget;
pub mod types;

#[cfg(test)]
use mockall::automock;

use serde::de::DeserializeOwned;
use tracing::warn;

use crate::ecosystem::Ecosystem;

pub use error::RegistryError;
pub use npm::NpmRegistry;
pub use nuget::NugetRegistry;
pub use types::{DeclaredDependencies, NugetDependency, PackageRelease};

/// A source of package ids and their released versions
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait Registry: Send + Sync {
    /// Returns the ecosystem this registry serves
    fn ecosystem(&self) -> Ecosystem;

    /// Package ids on the given page, or `None` once the listing is exhausted
    async fn list_package_ids(&self, page: usize) -> Result<Option<Vec<String>>, RegistryError>;

    /// Every published version of a package
    async fn fetch_package_versions(
        &self,
        package_id: &str,
    ) -> Result<Vec<PackageRelease>, RegistryError>;
}

pub(crate) fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent("dependency-miner")
        .build()
        .expect("Failed to create HTTP client")
}

/// GET `url` and decode the JSON body, mapping HTTP failures to [`RegistryError`]
pub(crate) async fn get_json<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
    subject: &str,
) -> Result<T, RegistryError> {
    let response = client.get(url).send().await?;
    let status = response.status();

    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(RegistryError::NotFound(subject.to_string()));
    }

    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok());
        return Err(RegistryError::RateLimited {
            retry_after_secs: retry_after,
        });
    }

    if !status.is_success() {
        warn!("Registry returned status {}: {}", status, url);
        return Err(RegistryError::InvalidResponse(format!(
            "Unexpected status: {}",
            status
        )));
    }

    response.json().await.map_err(|e| {
        warn!("Failed to parse registry response from {}: {}", url, e);
        RegistryError::InvalidResponse(e.to_string())
    })
}
