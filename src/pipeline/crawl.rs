//! Crawl phase: copies every release of every package of a registry into the
//! graph store as package nodes
//!
//! The index of the next page is written to a checkpoint file after each
//! crawled page, so an interrupted crawl resumes where it stopped. A listing
//! page that fails is retried with backoff; the crawl ends with an error once
//! it has failed `max_listing_attempts` times in a row.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use futures::stream;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::config::{CrawlConfig, FETCH_STAGGER_DELAY_MS};
use crate::graph::{GraphStore, PackageNode, UpsertOutcome};
use crate::pipeline::error::PipelineError;
use crate::pipeline::error_log::ErrorLog;
use crate::pipeline::stats::Tally;
use crate::registry::{PackageRelease, Registry, RegistryError};

pub struct Crawler<S> {
    store: Arc<S>,
    registry: Arc<dyn Registry>,
    config: CrawlConfig,
    checkpoint: PathBuf,
    error_log: Arc<ErrorLog>,
}

impl<S: GraphStore> Crawler<S> {
    pub fn new(
        store: Arc<S>,
        registry: Arc<dyn Registry>,
        config: CrawlConfig,
        checkpoint: &Path,
        error_log: Arc<ErrorLog>,
    ) -> Self {
        Self {
            store,
            registry,
            config,
            checkpoint: checkpoint.to_path_buf(),
            error_log,
        }
    }

    /// Page to resume from: the checkpoint if readable, else the configured start
    pub fn resume_page(&self) -> usize {
        std::fs::read_to_string(&self.checkpoint)
            .ok()
            .and_then(|raw| raw.trim().parse().ok())
            .unwrap_or(self.config.start_page)
    }

    fn save_checkpoint(&self, next_page: usize) {
        let _ = std::fs::write(&self.checkpoint, next_page.to_string()).inspect_err(|e| {
            warn!(
                "Failed to write crawl checkpoint {:?}: {}",
                self.checkpoint, e
            )
        });
    }

    pub async fn run(&self) -> Result<Tally, PipelineError> {
        let ecosystem = self.registry.ecosystem();
        let mut page = self.resume_page();
        let mut totals = Tally::default();
        let mut attempts = 0;
        info!("Crawling {} registry from page {}", ecosystem, page);

        loop {
            if self.config.end_page.is_some_and(|end| page >= end) {
                info!("Reached end page {}", page);
                break;
            }

            let ids = match self.registry.list_package_ids(page).await {
                Ok(Some(ids)) => ids,
                Ok(None) => {
                    info!("Package listing exhausted at page {}", page);
                    break;
                }
                Err(e) => {
                    attempts += 1;
                    let max_attempts = self.config.max_listing_attempts.max(1);
                    error!(
                        "Failed to list page {} (attempt {}/{}): {}",
                        page, attempts, max_attempts, e
                    );
                    self.error_log.record(&format!("page {}", page), &e);
                    totals.failures += 1;

                    if attempts >= max_attempts {
                        return Err(PipelineError::ListingFailed {
                            page,
                            attempts,
                            source: e,
                        });
                    }

                    sleep(self.retry_delay(attempts, &e)).await;
                    continue;
                }
            };
            attempts = 0;

            let tally = self.crawl_page(ids).await;
            debug!("Page {}: {}", page, tally);
            totals.absorb(&tally);

            page += 1;
            self.save_checkpoint(page);
            info!("Crawled {} pages: {}", page, totals);
        }

        info!("Crawl finished: {}", totals);
        Ok(totals)
    }

    /// Backoff before the next try of a failed page: the configured delay doubled
    /// per earlier attempt, or longer if the registry asked for it
    fn retry_delay(&self, attempts: u32, error: &RegistryError) -> Duration {
        let factor = 1u64 << (attempts.saturating_sub(1)).min(6);
        let backoff =
            Duration::from_millis(self.config.listing_retry_delay_ms.saturating_mul(factor));

        match error {
            RegistryError::RateLimited {
                retry_after_secs: Some(secs),
            } => backoff.max(Duration::from_secs(*secs)),
            _ => backoff,
        }
    }

    /// Fetch the packages of one page concurrently and store every release
    async fn crawl_page(&self, ids: Vec<String>) -> Tally {
        let workers = self.config.workers.max(1);
        let registry = self.registry.as_ref();

        let fetches = stream::iter(ids.into_iter().enumerate())
            .map(|(i, id)| async move {
                let delay = Duration::from_millis(FETCH_STAGGER_DELAY_MS * (i % workers) as u64);
                sleep(delay).await;
                let releases = registry.fetch_package_versions(&id).await;
                (id, releases)
            })
            .buffer_unordered(workers);
        futures::pin_mut!(fetches);

        let mut tally = Tally::default();
        while let Some((id, result)) = fetches.next().await {
            tally.processed += 1;
            match result {
                Ok(releases) => self.store_releases(&id, releases, &mut tally),
                Err(RegistryError::NotFound(_)) => {
                    info!("Package not found: {}. Skipping.", id);
                    tally.failures += 1;
                }
                Err(e) => {
                    error!("Failed to fetch versions for {}: {}", id, e);
                    self.error_log.record(&id, &e);
                    tally.failures += 1;
                }
            }
        }
        tally
    }

    fn store_releases(&self, library: &str, releases: Vec<PackageRelease>, tally: &mut Tally) {
        let ecosystem = self.registry.ecosystem();

        for release in releases {
            let stored = serde_json::to_string(&release.dependencies)
                .map_err(PipelineError::from)
                .and_then(|dependencies| {
                    let package = PackageNode {
                        ecosystem,
                        library: library.to_string(),
                        version: release.version.clone(),
                        published_at: release.published_at,
                        dependencies,
                    };
                    Ok(self.store.upsert_package(&package)?)
                });

            match stored {
                Ok(UpsertOutcome::Created) => tally.created += 1,
                Ok(UpsertOutcome::Existing) => tally.reused += 1,
                Err(e) => {
                    let coordinate = format!("{}:{}", library, release.version);
                    error!("Failed to store {}: {}", coordinate, e);
                    self.error_log.record(&coordinate, &e);
                    tally.failures += 1;
                }
            }
        }
    }
}
