//! Version chain phase: links the releases of each library with `NEXT` edges
//! in ascending version order

use std::sync::Arc;

use tracing::{debug, error, info};

use crate::config::ChainConfig;
use crate::graph::{EdgeKind, GraphStore, VersionEntry};
use crate::pipeline::error::PipelineError;
use crate::pipeline::error_log::ErrorLog;
use crate::pipeline::pool::WorkerPool;
use crate::pipeline::stats::{PhaseStats, Tally};
use crate::version::VersionNumber;

/// Libraries handed to one pool task
const LIBRARIES_PER_TASK: usize = 50;

/// Sort releases by their unpadded version number
fn sort_versions(entries: Vec<VersionEntry>) -> Vec<VersionEntry> {
    let mut keyed: Vec<(VersionNumber, VersionEntry)> = entries
        .into_iter()
        .map(|entry| (VersionNumber::unpadded(&entry.version), entry))
        .collect();
    keyed.sort_by(|(a, _), (b, _)| a.total_cmp(b));
    keyed.into_iter().map(|(_, entry)| entry).collect()
}

fn chain_library<S: GraphStore>(store: &S, library: &str) -> Result<u64, PipelineError> {
    let versions = sort_versions(store.all_versions_of(library)?);

    let mut created = 0;
    for pair in versions.windows(2) {
        if store.create_edge(EdgeKind::Next, &pair[0].coordinate, &pair[1].coordinate)? {
            created += 1;
        }
    }

    debug!("Chained {} versions of {}", versions.len(), library);
    Ok(created)
}

fn chain_libraries<S: GraphStore>(
    store: &S,
    libraries: &[String],
    error_log: &ErrorLog,
    stats: &PhaseStats,
) -> Tally {
    let mut tally = Tally::default();

    for library in libraries {
        tally.processed += 1;
        match chain_library(store, library) {
            Ok(created) => tally.created += created,
            Err(e) => {
                error!("Failed to chain versions of {}: {}", library, e);
                error_log.record(library, &e);
                tally.failures += 1;
            }
        }
    }

    stats.merge(&tally);
    tally
}

/// Builds `NEXT` chains for every library that has none yet
pub struct VersionChainBuilder<S> {
    store: Arc<S>,
    config: ChainConfig,
    error_log: Arc<ErrorLog>,
}

impl<S: GraphStore> VersionChainBuilder<S> {
    pub fn new(store: Arc<S>, config: ChainConfig, error_log: Arc<ErrorLog>) -> Self {
        Self {
            store,
            config,
            error_log,
        }
    }

    pub async fn run(&self) -> Result<Tally, PipelineError> {
        let libraries = self.store.libraries_without_next_edges()?;
        info!(
            "Chaining versions of {} libraries ({} workers)",
            libraries.len(),
            self.config.workers
        );

        let stats = Arc::new(PhaseStats::default());
        let mut pool = WorkerPool::new(self.config.workers);
        let mut reported = 0;

        for chunk in libraries.chunks(LIBRARIES_PER_TASK) {
            let store = Arc::clone(&self.store);
            let error_log = Arc::clone(&self.error_log);
            let task_stats = Arc::clone(&stats);
            let chunk = chunk.to_vec();
            pool.submit(move || chain_libraries(store.as_ref(), &chunk, &error_log, &task_stats))
                .await?;

            for finished in pool.drain_finished() {
                if let Err(e) = finished {
                    error!("Chain worker failed: {}", e);
                }
            }

            let processed = stats.snapshot().processed;
            if self.config.progress_interval > 0
                && processed / self.config.progress_interval > reported
            {
                reported = processed / self.config.progress_interval;
                info!("Chained {} libraries: {}", processed, stats.snapshot());
            }
        }

        for result in pool.join().await {
            if let Err(e) = result {
                error!("Chain worker failed: {}", e);
            }
        }

        let totals = stats.snapshot();
        info!("Version chaining finished: {}", totals);
        Ok(totals)
    }
}
