//! Dependency resolution phase
//!
//! Turns the raw dependency payload of every package into `DEPENDS_ON` edges
//! to shared constraint nodes, and links each newly created constraint to the
//! versions of its library that the range contains.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::config::ResolverConfig;
use crate::ecosystem::Ecosystem;
use crate::graph::{ConstraintNode, DependencyRecord, EdgeKind, GraphStore, UpsertOutcome};
use crate::pipeline::error::PipelineError;
use crate::pipeline::error_log::ErrorLog;
use crate::pipeline::pool::WorkerPool;
use crate::pipeline::stats::{PhaseStats, Tally};
use crate::registry::DeclaredDependencies;
use crate::version::{VersionConstraint, VersionNumber};

/// Payloads that declare no dependencies
const EMPTY_PAYLOADS: [&str; 4] = ["", "null", "[]", "{}"];

/// State shared by every batch of one run
struct BatchWorker<S> {
    store: Arc<S>,
    ecosystem: Ecosystem,
    relink_existing: bool,
    error_log: Arc<ErrorLog>,
    stats: Arc<PhaseStats>,
}

impl<S> Clone for BatchWorker<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            ecosystem: self.ecosystem,
            relink_existing: self.relink_existing,
            error_log: Arc::clone(&self.error_log),
            stats: Arc::clone(&self.stats),
        }
    }
}

impl<S: GraphStore> BatchWorker<S> {
    /// Resolve every package of the batch. Failures stay local to their package.
    fn resolve_batch(&self, batch: Vec<DependencyRecord>) -> Tally {
        let mut tally = Tally::default();

        for record in &batch {
            tally.processed += 1;
            if let Err(e) = self.resolve_package(record, &mut tally) {
                error!("Failed to resolve dependencies of {}: {}", record.coordinate, e);
                self.error_log.record(&record.coordinate, &e);
                tally.failures += 1;
            }
        }

        self.stats.merge(&tally);
        tally
    }

    fn resolve_package(
        &self,
        record: &DependencyRecord,
        tally: &mut Tally,
    ) -> Result<(), PipelineError> {
        let payload = record.dependencies.trim();
        if EMPTY_PAYLOADS.contains(&payload) {
            return Ok(());
        }

        let declared: DeclaredDependencies = serde_json::from_str(payload)?;
        for (library, range_spec) in declared.into_pairs() {
            self.resolve_dependency(record, &library, &range_spec, tally)?;
        }

        Ok(())
    }

    fn resolve_dependency(
        &self,
        record: &DependencyRecord,
        library: &str,
        range_spec: &str,
        tally: &mut Tally,
    ) -> Result<(), PipelineError> {
        let coordinate = format!("{}:{}", library, range_spec);

        if self.store.constraint_exists(&coordinate)? {
            self.store
                .create_edge(EdgeKind::DependsOn, &record.coordinate, &coordinate)?;
            tally.reused += 1;

            if self.relink_existing
                && let Ok(constraint) = VersionConstraint::parse(self.ecosystem, library, range_spec)
            {
                self.link_versions(&constraint, &coordinate)?;
            }
            return Ok(());
        }

        let constraint = match VersionConstraint::parse(self.ecosystem, library, range_spec) {
            Ok(constraint) => constraint,
            Err(e) => {
                debug!("Unparsable range {} in {}: {}", coordinate, record.coordinate, e);
                let sentinel = ConstraintNode::sentinel(self.ecosystem, library, range_spec);
                self.store.upsert_constraint(&sentinel)?;
                self.store
                    .create_edge(EdgeKind::DependsOn, &record.coordinate, &coordinate)?;
                tally.parse_errors += 1;
                return Ok(());
            }
        };

        let node = ConstraintNode::new(self.ecosystem, library, range_spec, constraint.is_floating());
        let outcome = self.store.upsert_constraint(&node)?;
        self.store
            .create_edge(EdgeKind::DependsOn, &record.coordinate, &coordinate)?;

        match outcome {
            // Another worker created it between the check and the upsert
            UpsertOutcome::Existing => tally.reused += 1,
            UpsertOutcome::Created => tally.created += 1,
        }

        // Edge creation is idempotent, so the losing side of a create race links
        // too and the node is complete whichever worker finishes first.
        let linked = self.link_versions(&constraint, &coordinate)?;
        debug!("Constraint {} references {} versions", coordinate, linked);

        Ok(())
    }

    /// Create `REFERENCES` edges to every known version the constraint contains
    fn link_versions(
        &self,
        constraint: &VersionConstraint,
        coordinate: &str,
    ) -> Result<usize, PipelineError> {
        let mut linked = 0;

        for entry in self.store.all_versions_of(constraint.library())? {
            if constraint.contains_version(&VersionNumber::concrete(&entry.version))
                && self
                    .store
                    .create_edge(EdgeKind::References, coordinate, &entry.coordinate)?
            {
                linked += 1;
            }
        }

        Ok(linked)
    }
}

/// Builds `DEPENDS_ON` and `REFERENCES` edges for every stored package
pub struct DependencyGraphResolver<S> {
    worker: BatchWorker<S>,
    config: ResolverConfig,
}

impl<S: GraphStore> DependencyGraphResolver<S> {
    pub fn new(
        store: Arc<S>,
        ecosystem: Ecosystem,
        config: ResolverConfig,
        error_log: Arc<ErrorLog>,
    ) -> Self {
        Self {
            worker: BatchWorker {
                store,
                ecosystem,
                relink_existing: config.relink_existing,
                error_log,
                stats: Arc::new(PhaseStats::default()),
            },
            config,
        }
    }

    /// Resolve every package in the store and return the run totals
    pub async fn run(&self) -> Result<Tally, PipelineError> {
        let workers = if self.config.parallel {
            self.config.workers
        } else {
            1
        };
        let batch_size = self.config.batch_size.max(1);
        let mut pool = WorkerPool::new(workers);

        info!(
            "Resolving dependencies of {} packages ({} workers, batches of {})",
            self.worker.store.package_count()?,
            workers,
            batch_size
        );

        let mut submitted = 0;
        if self.config.streaming {
            let mut after = None;
            loop {
                let batch = self.worker.store.dependency_page(after, batch_size)?;
                let Some(last) = batch.last() else {
                    break;
                };
                after = Some(last.row_id);

                self.submit(&mut pool, batch).await?;
                submitted += 1;
                self.report_progress(submitted);
            }
        } else {
            let records = self.index_all(batch_size)?;
            for chunk in records.chunks(batch_size) {
                self.submit(&mut pool, chunk.to_vec()).await?;
                submitted += 1;
                self.report_progress(submitted);
            }
        }

        for result in pool.join().await {
            if let Err(e) = result {
                error!("Resolver worker failed: {}", e);
            }
        }

        let totals = self.worker.stats.snapshot();
        info!("Dependency resolution finished: {}", totals);
        Ok(totals)
    }

    /// Load every package before scheduling any work
    fn index_all(&self, page_size: usize) -> Result<Vec<DependencyRecord>, PipelineError> {
        let mut records = Vec::new();
        let mut after = None;

        loop {
            let page = self.worker.store.dependency_page(after, page_size)?;
            let Some(last) = page.last() else {
                break;
            };
            after = Some(last.row_id);
            records.extend(page);
        }

        debug!("Indexed {} packages", records.len());
        Ok(records)
    }

    async fn submit(
        &self,
        pool: &mut WorkerPool<Tally>,
        batch: Vec<DependencyRecord>,
    ) -> Result<(), PipelineError> {
        let worker = self.worker.clone();
        pool.submit(move || worker.resolve_batch(batch)).await?;

        for finished in pool.drain_finished() {
            if let Err(e) = finished {
                warn!("Resolver batch aborted: {}", e);
            }
        }
        Ok(())
    }

    fn report_progress(&self, submitted: u64) {
        if self.config.progress_interval > 0 && submitted % self.config.progress_interval == 0 {
            info!(
                "Submitted {} batches: {}",
                submitted,
                self.worker.stats.snapshot()
            );
        }
    }
}
