//! Current target phase: picks, for each constraint, the release it resolves
//! to today and records it with a `CURRENT_TARGET` edge

use std::sync::Arc;

use tracing::{debug, error, info};

use crate::config::TargetConfig;
use crate::graph::{ConstraintNode, EdgeKind, GraphStore, ReachableVersion};
use crate::pipeline::error::PipelineError;
use crate::pipeline::error_log::ErrorLog;
use crate::pipeline::pool::WorkerPool;
use crate::pipeline::stats::{PhaseStats, Tally};
use crate::version::VersionNumber;

/// Constraints handed to one pool task
const CONSTRAINTS_PER_TASK: usize = 100;

/// Latest published chain tip outside the referenced set
fn latest_tip(reachable: &[ReachableVersion], prereleases: bool) -> Option<&ReachableVersion> {
    reachable
        .iter()
        .filter(|v| v.is_tip && !v.is_referenced)
        .filter(|v| prereleases || !v.is_prerelease())
        .max_by(|a, b| {
            a.published_at.cmp(&b.published_at).then_with(|| {
                VersionNumber::unpadded(&a.version).total_cmp(&VersionNumber::unpadded(&b.version))
            })
        })
}

/// Lowest unreferenced version one `NEXT` hop past the referenced set
fn next_after_referenced(reachable: &[ReachableVersion]) -> Option<&ReachableVersion> {
    reachable
        .iter()
        .filter(|v| v.hops == 1 && !v.is_referenced)
        .min_by(|a, b| {
            VersionNumber::unpadded(&a.version).total_cmp(&VersionNumber::unpadded(&b.version))
        })
}

fn search(reachable: &[ReachableVersion], prereleases: bool) -> Option<&ReachableVersion> {
    latest_tip(reachable, prereleases).or_else(|| {
        if prereleases {
            next_after_referenced(reachable)
        } else {
            None
        }
    })
}

/// Pick the current target of a range among its reachable versions
///
/// Prereleases are only considered up front when the range itself names one;
/// otherwise they are a fallback once the stable search comes up empty.
/// Referenced tips are never chosen, so an exact pin on the newest release
/// has no target and is counted as unresolved.
pub fn choose_target<'a>(
    range_spec: &str,
    reachable: &'a [ReachableVersion],
) -> Option<&'a ReachableVersion> {
    let prereleases_implied = range_spec.contains(['-', '+']);

    search(reachable, prereleases_implied).or_else(|| {
        if prereleases_implied {
            None
        } else {
            search(reachable, true)
        }
    })
}

fn resolve_constraint<S: GraphStore>(
    store: &S,
    constraint: &ConstraintNode,
    max_depth: u32,
) -> Result<Option<String>, PipelineError> {
    let reachable = store.reachable_versions(&constraint.coordinate, max_depth)?;

    let Some(target) = choose_target(&constraint.range_spec, &reachable) else {
        return Ok(None);
    };

    if !store.create_edge(EdgeKind::CurrentTarget, &constraint.coordinate, &target.coordinate)? {
        debug!("{} already has a current target", constraint.coordinate);
    }
    Ok(Some(target.coordinate.clone()))
}

fn resolve_constraints<S: GraphStore>(
    store: &S,
    constraints: &[ConstraintNode],
    max_depth: u32,
    error_log: &ErrorLog,
    stats: &PhaseStats,
) -> Tally {
    let mut tally = Tally::default();

    for constraint in constraints {
        tally.processed += 1;
        match resolve_constraint(store, constraint, max_depth) {
            Ok(Some(target)) => {
                debug!("{} -> {}", constraint.coordinate, target);
                tally.created += 1;
            }
            Ok(None) => {
                info!("No target for {}", constraint.coordinate);
                tally.unresolved += 1;
            }
            Err(e) => {
                error!("Failed to resolve target of {}: {}", constraint.coordinate, e);
                error_log.record(&constraint.coordinate, &e);
                tally.failures += 1;
            }
        }
    }

    stats.merge(&tally);
    tally
}

/// Links every constraint without a current target to its newest reachable release
pub struct LatestTargetResolver<S> {
    store: Arc<S>,
    config: TargetConfig,
    error_log: Arc<ErrorLog>,
}

impl<S: GraphStore> LatestTargetResolver<S> {
    pub fn new(store: Arc<S>, config: TargetConfig, error_log: Arc<ErrorLog>) -> Self {
        Self {
            store,
            config,
            error_log,
        }
    }

    pub async fn run(&self) -> Result<Tally, PipelineError> {
        let constraints = self.store.constraints_missing_current_target()?;
        info!(
            "Resolving current targets of {} constraints (max depth {})",
            constraints.len(),
            self.config.max_depth
        );

        let stats = Arc::new(PhaseStats::default());
        let mut pool = WorkerPool::new(self.config.workers);
        let mut reported = 0;

        for chunk in constraints.chunks(CONSTRAINTS_PER_TASK) {
            let store = Arc::clone(&self.store);
            let error_log = Arc::clone(&self.error_log);
            let task_stats = Arc::clone(&stats);
            let max_depth = self.config.max_depth;
            let chunk = chunk.to_vec();
            pool.submit(move || {
                resolve_constraints(store.as_ref(), &chunk, max_depth, &error_log, &task_stats)
            })
            .await?;

            for finished in pool.drain_finished() {
                if let Err(e) = finished {
                    error!("Target worker failed: {}", e);
                }
            }

            let processed = stats.snapshot().processed;
            if self.config.progress_interval > 0
                && processed / self.config.progress_interval > reported
            {
                reported = processed / self.config.progress_interval;
                info!("Resolved {} constraints: {}", processed, stats.snapshot());
            }
        }

        for result in pool.join().await {
            if let Err(e) = result {
                error!("Target worker failed: {}", e);
            }
        }

        let totals = stats.snapshot();
        info!("Target resolution finished: {}", totals);
        Ok(totals)
    }
}
