//! Run counters shared by all workers of a phase
//!
//! Workers count into a local [`Tally`] and merge it once per batch, so the
//! atomics see one update per batch instead of one per item.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Plain counters owned by one worker
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub processed: u64,
    pub created: u64,
    pub reused: u64,
    pub parse_errors: u64,
    pub failures: u64,
    pub unresolved: u64,
}

impl Tally {
    pub fn absorb(&mut self, other: &Tally) {
        self.processed += other.processed;
        self.created += other.created;
        self.reused += other.reused;
        self.parse_errors += other.parse_errors;
        self.failures += other.failures;
        self.unresolved += other.unresolved;
    }
}

impl fmt::Display for Tally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "processed={} created={} reused={} parse_errors={} failures={} unresolved={}",
            self.processed,
            self.created,
            self.reused,
            self.parse_errors,
            self.failures,
            self.unresolved
        )
    }
}

/// Process-wide counters of one phase
#[derive(Debug, Default)]
pub struct PhaseStats {
    processed: AtomicU64,
    created: AtomicU64,
    reused: AtomicU64,
    parse_errors: AtomicU64,
    failures: AtomicU64,
    unresolved: AtomicU64,
}

impl PhaseStats {
    pub fn merge(&self, tally: &Tally) {
        self.processed.fetch_add(tally.processed, Ordering::Relaxed);
        self.created.fetch_add(tally.created, Ordering::Relaxed);
        self.reused.fetch_add(tally.reused, Ordering::Relaxed);
        self.parse_errors
            .fetch_add(tally.parse_errors, Ordering::Relaxed);
        self.failures.fetch_add(tally.failures, Ordering::Relaxed);
        self.unresolved.fetch_add(tally.unresolved, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> Tally {
        Tally {
            processed: self.processed.load(Ordering::Relaxed),
            created: self.created.load(Ordering::Relaxed),
            reused: self.reused.load(Ordering::Relaxed),
            parse_errors: self.parse_errors.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            unresolved: self.unresolved.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn merge_adds_tally_to_counters() {
        let stats = PhaseStats::default();

        stats.merge(&Tally {
            processed: 3,
            reused: 1,
            ..Tally::default()
        });
        stats.merge(&Tally {
            processed: 2,
            parse_errors: 4,
            ..Tally::default()
        });

        assert_eq!(
            stats.snapshot(),
            Tally {
                processed: 5,
                reused: 1,
                parse_errors: 4,
                ..Tally::default()
            }
        );
    }

    #[test]
    fn concurrent_merges_lose_no_updates() {
        let stats = Arc::new(PhaseStats::default());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let stats = Arc::clone(&stats);
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        stats.merge(&Tally {
                            processed: 1,
                            failures: 1,
                            ..Tally::default()
                        });
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.processed, 8000);
        assert_eq!(snapshot.failures, 8000);
    }

    #[test]
    fn display_lists_every_counter() {
        let tally = Tally {
            processed: 1,
            created: 2,
            reused: 3,
            parse_errors: 4,
            failures: 5,
            unresolved: 6,
        };

        assert_eq!(
            tally.to_string(),
            "processed=1 created=2 reused=3 parse_errors=4 failures=5 unresolved=6"
        );
    }
}
