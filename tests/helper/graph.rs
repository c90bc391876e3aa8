//! Graph store test utilities

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use tempfile::TempDir;

use dependency_miner::ecosystem::Ecosystem;
use dependency_miner::graph::{
    ConstraintNode, EdgeKind, GraphStore, PackageNode, SqliteGraphStore,
};
use dependency_miner::pipeline::ErrorLog;

/// Throw-away graph database plus error log in one temp directory
pub struct TestGraph {
    pub dir: TempDir,
    pub store: Arc<SqliteGraphStore>,
    pub error_log: Arc<ErrorLog>,
}

/// Create an empty graph for the ecosystem
pub fn create_test_graph(ecosystem: Ecosystem) -> TestGraph {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(SqliteGraphStore::open(&dir.path().join("test.db"), ecosystem).unwrap());
    let error_log = Arc::new(ErrorLog::open(&dir.path().join("resolver_errors.txt")).unwrap());

    TestGraph {
        dir,
        store,
        error_log,
    }
}

impl TestGraph {
    /// Insert releases of a library, the n-th one published on day n + 1
    pub fn seed_library(&self, library: &str, versions: &[&str]) {
        for (day, version) in versions.iter().enumerate() {
            self.store
                .upsert_package(&PackageNode {
                    ecosystem: self.store.ecosystem(),
                    library: library.to_string(),
                    version: version.to_string(),
                    published_at: Some(
                        Utc.with_ymd_and_hms(2024, 1, day as u32 + 1, 0, 0, 0)
                            .unwrap(),
                    ),
                    dependencies: "{}".to_string(),
                })
                .unwrap();
        }
    }

    /// Insert a constraint that references the given versions of its library
    pub fn seed_constraint(&self, library: &str, range_spec: &str, referenced: &[&str]) {
        let constraint = ConstraintNode::new(self.store.ecosystem(), library, range_spec, true);
        self.store.upsert_constraint(&constraint).unwrap();

        for version in referenced {
            assert!(
                self.store
                    .create_edge(
                        EdgeKind::References,
                        &constraint.coordinate,
                        &format!("{}:{}", library, version),
                    )
                    .unwrap()
            );
        }
    }

    /// Targets of `kind` edges leaving `source`, sorted
    pub fn targets(&self, kind: EdgeKind, source: &str) -> Vec<String> {
        let mut targets = self.store.edge_targets(kind, source).unwrap();
        targets.sort();
        targets
    }

    pub fn logged_errors(&self) -> String {
        std::fs::read_to_string(self.error_log.path()).unwrap()
    }
}
