use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row};
use tracing::{debug, info};

use crate::ecosystem::Ecosystem;
use crate::graph::error::StoreError;
use crate::graph::store::GraphStore;
use crate::graph::types::{
    ConstraintNode, DependencyRecord, EdgeKind, PackageNode, ReachableVersion, UpsertOutcome,
    VersionEntry,
};

/// Schema migrations
/// Each version contains a list of SQL statements to execute
const MIGRATIONS: &[&[&str]] = &[
    // v1: sentinel flag for constraints whose range could not be parsed
    &["ALTER TABLE constraints ADD COLUMN sentinel INTEGER NOT NULL DEFAULT 0"],
];

/// SQLite-backed dependency graph for one ecosystem
pub struct SqliteGraphStore {
    conn: Mutex<Connection>,
    ecosystem: Ecosystem,
}

impl SqliteGraphStore {
    pub fn open(db_path: &Path, ecosystem: Ecosystem) -> Result<Self, StoreError> {
        info!("Opening {} graph database at {:?}", ecosystem, db_path);

        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.busy_timeout(std::time::Duration::from_secs(30))?;

        let store = Self {
            conn: Mutex::new(conn),
            ecosystem,
        };

        store.create_schema()?;
        debug!("Graph database ready");

        Ok(store)
    }

    pub fn ecosystem(&self) -> Ecosystem {
        self.ecosystem
    }

    fn lock_conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    fn create_schema(&self) -> Result<(), StoreError> {
        let conn = self.lock_conn()?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS packages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                ecosystem TEXT NOT NULL,
                coordinate TEXT NOT NULL UNIQUE,
                library TEXT NOT NULL,
                version TEXT NOT NULL,
                published_at INTEGER,
                dependencies TEXT NOT NULL DEFAULT ''
            );
            CREATE INDEX IF NOT EXISTS idx_packages_library ON packages(library);

            CREATE TABLE IF NOT EXISTS constraints (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                ecosystem TEXT NOT NULL,
                coordinate TEXT NOT NULL UNIQUE,
                library TEXT NOT NULL,
                range_spec TEXT NOT NULL,
                floating INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_constraints_library ON constraints(library);

            CREATE TABLE IF NOT EXISTS edges (
                kind TEXT NOT NULL,
                source TEXT NOT NULL,
                target TEXT NOT NULL,
                UNIQUE(kind, source, target)
            );
            CREATE INDEX IF NOT EXISTS idx_edges_target ON edges(kind, target);
            CREATE UNIQUE INDEX IF NOT EXISTS idx_edges_single_target
                ON edges(source) WHERE kind = 'CURRENT_TARGET';
            CREATE UNIQUE INDEX IF NOT EXISTS idx_edges_single_next
                ON edges(source) WHERE kind = 'NEXT';
            "#,
        )?;

        Self::apply_migrations(&conn)?;

        Ok(())
    }

    /// Apply pending migrations based on user_version pragma
    fn apply_migrations(conn: &Connection) -> Result<(), StoreError> {
        let current_version: i32 =
            conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

        for (i, statements) in MIGRATIONS.iter().enumerate() {
            let version = (i + 1) as i32;
            if version > current_version {
                for sql in *statements {
                    match conn.execute(sql, []) {
                        Ok(_) => {}
                        Err(rusqlite::Error::SqliteFailure(_, Some(ref msg)))
                            if msg.contains("duplicate column name") =>
                        {
                            debug!("Column already exists, skipping: {}", sql);
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
                debug!("Applied migration v{}", version);
            }
        }

        let target_version = MIGRATIONS.len() as i32;
        if target_version > current_version {
            conn.pragma_update(None, "user_version", target_version)?;
        }

        Ok(())
    }

    fn to_timestamp(published_at: Option<DateTime<Utc>>) -> Option<i64> {
        published_at.map(|at| at.timestamp_millis())
    }

    fn from_timestamp(millis: Option<i64>) -> Option<DateTime<Utc>> {
        millis.and_then(DateTime::from_timestamp_millis)
    }

    fn read_ecosystem(row: &Row<'_>, index: usize) -> rusqlite::Result<Ecosystem> {
        let label: String = row.get(index)?;
        Ok(label.parse().unwrap_or_default())
    }

    fn read_constraint(row: &Row<'_>) -> rusqlite::Result<ConstraintNode> {
        Ok(ConstraintNode {
            ecosystem: Self::read_ecosystem(row, 0)?,
            coordinate: row.get(1)?,
            library: row.get(2)?,
            range_spec: row.get(3)?,
            floating: row.get(4)?,
            sentinel: row.get(5)?,
        })
    }
}

impl GraphStore for SqliteGraphStore {
    fn upsert_package(&self, package: &PackageNode) -> Result<UpsertOutcome, StoreError> {
        let conn = self.lock_conn()?;

        let inserted = conn.execute(
            r#"
            INSERT OR IGNORE INTO packages
                (ecosystem, coordinate, library, version, published_at, dependencies)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            (
                package.ecosystem.as_str(),
                package.coordinate(),
                &package.library,
                &package.version,
                Self::to_timestamp(package.published_at),
                &package.dependencies,
            ),
        )?;

        Ok(if inserted > 0 {
            UpsertOutcome::Created
        } else {
            UpsertOutcome::Existing
        })
    }

    fn find_package(&self, coordinate: &str) -> Result<Option<PackageNode>, StoreError> {
        let conn = self.lock_conn()?;

        let package = conn
            .query_row(
                r#"
                SELECT ecosystem, library, version, published_at, dependencies
                FROM packages WHERE coordinate = ?1
                "#,
                [coordinate],
                |row| {
                    Ok(PackageNode {
                        ecosystem: Self::read_ecosystem(row, 0)?,
                        library: row.get(1)?,
                        version: row.get(2)?,
                        published_at: Self::from_timestamp(row.get(3)?),
                        dependencies: row.get(4)?,
                    })
                },
            )
            .optional()?;

        Ok(package)
    }

    fn package_count(&self) -> Result<u64, StoreError> {
        let conn = self.lock_conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM packages WHERE ecosystem = ?1",
            [self.ecosystem.as_str()],
            |row| row.get(0),
        )?;

        Ok(count.max(0) as u64)
    }

    fn dependency_page(
        &self,
        after: Option<i64>,
        limit: usize,
    ) -> Result<Vec<DependencyRecord>, StoreError> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, coordinate, library, dependencies FROM packages
            WHERE ecosystem = ?1 AND id > ?2
            ORDER BY id
            LIMIT ?3
            "#,
        )?;

        let records = stmt
            .query_map(
                (self.ecosystem.as_str(), after.unwrap_or(0), limit as i64),
                |row| {
                    Ok(DependencyRecord {
                        row_id: row.get(0)?,
                        coordinate: row.get(1)?,
                        library: row.get(2)?,
                        dependencies: row.get(3)?,
                    })
                },
            )?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }

    fn constraint_exists(&self, coordinate: &str) -> Result<bool, StoreError> {
        let conn = self.lock_conn()?;
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM constraints WHERE coordinate = ?1)",
            [coordinate],
            |row| row.get(0),
        )?;

        Ok(exists)
    }

    fn find_constraint(&self, coordinate: &str) -> Result<Option<ConstraintNode>, StoreError> {
        let conn = self.lock_conn()?;

        let constraint = conn
            .query_row(
                r#"
                SELECT ecosystem, coordinate, library, range_spec, floating, sentinel
                FROM constraints WHERE coordinate = ?1
                "#,
                [coordinate],
                Self::read_constraint,
            )
            .optional()?;

        Ok(constraint)
    }

    fn upsert_constraint(
        &self,
        constraint: &ConstraintNode,
    ) -> Result<UpsertOutcome, StoreError> {
        let conn = self.lock_conn()?;

        // The UNIQUE coordinate makes the check and the insert one step, so two
        // workers racing on the same range end up sharing a single node.
        let inserted = conn.execute(
            r#"
            INSERT OR IGNORE INTO constraints
                (ecosystem, coordinate, library, range_spec, floating, sentinel)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            (
                constraint.ecosystem.as_str(),
                &constraint.coordinate,
                &constraint.library,
                &constraint.range_spec,
                constraint.floating,
                constraint.sentinel,
            ),
        )?;

        Ok(if inserted > 0 {
            UpsertOutcome::Created
        } else {
            UpsertOutcome::Existing
        })
    }

    fn create_edge(&self, kind: EdgeKind, source: &str, target: &str) -> Result<bool, StoreError> {
        let (source_table, target_table) = kind.endpoint_tables();
        let conn = self.lock_conn()?;

        let query = format!(
            r#"
            INSERT OR IGNORE INTO edges (kind, source, target)
            SELECT ?1, ?2, ?3
            WHERE EXISTS (SELECT 1 FROM {} WHERE coordinate = ?2)
              AND EXISTS (SELECT 1 FROM {} WHERE coordinate = ?3)
            "#,
            source_table, target_table
        );

        let inserted = conn.execute(&query, (kind.as_str(), source, target))?;

        Ok(inserted > 0)
    }

    fn edge_targets(&self, kind: EdgeKind, source: &str) -> Result<Vec<String>, StoreError> {
        let conn = self.lock_conn()?;
        let mut stmt =
            conn.prepare("SELECT target FROM edges WHERE kind = ?1 AND source = ?2 ORDER BY target")?;

        let targets = stmt
            .query_map((kind.as_str(), source), |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;

        Ok(targets)
    }

    fn all_versions_of(&self, library: &str) -> Result<Vec<VersionEntry>, StoreError> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT coordinate, version, published_at FROM packages
            WHERE ecosystem = ?1 AND library = ?2
            ORDER BY id
            "#,
        )?;

        let versions = stmt
            .query_map((self.ecosystem.as_str(), library), |row| {
                Ok(VersionEntry {
                    coordinate: row.get(0)?,
                    version: row.get(1)?,
                    published_at: Self::from_timestamp(row.get(2)?),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(versions)
    }

    fn libraries_without_next_edges(&self) -> Result<Vec<String>, StoreError> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT DISTINCT p.library FROM packages p
            WHERE p.ecosystem = ?1
              AND NOT EXISTS (
                SELECT 1 FROM packages q
                JOIN edges e ON e.kind = 'NEXT' AND e.source = q.coordinate
                WHERE q.library = p.library
              )
            ORDER BY p.library
            "#,
        )?;

        let libraries = stmt
            .query_map([self.ecosystem.as_str()], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;

        Ok(libraries)
    }

    fn constraints_missing_current_target(&self) -> Result<Vec<ConstraintNode>, StoreError> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT c.ecosystem, c.coordinate, c.library, c.range_spec, c.floating, c.sentinel
            FROM constraints c
            WHERE c.ecosystem = ?1
              AND EXISTS (
                SELECT 1 FROM edges e WHERE e.kind = 'REFERENCES' AND e.source = c.coordinate
              )
              AND NOT EXISTS (
                SELECT 1 FROM edges e WHERE e.kind = 'CURRENT_TARGET' AND e.source = c.coordinate
              )
            ORDER BY c.id
            "#,
        )?;

        let constraints = stmt
            .query_map([self.ecosystem.as_str()], Self::read_constraint)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(constraints)
    }

    fn reachable_versions(
        &self,
        constraint: &str,
        max_hops: u32,
    ) -> Result<Vec<ReachableVersion>, StoreError> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(
            r#"
            WITH RECURSIVE reach(coordinate, hops) AS (
                SELECT target, 0 FROM edges WHERE kind = 'REFERENCES' AND source = ?1
                UNION
                SELECT e.target, r.hops + 1 FROM reach r
                JOIN edges e ON e.kind = 'NEXT' AND e.source = r.coordinate
                WHERE r.hops < ?2
            )
            SELECT p.coordinate, p.version, p.published_at, MIN(r.hops),
                NOT EXISTS (
                    SELECT 1 FROM edges n WHERE n.kind = 'NEXT' AND n.source = p.coordinate
                ),
                EXISTS (
                    SELECT 1 FROM edges f
                    WHERE f.kind = 'REFERENCES' AND f.source = ?1 AND f.target = p.coordinate
                )
            FROM reach r
            JOIN packages p ON p.coordinate = r.coordinate
            GROUP BY p.coordinate
            ORDER BY MIN(r.hops), p.id
            "#,
        )?;

        let versions = stmt
            .query_map((constraint, max_hops), |row| {
                Ok(ReachableVersion {
                    coordinate: row.get(0)?,
                    version: row.get(1)?,
                    published_at: Self::from_timestamp(row.get(2)?),
                    hops: row.get(3)?,
                    is_tip: row.get(4)?,
                    is_referenced: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(versions)
    }
}
