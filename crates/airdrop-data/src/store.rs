//! SQLite storage for clustering runs and their address assignments.
//!
//! Uses WAL mode and prepared statements inside a single transaction per run,
//! so a run is either stored completely or not at all.

use eyre::{eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::cell::RefCell;

use crate::types::{Address, ClusterAssignment, RunRecord};

pub struct Store {
    conn: RefCell<Connection>,
}

/// One historical assignment of an address, as returned by [`Store::lookup_address`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AddressHistoryRow {
    pub run_id: i64,
    pub run_name: String,
    pub clustered_at: String,
    pub cluster_id: String,
    pub rank: usize,
}

impl Store {
    /// Creates or opens a SQLite database with WAL mode enabled.
    ///
    /// # Errors
    /// Returns error if the database cannot be opened or migrations fail.
    pub fn new(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        let store = Self {
            conn: RefCell::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> Result<()> {
        self.conn.borrow_mut().execute_batch(
            "
            CREATE TABLE IF NOT EXISTS clustering_runs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                clustered_at TEXT NOT NULL,
                rows_read INTEGER,
                rows_skipped INTEGER,
                edges_accepted INTEGER,
                address_count INTEGER,
                cluster_count INTEGER
            );

            CREATE TABLE IF NOT EXISTS cluster_assignments (
                run_id INTEGER NOT NULL REFERENCES clustering_runs(id) ON DELETE CASCADE,
                address TEXT NOT NULL,
                cluster_id TEXT NOT NULL,
                rank INTEGER NOT NULL,
                PRIMARY KEY (run_id, address)
            );

            CREATE INDEX IF NOT EXISTS idx_cluster_assignments_address
                ON cluster_assignments(address);
            ",
        )?;
        Ok(())
    }

    /// Insert a run and all of its assignments in one transaction.
    ///
    /// Returns the new run id.
    ///
    /// # Errors
    /// Returns error if any insert fails (nothing is stored in that case).
    pub fn insert_run(&self, run: &RunRecord, rows: &[ClusterAssignment]) -> Result<i64> {
        let mut conn = self.conn.borrow_mut();
        let tx = conn.transaction()?;
        tx.execute(
            "
            INSERT INTO clustering_runs (
                name, clustered_at, rows_read, rows_skipped,
                edges_accepted, address_count, cluster_count
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            ",
            params![
                run.name,
                run.clustered_at,
                run.rows_read as i64,
                run.rows_skipped as i64,
                run.edges_accepted as i64,
                run.address_count as i64,
                run.cluster_count as i64,
            ],
        )?;
        let run_id = tx.last_insert_rowid();

        {
            let mut stmt = tx.prepare(
                "
                INSERT INTO cluster_assignments (run_id, address, cluster_id, rank)
                VALUES (?, ?, ?, ?)
                ",
            )?;
            for row in rows {
                stmt.execute(params![
                    run_id,
                    row.address.as_str(),
                    row.cluster_id,
                    row.rank as i64
                ])?;
            }
        }

        tx.commit()?;
        Ok(run_id)
    }

    /// List all stored runs, newest first.
    ///
    /// # Errors
    /// Returns error if the query fails.
    pub fn list_runs(&self) -> Result<Vec<RunRecord>> {
        let conn = self.conn.borrow();
        let mut stmt = conn.prepare(
            "
            SELECT id, name, clustered_at, rows_read, rows_skipped,
                   edges_accepted, address_count, cluster_count
            FROM clustering_runs
            ORDER BY id DESC
            ",
        )?;

        let runs = stmt
            .query_map([], |row| {
                Ok(RunRecord {
                    id: Some(row.get(0)?),
                    name: row.get(1)?,
                    clustered_at: row.get(2)?,
                    rows_read: row.get::<_, i64>(3)? as usize,
                    rows_skipped: row.get::<_, i64>(4)? as usize,
                    edges_accepted: row.get::<_, i64>(5)? as usize,
                    address_count: row.get::<_, i64>(6)? as usize,
                    cluster_count: row.get::<_, i64>(7)? as usize,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(runs)
    }

    /// Fetch the assignments of one run, ordered by rank then address.
    ///
    /// # Errors
    /// Returns error if the run does not exist or the query fails.
    pub fn get_assignments(&self, run_id: i64) -> Result<Vec<ClusterAssignment>> {
        let conn = self.conn.borrow();
        let exists: Option<i64> = conn
            .query_row(
                "SELECT id FROM clustering_runs WHERE id = ?",
                params![run_id],
                |row| row.get(0),
            )
            .optional()?;
        if exists.is_none() {
            return Err(eyre!("clustering run {run_id} not found"));
        }

        let mut stmt = conn.prepare(
            "
            SELECT address, cluster_id, rank
            FROM cluster_assignments
            WHERE run_id = ?
            ORDER BY rank ASC, address ASC
            ",
        )?;

        let rows = stmt
            .query_map(params![run_id], |row| {
                let address: String = row.get(0)?;
                Ok((address, row.get::<_, String>(1)?, row.get::<_, i64>(2)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(address, cluster_id, rank)| {
                Ok(ClusterAssignment {
                    address: Address::parse(&address)
                        .ok_or_else(|| eyre!("empty address stored for run {run_id}"))?,
                    cluster_id,
                    rank: rank as usize,
                })
            })
            .collect()
    }

    /// Every stored assignment of `address`, newest run first.
    ///
    /// # Errors
    /// Returns error if the query fails.
    pub fn lookup_address(&self, address: &Address) -> Result<Vec<AddressHistoryRow>> {
        let conn = self.conn.borrow();
        let mut stmt = conn.prepare(
            "
            SELECT r.id, r.name, r.clustered_at, a.cluster_id, a.rank
            FROM cluster_assignments a
            JOIN clustering_runs r ON r.id = a.run_id
            WHERE a.address = ?
            ORDER BY r.id DESC
            ",
        )?;

        let rows = stmt
            .query_map(params![address.as_str()], |row| {
                Ok(AddressHistoryRow {
                    run_id: row.get(0)?,
                    run_name: row.get(1)?,
                    clustered_at: row.get(2)?,
                    cluster_id: row.get(3)?,
                    rank: row.get::<_, i64>(4)? as usize,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_run(name: &str) -> RunRecord {
        RunRecord {
            id: None,
            name: name.to_string(),
            clustered_at: "2024-02-22T12:00:00+00:00".to_string(),
            rows_read: 10,
            rows_skipped: 1,
            edges_accepted: 7,
            address_count: 3,
            cluster_count: 1,
        }
    }

    fn assignment(addr: &str, cluster_id: &str, rank: usize) -> ClusterAssignment {
        ClusterAssignment {
            address: Address::parse(addr).unwrap(),
            cluster_id: cluster_id.to_string(),
            rank,
        }
    }

    #[test]
    fn migrations_create_tables() {
        let store = Store::new(":memory:").expect("in-memory store should always open");
        let conn = store.conn.borrow();
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .expect("query should prepare");

        let tables: Vec<String> = stmt
            .query_map([], |row| row.get(0))
            .expect("query_map should succeed")
            .collect::<Result<Vec<_>, _>>()
            .expect("all rows should parse");

        assert!(tables.contains(&"clustering_runs".to_string()));
        assert!(tables.contains(&"cluster_assignments".to_string()));
    }

    #[test]
    fn insert_and_read_back_run() {
        let store = Store::new(":memory:").expect("in-memory store should always open");
        let rows = vec![
            assignment("0xb", "uni_eth_1", 1),
            assignment("0xa", "uni_eth_1", 1),
            assignment("0xc", "uni_eth_2", 2),
        ];

        let run_id = store
            .insert_run(&sample_run("uni_eth"), &rows)
            .expect("insert should succeed");

        let runs = store.list_runs().expect("list should succeed");
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].id, Some(run_id));
        assert_eq!(runs[0].edges_accepted, 7);

        let stored = store.get_assignments(run_id).expect("assignments");
        let addrs: Vec<&str> = stored.iter().map(|r| r.address.as_str()).collect();
        assert_eq!(addrs, vec!["0xa", "0xb", "0xc"]);
        assert_eq!(stored[2].rank, 2);
    }

    #[test]
    fn duplicate_address_in_run_rolls_back() {
        let store = Store::new(":memory:").expect("in-memory store should always open");
        let rows = vec![assignment("0xa", "x_1", 1), assignment("0xa", "x_2", 2)];

        assert!(store.insert_run(&sample_run("x"), &rows).is_err());
        assert!(store.list_runs().expect("list").is_empty());
    }

    #[test]
    fn unknown_run_is_an_error() {
        let store = Store::new(":memory:").expect("in-memory store should always open");
        assert!(store.get_assignments(42).is_err());
    }

    #[test]
    fn lookup_spans_runs() {
        let store = Store::new(":memory:").expect("in-memory store should always open");
        store
            .insert_run(&sample_run("a_eth"), &[assignment("0xa", "a_eth_3", 3)])
            .expect("first insert");
        store
            .insert_run(&sample_run("b_eth"), &[assignment("0xa", "b_eth_1", 1)])
            .expect("second insert");

        let history = store
            .lookup_address(&Address::parse("0xA").unwrap())
            .expect("lookup");
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].cluster_id, "b_eth_1");
        assert_eq!(history[1].run_name, "a_eth");
        assert_eq!(history[1].rank, 3);
    }
}
