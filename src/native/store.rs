use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::{Connection, OptionalExtension, params};

use crate::{
    constants::USER_TEST_PREFIX,
    core::{domain::TestCase, errors::JudgeError, traits::store::ArtifactStore},
};

const SCHEMA: &str = "
PRAGMA foreign_keys = ON;
CREATE TABLE IF NOT EXISTS cached_executables (
    content_hash TEXT PRIMARY KEY NOT NULL,
    executable_path TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS problems (
    id INTEGER PRIMARY KEY NOT NULL,
    name TEXT NOT NULL UNIQUE
);
CREATE TABLE IF NOT EXISTS tests (
    problem_id INTEGER NOT NULL REFERENCES problems(id),
    id TEXT NOT NULL,
    input TEXT NOT NULL,
    answer TEXT,
    PRIMARY KEY (problem_id, id)
);
";

/// SQLite file holding the executable cache and the local test sets.
///
/// Several judge processes may share the file; writes are serialized by
/// SQLite and the cache table is last-writer-wins.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self, JudgeError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch(SCHEMA)?;
        Ok(SqliteStore {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, JudgeError> {
        self.conn.lock().map_err(|e| JudgeError::Internal {
            msg: format!("store connection poisoned: {}", e),
        })
    }

    pub fn add_problem(&self, name: &str) -> Result<i64, JudgeError> {
        let conn = self.conn()?;
        conn.execute("INSERT INTO problems (name) VALUES (?1)", params![name])?;
        Ok(conn.last_insert_rowid())
    }

    pub fn problem_id(&self, name: &str) -> Result<Option<i64>, JudgeError> {
        Ok(self
            .conn()?
            .query_row(
                "SELECT id FROM problems WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()?)
    }

    /// Stores tests as `U<n>`, continuing after the highest existing number.
    /// Returns the first and last assigned ids.
    pub fn append_tests(
        &self,
        problem_id: i64,
        tests: &[(String, Option<String>)],
    ) -> Result<Option<(String, String)>, JudgeError> {
        if tests.is_empty() {
            return Ok(None);
        }

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let highest: Option<i64> = tx.query_row(
            "SELECT MAX(CAST(SUBSTR(id, 2) AS INTEGER)) FROM tests
             WHERE problem_id = ?1 AND id LIKE 'U%'",
            params![problem_id],
            |row| row.get(0),
        )?;

        let first = highest.unwrap_or(0) + 1;
        for (offset, (input, answer)) in tests.iter().enumerate() {
            tx.execute(
                "INSERT INTO tests (problem_id, id, input, answer) VALUES (?1, ?2, ?3, ?4)",
                params![
                    problem_id,
                    format!("{}{}", USER_TEST_PREFIX, first + offset as i64),
                    input,
                    answer
                ],
            )?;
        }
        tx.commit()?;

        let last = first + tests.len() as i64 - 1;
        Ok(Some((
            format!("{}{}", USER_TEST_PREFIX, first),
            format!("{}{}", USER_TEST_PREFIX, last),
        )))
    }

    /// Loads a problem's tests in numeric order, optionally limited to the
    /// given test numbers. Unknown numbers are ignored.
    pub fn load_tests(
        &self,
        problem_id: i64,
        selection: Option<&[u32]>,
    ) -> Result<Vec<TestCase>, JudgeError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT problem_id, id, input, answer FROM tests
             WHERE problem_id = ?1
             ORDER BY CAST(SUBSTR(id, 2) AS INTEGER)",
        )?;
        let tests = stmt
            .query_map(params![problem_id], |row| {
                Ok(TestCase {
                    problem_id: row.get(0)?,
                    id: row.get(1)?,
                    input: row.get(2)?,
                    expected_output: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(match selection {
            None => tests,
            Some(numbers) => tests
                .into_iter()
                .filter(|test| {
                    test.id
                        .strip_prefix(USER_TEST_PREFIX)
                        .and_then(|n| n.parse::<u32>().ok())
                        .is_some_and(|n| numbers.contains(&n))
                })
                .collect(),
        })
    }
}

#[async_trait::async_trait]
impl ArtifactStore for SqliteStore {
    async fn lookup(&self, content_hash: &str) -> Result<Option<PathBuf>, JudgeError> {
        let path: Option<String> = self
            .conn()?
            .query_row(
                "SELECT executable_path FROM cached_executables WHERE content_hash = ?1",
                params![content_hash],
                |row| row.get(0),
            )
            .optional()?;
        Ok(path.map(PathBuf::from))
    }

    async fn insert(&self, content_hash: &str, executable: &Path) -> Result<(), JudgeError> {
        self.conn()?.execute(
            "INSERT OR REPLACE INTO cached_executables (content_hash, executable_path)
             VALUES (?1, ?2)",
            params![content_hash, executable.to_string_lossy()],
        )?;
        Ok(())
    }

    async fn purge(&self, content_hash: &str) -> Result<(), JudgeError> {
        self.conn()?.execute(
            "DELETE FROM cached_executables WHERE content_hash = ?1",
            params![content_hash],
        )?;
        Ok(())
    }
}
