use std::cell::OnceCell;
use std::path::{Path, PathBuf};

use rusqlite::{Connection, Params, Row};
use tempfile::TempDir;
use tracing::{debug, trace, warn};

use crate::error::{GraphError, Result, SqlContext};
use crate::options::{JournalMode, StoreOptions, SyncMode};

use super::ddl;

/// File name used inside the fallback directory.
const FALLBACK_FILE: &str = "graph.db";

/// Owns the single physical connection of a store.
///
/// The connection is opened on first use rather than at construction, so a
/// store can be built and configured before any file is touched.
pub(crate) struct Backing {
    path: Option<PathBuf>,
    foreign_keys: bool,
    journal_mode: JournalMode,
    synchronous: SyncMode,
    conn: OnceCell<Connection>,
    // Declared after `conn` so the connection closes before the directory is removed.
    fallback: OnceCell<TempDir>,
}

impl Backing {
    pub(crate) fn new(opts: &StoreOptions) -> Self {
        Self {
            path: opts.path.clone(),
            foreign_keys: opts.foreign_keys,
            journal_mode: opts.journal_mode,
            synchronous: opts.synchronous,
            conn: OnceCell::new(),
            fallback: OnceCell::new(),
        }
    }

    /// Returns the open connection, opening it if needed. Idempotent.
    pub(crate) fn connect(&self) -> Result<&Connection> {
        if let Some(conn) = self.conn.get() {
            return Ok(conn);
        }
        let conn = self.open()?;
        Ok(self.conn.get_or_init(|| conn))
    }

    pub(crate) fn is_connected(&self) -> bool {
        self.conn.get().is_some()
    }

    /// Location of the database file, once known.
    pub(crate) fn location(&self) -> Option<PathBuf> {
        match (&self.path, self.fallback.get()) {
            (Some(path), _) => Some(path.clone()),
            (None, Some(dir)) => Some(dir.path().join(FALLBACK_FILE)),
            (None, None) => None,
        }
    }

    fn open(&self) -> Result<Connection> {
        let path = match &self.path {
            Some(path) => path.clone(),
            None => self.fallback_dir()?.join(FALLBACK_FILE),
        };
        let conn = Connection::open(&path).map_err(|source| GraphError::Open {
            path: path.clone(),
            source,
        })?;
        conn.pragma_update(None, "foreign_keys", self.foreign_keys)
            .sql_context("PRAGMA foreign_keys")?;
        // journal_mode reports the mode now in effect as a row.
        let journal_mode: String = conn
            .pragma_update_and_check(None, "journal_mode", self.journal_mode.as_pragma(), |row| {
                row.get(0)
            })
            .sql_context("PRAGMA journal_mode")?;
        conn.pragma_update(None, "synchronous", self.synchronous.as_pragma())
            .sql_context("PRAGMA synchronous")?;
        conn.execute_batch(ddl::BASE_TABLES)
            .sql_context(ddl::BASE_TABLES)?;
        debug!(
            path = %path.display(),
            foreign_keys = self.foreign_keys,
            journal_mode = %journal_mode,
            "backing store opened"
        );
        Ok(conn)
    }

    fn fallback_dir(&self) -> Result<&Path> {
        if let Some(dir) = self.fallback.get() {
            return Ok(dir.path());
        }
        let dir = tempfile::Builder::new().prefix("relgraph-").tempdir()?;
        debug!(dir = %dir.path().display(), "no path configured; using fallback directory");
        Ok(self.fallback.get_or_init(|| dir).path())
    }

    pub(crate) fn execute<P: Params>(&self, sql: &str, params: P) -> Result<usize> {
        trace!(sql, "execute");
        let conn = self.connect()?;
        let mut stmt = conn.prepare_cached(sql).sql_context(sql)?;
        stmt.execute(params).sql_context(sql)
    }

    pub(crate) fn execute_batch(&self, sql: &str) -> Result<()> {
        trace!(sql, "execute batch");
        self.connect()?.execute_batch(sql).sql_context(sql)
    }

    /// Runs `sql` and maps every row; the statement is reset before returning.
    pub(crate) fn query<T, P, F>(&self, sql: &str, params: P, mut map: F) -> Result<Vec<T>>
    where
        P: Params,
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        trace!(sql, "query");
        let conn = self.connect()?;
        let mut stmt = conn.prepare_cached(sql).sql_context(sql)?;
        let mut rows = stmt.query(params).sql_context(sql)?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().sql_context(sql)? {
            out.push(map(row).sql_context(sql)?);
        }
        Ok(out)
    }

    /// Runs `sql` and maps the first row, if any.
    pub(crate) fn query_row<T, P, F>(&self, sql: &str, params: P, map: F) -> Result<Option<T>>
    where
        P: Params,
        F: FnOnce(&Row<'_>) -> rusqlite::Result<T>,
    {
        trace!(sql, "query row");
        let conn = self.connect()?;
        let mut stmt = conn.prepare_cached(sql).sql_context(sql)?;
        let mut rows = stmt.query(params).sql_context(sql)?;
        match rows.next().sql_context(sql)? {
            Some(row) => Ok(Some(map(row).sql_context(sql)?)),
            None => Ok(None),
        }
    }

    /// Runs `f` inside a named savepoint, rolling back to it if `f` fails.
    pub(crate) fn savepoint<T>(&self, name: &str, f: impl FnOnce() -> Result<T>) -> Result<T> {
        self.execute_batch(&format!("SAVEPOINT {name}"))?;
        match f() {
            Ok(value) => {
                self.execute_batch(&format!("RELEASE {name}"))?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback) =
                    self.execute_batch(&format!("ROLLBACK TO {name}; RELEASE {name}"))
                {
                    warn!(savepoint = name, error = %rollback, "rollback failed");
                }
                Err(err)
            }
        }
    }

    /// Drops cached statements; called after DDL invalidates them.
    pub(crate) fn flush_statement_cache(&self) {
        if let Some(conn) = self.conn.get() {
            conn.flush_prepared_statement_cache();
        }
    }
}
