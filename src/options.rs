use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;

use crate::error::{GraphError, Result};
use crate::metrics::StoreMetrics;
use crate::types::GraphId;

/// Default number of rows a cursor fetches per page.
pub const DEFAULT_CURSOR_BATCH: usize = 256;

/// SQLite journal mode applied when the connection is opened.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JournalMode {
    /// Rollback journal, deleted on commit.
    Delete,
    /// Rollback journal, truncated on commit.
    Truncate,
    /// In-memory journal.
    Memory,
    /// Write-ahead log.
    #[default]
    Wal,
    /// No journal.
    Off,
}

impl JournalMode {
    pub(crate) fn as_pragma(self) -> &'static str {
        match self {
            JournalMode::Delete => "DELETE",
            JournalMode::Truncate => "TRUNCATE",
            JournalMode::Memory => "MEMORY",
            JournalMode::Wal => "WAL",
            JournalMode::Off => "OFF",
        }
    }
}

/// SQLite `synchronous` level.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    /// No fsync.
    Off,
    /// fsync at critical moments.
    #[default]
    Normal,
    /// fsync after every transaction.
    Full,
}

impl SyncMode {
    pub(crate) fn as_pragma(self) -> &'static str {
        match self {
            SyncMode::Off => "OFF",
            SyncMode::Normal => "NORMAL",
            SyncMode::Full => "FULL",
        }
    }
}

/// Configuration supplied when opening a [`crate::GraphStore`].
#[derive(Clone)]
pub struct StoreOptions {
    /// Database file. `None` places the database in a private temporary
    /// directory that is removed when the store is dropped.
    pub path: Option<PathBuf>,
    /// Identity of the store and of its singleton graph item.
    pub graph_id: GraphId,
    /// Whether SQLite enforces foreign keys (and their cascades).
    pub foreign_keys: bool,
    /// Journal mode applied on open.
    pub journal_mode: JournalMode,
    /// Synchronous level applied on open.
    pub synchronous: SyncMode,
    /// Rows fetched per cursor page.
    pub cursor_batch: usize,
    /// Optional metrics collection implementation.
    pub metrics: Option<Arc<dyn StoreMetrics>>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct OptionsFile {
    path: Option<PathBuf>,
    graph_id: GraphId,
    foreign_keys: Option<bool>,
    journal_mode: Option<JournalMode>,
    synchronous: Option<SyncMode>,
    cursor_batch: Option<usize>,
}

impl StoreOptions {
    /// Creates options with default settings and no explicit path.
    pub fn new(graph_id: GraphId) -> Self {
        Self {
            path: None,
            graph_id,
            foreign_keys: true,
            journal_mode: JournalMode::default(),
            synchronous: SyncMode::default(),
            cursor_batch: DEFAULT_CURSOR_BATCH,
            metrics: None,
        }
    }

    /// Sets the database file.
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Enables or disables foreign key enforcement.
    pub fn foreign_keys(mut self, enabled: bool) -> Self {
        self.foreign_keys = enabled;
        self
    }

    /// Sets the journal mode.
    pub fn journal_mode(mut self, mode: JournalMode) -> Self {
        self.journal_mode = mode;
        self
    }

    /// Sets the synchronous level.
    pub fn synchronous(mut self, mode: SyncMode) -> Self {
        self.synchronous = mode;
        self
    }

    /// Sets the number of rows fetched per cursor page.
    pub fn cursor_batch(mut self, rows: usize) -> Self {
        self.cursor_batch = rows;
        self
    }

    /// Sets the metrics collection implementation.
    pub fn metrics(mut self, metrics: Arc<dyn StoreMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Parses options from TOML text.
    ///
    /// ```toml
    /// graph_id = "social.g1"
    /// path = "/var/lib/social.db"
    /// journal_mode = "wal"
    /// cursor_batch = 512
    /// ```
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let file: OptionsFile =
            toml::from_str(text).map_err(|err| GraphError::Config(err.to_string()))?;
        let mut opts = StoreOptions::new(file.graph_id);
        opts.path = file.path;
        if let Some(enabled) = file.foreign_keys {
            opts.foreign_keys = enabled;
        }
        if let Some(mode) = file.journal_mode {
            opts.journal_mode = mode;
        }
        if let Some(mode) = file.synchronous {
            opts.synchronous = mode;
        }
        if let Some(rows) = file.cursor_batch {
            opts.cursor_batch = rows;
        }
        opts.validate()?;
        Ok(opts)
    }

    /// Reads and parses a TOML options file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.cursor_batch == 0 {
            return Err(GraphError::Config("cursor_batch must be positive".into()));
        }
        if self.cursor_batch > i64::MAX as usize {
            return Err(GraphError::Config("cursor_batch is too large".into()));
        }
        Ok(())
    }
}
