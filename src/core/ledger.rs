//! Append-only audit ledger backed by SQLite.
//!
//! One row per attempted execution. Rows are never updated or deleted.
//! Sequence ids come from `AUTOINCREMENT`, so they are strictly increasing
//! and never reused, even after restarts. Each operation opens its own
//! connection on a blocking thread; SQLite's write lock serialises
//! concurrent appends from any number of tasks or processes.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use thiserror::Error;
use tracing::debug;

use crate::domain::{AuditEntry, AuditRecord, AuditStatus};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS scan_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp TEXT NOT NULL,
    tool TEXT NOT NULL,
    target TEXT NOT NULL,
    command TEXT NOT NULL,
    status TEXT NOT NULL CHECK (status IN ('success', 'failed')),
    result_file TEXT
);
CREATE INDEX IF NOT EXISTS idx_scan_history_tool ON scan_history (tool);
";

/// How long a connection waits for the write lock before giving up
const BUSY_TIMEOUT: Duration = Duration::from_secs(30);

/// Ledger failures
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Failed to create ledger directory {path}: {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Corrupt ledger row {id}: {reason}")]
    CorruptRow { id: i64, reason: String },

    #[error("Ledger task failed: {0}")]
    Task(String),
}

/// Durable, append-only record of attempted executions
#[async_trait]
pub trait AuditLedger: Send + Sync {
    /// Append a record and return its sequence id
    async fn append(&self, entry: AuditEntry) -> Result<i64, LedgerError>;

    /// The `limit` most recent records, newest first, optionally for one tool
    async fn query(&self, limit: usize, tool: Option<&str>) -> Result<Vec<AuditRecord>, LedgerError>;
}

/// SQLite implementation of the ledger
#[derive(Debug, Clone)]
pub struct SqliteLedger {
    db_path: PathBuf,
}

impl SqliteLedger {
    /// Open the ledger, creating the database and schema if absent.
    ///
    /// Opening an existing ledger is a no-op apart from the connection check.
    pub async fn open(db_path: impl Into<PathBuf>) -> Result<Self, LedgerError> {
        let db_path = db_path.into();

        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| LedgerError::Directory {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        let ledger = Self { db_path };
        ledger
            .blocking(|conn| {
                let _mode: String =
                    conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
                conn.execute_batch(SCHEMA)?;
                Ok(())
            })
            .await?;

        debug!(path = %ledger.db_path.display(), "Audit ledger ready");
        Ok(ledger)
    }

    /// Path to the database file
    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// Fetch a single record by sequence id
    pub async fn get(&self, id: i64) -> Result<Option<AuditRecord>, LedgerError> {
        self.blocking(move |conn| {
            let raw = conn
                .query_row(
                    "SELECT id, timestamp, tool, target, command, status, result_file
                     FROM scan_history WHERE id = ?1",
                    params![id],
                    |row| {
                        Ok(RawRow {
                            id: row.get(0)?,
                            timestamp: row.get(1)?,
                            tool: row.get(2)?,
                            target: row.get(3)?,
                            command: row.get(4)?,
                            status: row.get(5)?,
                            artifact: row.get(6)?,
                        })
                    },
                )
                .optional()?;
            raw.map(RawRow::into_record).transpose()
        })
        .await
    }

    /// Total number of records
    pub async fn count(&self) -> Result<u64, LedgerError> {
        self.blocking(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM scan_history", [], |row| row.get(0))?;
            Ok(count as u64)
        })
        .await
    }

    /// Run `f` against a fresh connection on the blocking pool
    async fn blocking<T, F>(&self, f: F) -> Result<T, LedgerError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, LedgerError> + Send + 'static,
    {
        let path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = connect(&path)?;
            f(&mut conn)
        })
        .await
        .map_err(|e| LedgerError::Task(e.to_string()))?
    }
}

fn connect(path: &Path) -> Result<Connection, LedgerError> {
    let conn = Connection::open(path)?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    conn.pragma_update(None, "synchronous", "FULL")?;
    Ok(conn)
}

#[async_trait]
impl AuditLedger for SqliteLedger {
    async fn append(&self, entry: AuditEntry) -> Result<i64, LedgerError> {
        self.blocking(move |conn| {
            // IMMEDIATE takes the write lock up front so the id read below is ours
            let tx = conn.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
            tx.execute(
                "INSERT INTO scan_history (timestamp, tool, target, command, status, result_file)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    entry.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true),
                    entry.tool,
                    entry.target,
                    entry.command,
                    entry.status.as_str(),
                    entry.artifact,
                ],
            )?;
            let id = tx.last_insert_rowid();
            tx.commit()?;
            Ok(id)
        })
        .await
    }

    async fn query(&self, limit: usize, tool: Option<&str>) -> Result<Vec<AuditRecord>, LedgerError> {
        let tool = tool.map(str::to_string);
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        self.blocking(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, timestamp, tool, target, command, status, result_file
                 FROM scan_history
                 WHERE ?1 IS NULL OR tool = ?1
                 ORDER BY id DESC
                 LIMIT ?2",
            )?;

            let rows = stmt.query_map(params![tool, limit], |row| {
                Ok(RawRow {
                    id: row.get(0)?,
                    timestamp: row.get(1)?,
                    tool: row.get(2)?,
                    target: row.get(3)?,
                    command: row.get(4)?,
                    status: row.get(5)?,
                    artifact: row.get(6)?,
                })
            })?;

            let mut records = Vec::new();
            for row in rows {
                records.push(row?.into_record()?);
            }
            Ok(records)
        })
        .await
    }
}

struct RawRow {
    id: i64,
    timestamp: String,
    tool: String,
    target: String,
    command: String,
    status: String,
    artifact: Option<String>,
}

impl RawRow {
    fn into_record(self) -> Result<AuditRecord, LedgerError> {
        let corrupt = |reason: String| LedgerError::CorruptRow { id: self.id, reason };

        let timestamp = DateTime::parse_from_rfc3339(&self.timestamp)
            .map_err(|e| corrupt(format!("bad timestamp {:?}: {}", self.timestamp, e)))?
            .with_timezone(&Utc);
        let status: AuditStatus = self.status.parse().map_err(corrupt)?;

        Ok(AuditRecord {
            id: self.id,
            timestamp,
            tool: self.tool,
            target: self.target,
            command: self.command,
            status,
            artifact: self.artifact,
        })
    }
}
