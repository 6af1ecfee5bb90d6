//! `SQLite`-backed implementation of [`StateBackend`] and [`RecordSink`].
//!
//! Uses a single `Mutex<Connection>` for thread safety.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use rusqlite::Connection;

use vaultsync_types::ids::{EndpointName, SourceId};
use vaultsync_types::job::{JobProgress, JobStatus};
use vaultsync_types::record::RawRecord;
use vaultsync_types::watermark::WatermarkState;

use crate::backend::{JobRecord, StateBackend};
use crate::error::{self, StateError};
use crate::sink::RecordSink;

/// `SQLite` datetime format (UTC, no timezone suffix).
const SQLITE_DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S";

/// Idempotent DDL for state tables.
const CREATE_TABLES: &str = r"
CREATE TABLE IF NOT EXISTS watermarks (
    source TEXT NOT NULL,
    endpoint TEXT NOT NULL,
    field TEXT,
    value TEXT,
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (source, endpoint)
);

CREATE TABLE IF NOT EXISTS backup_jobs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    source TEXT NOT NULL,
    status TEXT NOT NULL,
    started_at TEXT NOT NULL DEFAULT (datetime('now')),
    finished_at TEXT,
    total_steps INTEGER DEFAULT 0,
    completed_steps INTEGER DEFAULT 0,
    failed_steps INTEGER DEFAULT 0,
    skipped_steps INTEGER DEFAULT 0,
    records_processed INTEGER DEFAULT 0,
    data_size_bytes INTEGER DEFAULT 0,
    percent_complete REAL DEFAULT 0,
    current_step TEXT,
    error_message TEXT
);

CREATE TABLE IF NOT EXISTS backup_records (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    job_id INTEGER NOT NULL REFERENCES backup_jobs(id),
    endpoint TEXT NOT NULL,
    record_id TEXT,
    payload TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_records_job_endpoint ON backup_records (job_id, endpoint);
";

/// `SQLite`-backed state storage and record sink.
///
/// Create with [`SqliteStateBackend::open`] for file-backed persistence
/// or [`SqliteStateBackend::in_memory`] for tests.
pub struct SqliteStateBackend {
    conn: Mutex<Connection>,
}

impl SqliteStateBackend {
    /// Open or create a `SQLite` state database at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::Io`] if the directory can't be created,
    /// or [`StateError::Sqlite`] if the database can't be opened.
    pub fn open(path: &Path) -> error::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(CREATE_TABLES)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory `SQLite` backend (for testing).
    ///
    /// # Errors
    ///
    /// Returns [`StateError::Sqlite`] if the in-memory database can't
    /// be initialized.
    pub fn in_memory() -> error::Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(CREATE_TABLES)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the connection lock.
    fn lock_conn(&self) -> error::Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StateError::LockPoisoned)
    }

    /// Convert a `SQLite` datetime string to ISO-8601.
    fn sqlite_to_iso8601(raw: &str) -> String {
        NaiveDateTime::parse_from_str(raw, SQLITE_DATETIME_FMT).map_or_else(
            |_| raw.to_string(),
            |ndt| format!("{}Z", ndt.format("%Y-%m-%dT%H:%M:%S")),
        )
    }

    /// Convert an ISO-8601 string to `SQLite` datetime format.
    fn iso8601_to_sqlite(iso: &str) -> String {
        chrono::DateTime::parse_from_rfc3339(iso).map_or_else(
            |_| iso.to_string(),
            |dt| dt.format(SQLITE_DATETIME_FMT).to_string(),
        )
    }

    #[cfg(test)]
    fn count_records_for_endpoint(&self, job_id: i64, endpoint: &str) -> error::Result<i64> {
        let conn = self.lock_conn()?;
        conn.query_row(
            "SELECT COUNT(*) FROM backup_records WHERE job_id = ?1 AND endpoint = ?2",
            rusqlite::params![job_id, endpoint],
            |row| row.get(0),
        )
        .map_err(StateError::Sqlite)
    }
}

impl StateBackend for SqliteStateBackend {
    fn load_watermark(
        &self,
        source: &SourceId,
        endpoint: &EndpointName,
    ) -> error::Result<Option<WatermarkState>> {
        let conn = self.lock_conn()?;
        let result = conn.query_row(
            "SELECT field, value, updated_at FROM watermarks \
             WHERE source = ?1 AND endpoint = ?2",
            rusqlite::params![source.as_str(), endpoint.as_str()],
            |row| {
                let field: Option<String> = row.get(0)?;
                let value: Option<String> = row.get(1)?;
                let updated_at: String = row.get(2)?;
                Ok((field, value, updated_at))
            },
        );

        match result {
            Ok((field, value, updated_at)) => Ok(Some(WatermarkState {
                field,
                value,
                updated_at: Self::sqlite_to_iso8601(&updated_at),
            })),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StateError::Sqlite(e)),
        }
    }

    fn save_watermark(
        &self,
        source: &SourceId,
        endpoint: &EndpointName,
        watermark: &WatermarkState,
    ) -> error::Result<()> {
        let conn = self.lock_conn()?;
        let updated_at = Self::iso8601_to_sqlite(&watermark.updated_at);
        conn.execute(
            "INSERT INTO watermarks (source, endpoint, field, value, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5) \
             ON CONFLICT(source, endpoint) \
             DO UPDATE SET field = ?3, value = ?4, updated_at = ?5",
            rusqlite::params![
                source.as_str(),
                endpoint.as_str(),
                watermark.field,
                watermark.value,
                updated_at,
            ],
        )?;
        Ok(())
    }

    fn create_job(&self, source: &SourceId) -> error::Result<i64> {
        let conn = self.lock_conn()?;
        conn.execute(
            "INSERT INTO backup_jobs (source, status) VALUES (?1, ?2)",
            rusqlite::params![source.as_str(), JobStatus::Pending.as_str()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    #[allow(clippy::cast_possible_wrap)]
    fn update_job(
        &self,
        job_id: i64,
        status: JobStatus,
        progress: &JobProgress,
    ) -> error::Result<()> {
        let conn = self.lock_conn()?;
        let finished_at = if status.is_terminal() {
            Some(Utc::now().format(SQLITE_DATETIME_FMT).to_string())
        } else {
            None
        };
        conn.execute(
            "UPDATE backup_jobs SET status = ?1, \
             finished_at = COALESCE(?2, finished_at), \
             total_steps = ?3, completed_steps = ?4, failed_steps = ?5, \
             skipped_steps = ?6, records_processed = ?7, data_size_bytes = ?8, \
             percent_complete = ?9, current_step = ?10, error_message = ?11 \
             WHERE id = ?12",
            rusqlite::params![
                status.as_str(),
                finished_at,
                progress.total_steps,
                progress.completed_steps,
                progress.failed_steps,
                progress.skipped_steps,
                progress.records_processed as i64,
                progress.data_size_bytes as i64,
                f64::from(progress.percent_complete),
                progress.current_step,
                progress.error_message,
                job_id,
            ],
        )?;
        Ok(())
    }

    #[allow(clippy::cast_sign_loss)]
    fn get_job(&self, job_id: i64) -> error::Result<Option<JobRecord>> {
        let conn = self.lock_conn()?;
        let result = conn.query_row(
            "SELECT source, status, started_at, finished_at, total_steps, \
             completed_steps, failed_steps, skipped_steps, records_processed, \
             data_size_bytes, percent_complete, current_step, error_message \
             FROM backup_jobs WHERE id = ?1",
            [job_id],
            |row| {
                let source: String = row.get(0)?;
                let status: String = row.get(1)?;
                let started_at: String = row.get(2)?;
                let finished_at: Option<String> = row.get(3)?;
                #[allow(clippy::cast_possible_truncation)]
                let percent_complete = row.get::<_, f64>(10)? as f32;
                let progress = JobProgress {
                    total_steps: row.get(4)?,
                    completed_steps: row.get(5)?,
                    failed_steps: row.get(6)?,
                    skipped_steps: row.get(7)?,
                    records_processed: row.get::<_, i64>(8)? as u64,
                    data_size_bytes: row.get::<_, i64>(9)? as u64,
                    percent_complete,
                    current_step: row.get(11)?,
                    error_message: row.get(12)?,
                };
                Ok((source, status, started_at, finished_at, progress))
            },
        );

        match result {
            Ok((source, status, started_at, finished_at, progress)) => {
                let status = JobStatus::parse(&status).ok_or_else(|| {
                    StateError::context(
                        format!("get_job: unknown status '{status}'"),
                        rusqlite::Error::InvalidQuery,
                    )
                })?;
                Ok(Some(JobRecord {
                    id: job_id,
                    source: SourceId::new(source),
                    status,
                    progress,
                    started_at: Self::sqlite_to_iso8601(&started_at),
                    finished_at: finished_at.as_deref().map(Self::sqlite_to_iso8601),
                }))
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StateError::Sqlite(e)),
        }
    }
}

#[async_trait]
impl RecordSink for SqliteStateBackend {
    async fn persist_records(
        &self,
        job_id: i64,
        endpoint: &EndpointName,
        records: &[RawRecord],
    ) -> error::Result<u64> {
        if records.is_empty() {
            return Ok(0);
        }

        let conn = self.lock_conn()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| StateError::context("persist_records: begin tx", e))?;
        let mut stmt = tx
            .prepare(
                "INSERT INTO backup_records (job_id, endpoint, record_id, payload) \
                 VALUES (?1, ?2, ?3, ?4)",
            )
            .map_err(|e| StateError::context("persist_records: prepare", e))?;

        let mut count = 0u64;
        for record in records {
            let payload = serde_json::to_string(&record.payload).map_err(|e| {
                StateError::context(
                    format!("persist_records: serialize payload: {e}"),
                    rusqlite::Error::InvalidQuery,
                )
            })?;
            stmt.execute(rusqlite::params![
                job_id,
                endpoint.as_str(),
                record.id,
                payload,
            ])
            .map_err(|e| StateError::context("persist_records: execute", e))?;
            count += 1;
        }
        drop(stmt);
        tx.commit()
            .map_err(|e| StateError::context("persist_records: commit", e))?;

        Ok(count)
    }
}
