//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the JobStore trait.

use crate::crawler::HeadingCounts;
use crate::state::JobStatus;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{JobStore, StorageError, StorageResult};
use crate::storage::{BrokenLinkRecord, JobQuery, JobRecord};
use crate::AnalyzerError;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

const JOB_COLUMNS: &str = "id, url, owner, status, document_type, title, \
     h1_count, h2_count, h3_count, h4_count, h5_count, h6_count, \
     internal_links, external_links, broken_links, has_login_form, \
     error_message, created_at, updated_at";

/// SQLite job store backend
pub struct SqliteJobStore {
    conn: Mutex<Connection>,
}

impl SqliteJobStore {
    /// Opens or creates the database file and applies the schema
    pub fn new(path: &Path) -> Result<Self, AnalyzerError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;
        // Another process may hold the write lock briefly during a claim
        conn.busy_timeout(Duration::from_secs(5))?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates a private in-memory database
    pub fn open_in_memory() -> Result<Self, AnalyzerError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }

    /// Rewrites a job's last-update timestamp
    #[cfg(test)]
    pub(crate) fn set_updated_at(&self, job_id: i64, at: DateTime<Utc>) -> StorageResult<()> {
        self.conn()?.execute(
            "UPDATE jobs SET updated_at = ?1 WHERE id = ?2",
            params![format_timestamp(at), job_id],
        )?;
        Ok(())
    }
}

/// Fixed-width RFC 3339 so timestamps compare correctly as text
fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn now_timestamp() -> String {
    format_timestamp(Utc::now())
}

fn row_to_job(row: &Row<'_>) -> rusqlite::Result<JobRecord> {
    let status_str: String = row.get(3)?;
    let status = JobStatus::from_db_string(&status_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            Type::Text,
            Box::new(StorageError::Database(format!(
                "unknown job status '{}'",
                status_str
            ))),
        )
    })?;

    Ok(JobRecord {
        id: row.get(0)?,
        url: row.get(1)?,
        owner: row.get(2)?,
        status,
        document_type: row.get(4)?,
        title: row.get(5)?,
        headings: HeadingCounts::from_levels([
            row.get(6)?,
            row.get(7)?,
            row.get(8)?,
            row.get(9)?,
            row.get(10)?,
            row.get(11)?,
        ]),
        internal_links: row.get(12)?,
        external_links: row.get(13)?,
        broken_links: row.get(14)?,
        has_login_form: row.get(15)?,
        error_message: row.get(16)?,
        created_at: row.get(17)?,
        updated_at: row.get(18)?,
    })
}

fn read_job(conn: &Connection, job_id: i64) -> StorageResult<JobRecord> {
    conn.query_row(
        &format!("SELECT {} FROM jobs WHERE id = ?1", JOB_COLUMNS),
        params![job_id],
        row_to_job,
    )
    .optional()?
    .ok_or(StorageError::JobNotFound(job_id))
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

impl JobStore for SqliteJobStore {
    // ===== Submission and lookup =====

    fn create_job(&self, url: &str, owner: Option<&str>) -> StorageResult<i64> {
        let conn = self.conn()?;
        let now = now_timestamp();
        conn.execute(
            "INSERT INTO jobs (url, owner, status, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?4)",
            params![url, owner, JobStatus::Queued.to_db_string(), now],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn get_job(&self, job_id: i64) -> StorageResult<JobRecord> {
        let conn = self.conn()?;
        read_job(&conn, job_id)
    }

    fn list_jobs(&self, query: &JobQuery) -> StorageResult<Vec<JobRecord>> {
        let mut clauses = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        if let Some(status) = query.status {
            clauses.push("status = ?");
            values.push(Value::Text(status.to_db_string().to_string()));
        }
        if let Some(search) = query.search.as_deref().filter(|s| !s.is_empty()) {
            clauses.push("url LIKE ?");
            values.push(Value::Text(format!("%{}%", search)));
        }
        if let Some(owner) = &query.owner {
            clauses.push("owner = ?");
            values.push(Value::Text(owner.clone()));
        }

        let where_clause = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };
        values.push(Value::Integer(i64::from(query.limit)));
        values.push(Value::Integer(i64::from(query.offset)));

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM jobs {} ORDER BY id LIMIT ? OFFSET ?",
            JOB_COLUMNS, where_clause
        ))?;

        let jobs = stmt
            .query_map(params_from_iter(values.iter()), row_to_job)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(jobs)
    }

    fn count_jobs(&self, status: Option<JobStatus>) -> StorageResult<u64> {
        let conn = self.conn()?;
        let count: i64 = match status {
            Some(status) => conn.query_row(
                "SELECT COUNT(*) FROM jobs WHERE status = ?1",
                params![status.to_db_string()],
                |row| row.get(0),
            )?,
            None => conn.query_row("SELECT COUNT(*) FROM jobs", [], |row| row.get(0))?,
        };
        Ok(count as u64)
    }

    // ===== Worker contract =====

    fn claim_next_queued(&self) -> StorageResult<Option<JobRecord>> {
        let conn = self.conn()?;

        loop {
            let candidate: Option<i64> = conn
                .query_row(
                    "SELECT id FROM jobs WHERE status = ?1 ORDER BY id LIMIT 1",
                    params![JobStatus::Queued.to_db_string()],
                    |row| row.get(0),
                )
                .optional()?;

            let Some(job_id) = candidate else {
                return Ok(None);
            };

            let changed = conn.execute(
                "UPDATE jobs SET status = ?1, updated_at = ?2 WHERE id = ?3 AND status = ?4",
                params![
                    JobStatus::Running.to_db_string(),
                    now_timestamp(),
                    job_id,
                    JobStatus::Queued.to_db_string()
                ],
            )?;

            if changed == 1 {
                return read_job(&conn, job_id).map(Some);
            }

            // Another process claimed it between the read and the update
            tracing::debug!(job_id, "Lost claim race, trying next queued job");
        }
    }

    fn save_result(&self, job: &JobRecord) -> StorageResult<()> {
        let conn = self.conn()?;
        let [h1, h2, h3, h4, h5, h6] = job.headings.levels();
        let changed = conn.execute(
            "UPDATE jobs SET status = ?1, document_type = ?2, title = ?3,
             h1_count = ?4, h2_count = ?5, h3_count = ?6, h4_count = ?7, h5_count = ?8, h6_count = ?9,
             internal_links = ?10, external_links = ?11, broken_links = ?12, has_login_form = ?13,
             error_message = ?14, updated_at = ?15
             WHERE id = ?16",
            params![
                job.status.to_db_string(),
                job.document_type,
                job.title,
                h1,
                h2,
                h3,
                h4,
                h5,
                h6,
                job.internal_links,
                job.external_links,
                job.broken_links,
                job.has_login_form,
                job.error_message,
                now_timestamp(),
                job.id
            ],
        )?;

        if changed == 0 {
            return Err(StorageError::JobNotFound(job.id));
        }
        Ok(())
    }

    fn create_broken_link(
        &self,
        job_id: i64,
        link: &str,
        status_code: Option<u16>,
    ) -> StorageResult<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO broken_links (job_id, link, status_code, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![job_id, link, status_code, now_timestamp()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn reset_stale_running(&self, older_than: Duration) -> StorageResult<u64> {
        let threshold = chrono::Duration::from_std(older_than)
            .map_err(|e| StorageError::Database(format!("invalid staleness threshold: {}", e)))?;
        let cutoff = format_timestamp(Utc::now() - threshold);

        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE jobs SET status = ?1, updated_at = ?2 WHERE status = ?3 AND updated_at < ?4",
            params![
                JobStatus::Queued.to_db_string(),
                now_timestamp(),
                JobStatus::Running.to_db_string(),
                cutoff
            ],
        )?;
        Ok(changed as u64)
    }

    // ===== Host-side operations =====

    fn bulk_set_status(
        &self,
        ids: &[i64],
        from: Option<JobStatus>,
        to: JobStatus,
    ) -> StorageResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let allowed_from: Vec<JobStatus> = match from {
            Some(status) => vec![status],
            None => JobStatus::ALL
                .into_iter()
                .filter(|status| status.can_transition_to(to))
                .collect(),
        };
        if allowed_from.is_empty() {
            return Ok(0);
        }

        let mut values: Vec<Value> = vec![
            Value::Text(to.to_db_string().to_string()),
            Value::Text(now_timestamp()),
        ];
        values.extend(ids.iter().map(|id| Value::Integer(*id)));
        values.extend(
            allowed_from
                .iter()
                .map(|status| Value::Text(status.to_db_string().to_string())),
        );

        let sql = format!(
            "UPDATE jobs SET status = ?, updated_at = ? WHERE id IN ({}) AND status IN ({})",
            placeholders(ids.len()),
            placeholders(allowed_from.len())
        );

        let conn = self.conn()?;
        let changed = conn.execute(&sql, params_from_iter(values.iter()))?;
        Ok(changed as u64)
    }

    fn get_broken_links(&self, job_id: i64) -> StorageResult<Vec<BrokenLinkRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, job_id, link, status_code, created_at FROM broken_links
             WHERE job_id = ?1 ORDER BY id",
        )?;

        let links = stmt
            .query_map(params![job_id], |row| {
                Ok(BrokenLinkRecord {
                    id: row.get(0)?,
                    job_id: row.get(1)?,
                    link: row.get(2)?,
                    status_code: row.get(3)?,
                    created_at: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(links)
    }

    fn count_broken_links(&self) -> StorageResult<u64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM broken_links", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn delete_jobs(&self, ids: &[i64]) -> StorageResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let in_list = placeholders(ids.len());

        tx.execute(
            &format!("DELETE FROM broken_links WHERE job_id IN ({})", in_list),
            params_from_iter(ids.iter()),
        )?;
        let deleted = tx.execute(
            &format!("DELETE FROM jobs WHERE id IN ({})", in_list),
            params_from_iter(ids.iter()),
        )?;

        tx.commit()?;
        Ok(deleted as u64)
    }
}
