//! SQLite storage for jobs, their scoring state and the fetch log.
//!
//! Three tables:
//! - `jobs`: one row per posting, unique on `(source, external_id)`
//! - `job_status`: scoring and dismissal state, one row per job
//! - `fetch_log`: one row per source per full fetch

use super::JobStore;
use crate::error::StoreError;
use crate::models::{InsertOutcome, JobRecord, RunLog, Source, StoredJob};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::FromRow;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info, instrument};

const JOB_COLUMNS: &str = "j.id, j.source, j.external_id, j.title, j.company, j.location, j.salary, \
     j.posted_date, j.description, j.url, j.fetched_at, \
     s.relevance_score, s.relevance_explanation, s.dismissed";

pub struct SqliteJobStore {
    pool: SqlitePool,
}

impl SqliteJobStore {
    /// Open (creating if needed) the database file at `path`.
    #[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        Self::init(pool).await
    }

    /// A private in-memory database, for tests and dry runs.
    ///
    /// Every connection to `:memory:` is its own database, so the pool is
    /// pinned to a single connection that is never recycled.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        Self::init(pool).await
    }

    async fn init(pool: SqlitePool) -> Result<Self, StoreError> {
        let store = Self { pool };
        store.run_migrations().await?;
        store.clean_salary_placeholders().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS jobs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                source TEXT NOT NULL,
                external_id TEXT NOT NULL,
                title TEXT NOT NULL,
                company TEXT NOT NULL DEFAULT '',
                location TEXT NOT NULL DEFAULT '',
                salary TEXT NOT NULL DEFAULT '',
                posted_date TEXT NOT NULL DEFAULT '',
                description TEXT NOT NULL DEFAULT '',
                url TEXT NOT NULL DEFAULT '',
                fetched_at TEXT NOT NULL,
                UNIQUE(source, external_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS job_status (
                job_id INTEGER PRIMARY KEY REFERENCES jobs(id) ON DELETE CASCADE,
                relevance_score REAL,
                relevance_explanation TEXT,
                dismissed INTEGER NOT NULL DEFAULT 0,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS fetch_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                logged_at TEXT NOT NULL,
                source TEXT NOT NULL,
                jobs_found INTEGER NOT NULL DEFAULT 0,
                new_jobs INTEGER NOT NULL DEFAULT 0,
                errors TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_jobs_fetched_at ON jobs(fetched_at)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Blank out Seek's "Add expected salary" prompt stored by older scrapes.
    async fn clean_salary_placeholders(&self) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE jobs SET salary = '' WHERE lower(salary) LIKE 'add expected salary%'")
            .execute(&self.pool)
            .await?;
        if result.rows_affected() > 0 {
            info!(rows = result.rows_affected(), "Cleared stored salary placeholders");
        }
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn job(&self, id: i64) -> Result<Option<StoredJob>, StoreError> {
        let sql = format!("SELECT {JOB_COLUMNS} FROM jobs j JOIN job_status s ON s.job_id = j.id WHERE j.id = ?");
        let row = sqlx::query_as::<_, JobRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(JobRow::into_stored_job).transpose()
    }

    pub async fn find(&self, source: Source, external_id: &str) -> Result<Option<StoredJob>, StoreError> {
        let sql = format!(
            "SELECT {JOB_COLUMNS} FROM jobs j JOIN job_status s ON s.job_id = j.id \
             WHERE j.source = ? AND j.external_id = ?"
        );
        let row = sqlx::query_as::<_, JobRow>(&sql)
            .bind(source.as_str())
            .bind(external_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(JobRow::into_stored_job).transpose()
    }

    /// Store a relevance assessment for a job.
    pub async fn record_score(&self, id: i64, score: f64, explanation: &str) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE job_status SET relevance_score = ?, relevance_explanation = ?, updated_at = ? WHERE job_id = ?",
        )
        .bind(score)
        .bind(explanation)
        .bind(timestamp(Utc::now()))
        .bind(id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    pub async fn dismiss(&self, id: i64) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE job_status SET dismissed = 1, updated_at = ? WHERE job_id = ?")
            .bind(timestamp(Utc::now()))
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    pub async fn count(&self) -> Result<usize, StoreError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM jobs")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as usize)
    }
}

#[derive(Debug, FromRow)]
struct JobRow {
    id: i64,
    source: String,
    external_id: String,
    title: String,
    company: String,
    location: String,
    salary: String,
    posted_date: String,
    description: String,
    url: String,
    fetched_at: String,
    relevance_score: Option<f64>,
    relevance_explanation: Option<String>,
    dismissed: bool,
}

impl JobRow {
    fn into_stored_job(self) -> Result<StoredJob, StoreError> {
        Ok(StoredJob {
            id: self.id,
            record: JobRecord {
                source: parse_source(&self.source)?,
                external_id: self.external_id,
                title: self.title,
                company: self.company,
                location: self.location,
                salary: self.salary,
                posted_date: self.posted_date,
                description: self.description,
                url: self.url,
            },
            fetched_at: parse_timestamp(&self.fetched_at)?,
            relevance_score: self.relevance_score,
            relevance_explanation: self.relevance_explanation,
            dismissed: self.dismissed,
        })
    }
}

#[derive(Debug, FromRow)]
struct RunRow {
    source: String,
    jobs_found: i64,
    new_jobs: i64,
    errors: Option<String>,
    logged_at: String,
}

impl RunRow {
    fn into_run_log(self) -> Result<RunLog, StoreError> {
        Ok(RunLog {
            source: parse_source(&self.source)?,
            found: self.jobs_found.max(0) as usize,
            new: self.new_jobs.max(0) as usize,
            errors: self.errors,
            logged_at: parse_timestamp(&self.logged_at)?,
        })
    }
}

fn parse_source(raw: &str) -> Result<Source, StoreError> {
    raw.parse().map_err(|_| StoreError::UnknownSource(raw.to_string()))
}

/// Fixed-width RFC 3339 so stored timestamps sort lexically.
fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Database(sqlx::Error::Decode(Box::new(e))))
}

#[async_trait]
impl JobStore for SqliteJobStore {
    #[instrument(level = "debug", skip_all, fields(source = %record.source, external_id = %record.external_id))]
    async fn insert_if_new(&self, record: &JobRecord) -> Result<InsertOutcome, StoreError> {
        let now = timestamp(Utc::now());
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            INSERT INTO jobs (source, external_id, title, company, location, salary,
                              posted_date, description, url, fetched_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(source, external_id) DO NOTHING
            "#,
        )
        .bind(record.source.as_str())
        .bind(&record.external_id)
        .bind(&record.title)
        .bind(&record.company)
        .bind(&record.location)
        .bind(&record.salary)
        .bind(&record.posted_date)
        .bind(&record.description)
        .bind(&record.url)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            debug!("Job already stored");
            return Ok(InsertOutcome::AlreadyExists);
        }

        let id = result.last_insert_rowid();
        sqlx::query("INSERT INTO job_status (job_id, updated_at) VALUES (?, ?)")
            .bind(id)
            .bind(&now)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        debug!(id, "Stored new job");
        Ok(InsertOutcome::Inserted(id))
    }

    async fn jobs_missing_detail_or_score(
        &self,
        source: Option<Source>,
        limit: usize,
    ) -> Result<Vec<StoredJob>, StoreError> {
        let sql = format!(
            "SELECT {JOB_COLUMNS} FROM jobs j JOIN job_status s ON s.job_id = j.id \
             WHERE s.dismissed = 0 \
               AND (j.description = '' OR s.relevance_score IS NULL) \
               AND (?1 IS NULL OR j.source = ?1) \
             ORDER BY j.fetched_at DESC, j.id DESC \
             LIMIT ?2"
        );
        let rows = sqlx::query_as::<_, JobRow>(&sql)
            .bind(source.map(|s| s.as_str()))
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(JobRow::into_stored_job).collect()
    }

    #[instrument(level = "debug", skip(self, description), fields(description_len = description.len()))]
    async fn update_description(&self, id: i64, description: &str, salary: Option<&str>) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        let result = match salary {
            Some(salary) => {
                sqlx::query("UPDATE jobs SET description = ?, salary = ? WHERE id = ?")
                    .bind(description)
                    .bind(salary)
                    .bind(id)
                    .execute(&mut *tx)
                    .await?
            }
            None => {
                sqlx::query("UPDATE jobs SET description = ? WHERE id = ?")
                    .bind(description)
                    .bind(id)
                    .execute(&mut *tx)
                    .await?
            }
        };
        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(StoreError::NotFound(id));
        }

        sqlx::query(
            "UPDATE job_status SET relevance_score = NULL, relevance_explanation = NULL, updated_at = ? \
             WHERE job_id = ?",
        )
        .bind(timestamp(Utc::now()))
        .bind(id)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn log_run(&self, run: &RunLog) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO fetch_log (logged_at, source, jobs_found, new_jobs, errors) VALUES (?, ?, ?, ?, ?)")
            .bind(timestamp(run.logged_at))
            .bind(run.source.as_str())
            .bind(run.found as i64)
            .bind(run.new as i64)
            .bind(run.errors.as_deref())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn recent_runs(&self, limit: usize) -> Result<Vec<RunLog>, StoreError> {
        let rows = sqlx::query_as::<_, RunRow>(
            "SELECT source, jobs_found, new_jobs, errors, logged_at FROM fetch_log \
             ORDER BY logged_at DESC, id DESC LIMIT ?",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(RunRow::into_run_log).collect()
    }
}
