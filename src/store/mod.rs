//! Persistence of harvested jobs and run telemetry.
//!
//! The pipeline only talks to the [`JobStore`] trait; [`SqliteJobStore`] is
//! the shipped implementation.

mod sqlite;

pub use sqlite::SqliteJobStore;

use crate::error::StoreError;
use crate::models::{InsertOutcome, JobRecord, RunLog, Source, StoredJob};
use async_trait::async_trait;

#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert a record unless `(source, external_id)` is already stored.
    ///
    /// An existing row is never modified.
    async fn insert_if_new(&self, record: &JobRecord) -> Result<InsertOutcome, StoreError>;

    /// Non-dismissed jobs lacking a description or a relevance score,
    /// newest first.
    async fn jobs_missing_detail_or_score(
        &self,
        source: Option<Source>,
        limit: usize,
    ) -> Result<Vec<StoredJob>, StoreError>;

    /// Overwrite a job's description, and its salary when given, then clear
    /// its relevance score and explanation.
    async fn update_description(&self, id: i64, description: &str, salary: Option<&str>) -> Result<(), StoreError>;

    async fn log_run(&self, run: &RunLog) -> Result<(), StoreError>;

    /// Most recent run log entries, newest first.
    async fn recent_runs(&self, limit: usize) -> Result<Vec<RunLog>, StoreError>;
}
