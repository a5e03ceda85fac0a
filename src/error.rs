//! Typed errors for the harvesting pipeline.
//!
//! Only configuration and storage setup failures abort a run. Everything that
//! goes wrong at page or job granularity is turned into a [`ScrapeError`] and
//! returned next to whatever partial results were gathered.

use crate::models::Source;
use thiserror::Error;

/// Transport failures: network, timeout or non-success status.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request could not be sent or the body could not be read.
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status code.
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// The request exceeded the configured timeout.
    #[error("request to {url} timed out")]
    Timeout { url: String },

    /// The HTTP client for a source could not be built.
    #[error("failed to build HTTP client for {board}: {reason}")]
    Client { board: Source, reason: String },
}

/// Storage collaborator failures.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("unknown source `{0}` in stored row")]
    UnknownSource(String),

    #[error("job {0} not found")]
    NotFound(i64),
}

/// Configuration loading and validation failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("{0} is enabled but has no search queries configured")]
    NoQueries(Source),

    #[error("politeness delay min ({min}s) exceeds max ({max}s)")]
    DelayRange { min: f64, max: f64 },

    #[error("politeness delay {field} must be a finite, non-negative number of seconds, got {value}")]
    InvalidDelay { field: &'static str, value: f64 },

    #[error("request timeout must be at least one second")]
    ZeroTimeout,

    #[error("invalid selector `{selector}`: {reason}")]
    Selector { selector: String, reason: String },

    #[error("invalid pattern `{pattern}`: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Run coordination failures.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("a {0} run is already in progress")]
    AlreadyRunning(&'static str),

    #[error("run task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// A per-item problem recorded during a run. Never aborts the run.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("{board} search error ({query}, page {page}): {error}")]
    Search {
        board: Source,
        query: String,
        page: usize,
        #[source]
        error: FetchError,
    },

    #[error("{board} detail error ({url}): {error}")]
    Detail {
        board: Source,
        url: String,
        #[source]
        error: FetchError,
    },

    #[error("refresh error ({board} job {id}): {error}")]
    Refresh {
        board: Source,
        id: i64,
        #[source]
        error: FetchError,
    },

    #[error("storage error ({context}): {error}")]
    Storage {
        context: String,
        #[source]
        error: StoreError,
    },

    #[error("{0} run cancelled")]
    Cancelled(&'static str),
}

/// Crate-level error for operations that can fail as a whole.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Coordinator(#[from] CoordinatorError),
}

pub type Result<T> = std::result::Result<T, Error>;
