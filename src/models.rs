//! Data models for scraped job postings and run telemetry.
//!
//! - [`JobRecord`]: the unit of work flowing through the pipeline
//! - [`Detail`]: what a detail-page fetch contributes to a record
//! - [`StoredJob`]: a persisted record plus its scoring state
//! - [`SourceReport`], [`RefreshReport`], [`RunLog`]: run outcomes

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The job board a record was scraped from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Seek,
    LinkedIn,
}

impl Source {
    pub const ALL: [Source; 2] = [Source::Seek, Source::LinkedIn];

    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Seek => "seek",
            Source::LinkedIn => "linkedin",
        }
    }

    /// Origin that relative links on this board resolve against.
    pub fn base_url(&self) -> &'static str {
        match self {
            Source::Seek => "https://www.seek.com.au/",
            Source::LinkedIn => "https://www.linkedin.com/",
        }
    }

    /// Canonical detail-page address for a posting id.
    pub fn detail_url(&self, external_id: &str) -> String {
        match self {
            Source::Seek => format!("https://www.seek.com.au/job/{external_id}"),
            Source::LinkedIn => format!("https://www.linkedin.com/jobs/view/{external_id}"),
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "seek" => Ok(Source::Seek),
            "linkedin" => Ok(Source::LinkedIn),
            other => Err(format!("unknown source `{other}`")),
        }
    }
}

/// A job posting as extracted from a board.
///
/// Born as a *summary* from a search-results page, promoted to a *detailed*
/// record by [`JobRecord::apply_detail`]. `(source, external_id)` is the
/// natural key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    pub source: Source,
    pub external_id: String,
    pub title: String,
    pub company: String,
    pub location: String,
    pub salary: String,
    pub posted_date: String,
    pub description: String,
    pub url: String,
}

impl JobRecord {
    /// Create a summary record with only its identity populated.
    pub fn summary(source: Source, external_id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            source,
            external_id: external_id.into(),
            title: String::new(),
            company: String::new(),
            location: String::new(),
            salary: String::new(),
            posted_date: String::new(),
            description: String::new(),
            url: url.into(),
        }
    }

    /// Layer detail-page content over this record.
    ///
    /// The description is replaced only by non-empty text; salary is filled
    /// only when still empty. Returns `true` if anything changed.
    pub fn apply_detail(&mut self, detail: &Detail) -> bool {
        let description = merge_replace(&self.description, &detail.description);
        let salary = merge_fill(&self.salary, &detail.salary);
        let changed = description != self.description || salary != self.salary;
        self.description = description;
        self.salary = salary;
        changed
    }
}

/// Prefer `new` unless it is empty.
pub fn merge_replace(old: &str, new: &str) -> String {
    if new.trim().is_empty() {
        old.to_string()
    } else {
        new.to_string()
    }
}

/// Keep `old` unless it is empty.
pub fn merge_fill(old: &str, new: &str) -> String {
    if old.trim().is_empty() {
        new.to_string()
    } else {
        old.to_string()
    }
}

/// Description and salary recovered from a job's own page. Either may be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Detail {
    pub description: String,
    pub salary: String,
}

impl Detail {
    pub fn is_empty(&self) -> bool {
        self.description.is_empty() && self.salary.is_empty()
    }
}

/// A persisted record with its row id and scoring state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredJob {
    pub id: i64,
    pub record: JobRecord,
    pub fetched_at: DateTime<Utc>,
    pub relevance_score: Option<f64>,
    pub relevance_explanation: Option<String>,
    pub dismissed: bool,
}

/// Result of a deduplicating insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted(i64),
    AlreadyExists,
}

/// Per-source outcome of a full fetch.
#[derive(Debug, Clone, Serialize)]
pub struct SourceReport {
    pub source: Source,
    pub found: usize,
    pub new: usize,
    pub errors: Vec<String>,
}

/// Outcome of a refresh pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RefreshReport {
    pub checked: usize,
    pub updated: usize,
    pub errors: Vec<String>,
}

/// One row of run telemetry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunLog {
    pub source: Source,
    pub found: usize,
    pub new: usize,
    pub errors: Option<String>,
    pub logged_at: DateTime<Utc>,
}

impl RunLog {
    pub fn from_report(report: &SourceReport) -> Self {
        Self {
            source: report.source,
            found: report.found,
            new: report.new,
            errors: (!report.errors.is_empty()).then(|| report.errors.join("; ")),
            logged_at: Utc::now(),
        }
    }
}
