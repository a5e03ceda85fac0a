//! # Job Harvest
//!
//! Scrapes job postings from Seek and LinkedIn into a deduplicated SQLite
//! store.
//!
//! ## Architecture
//!
//! 1. **Search**: fetch result pages per configured query and extract job
//!    summaries through an ordered chain of strategies (embedded JSON first,
//!    card markup second)
//! 2. **Enrich**: fetch each job's own page for the full description and
//!    salary
//! 3. **Store**: insert new jobs keyed by `(source, external_id)` and log the
//!    run
//! 4. **Refresh**: revisit stored jobs that still lack a description or a
//!    relevance score
//!
//! Runs are single-flight through the [`coordinator::Coordinator`], pace every
//! request with a randomized delay and never abort on a bad page or job.

pub mod config;
pub mod coordinator;
pub mod enrich;
pub mod error;
pub mod extract;
pub mod models;
pub mod pipeline;
pub mod progress;
pub mod scrapers;
pub mod store;
pub mod testing;
pub mod transport;
pub mod utils;

pub use config::Config;
pub use coordinator::{Coordinator, RunKind, RunStatus};
pub use error::{Error, Result};
pub use models::{JobRecord, RefreshReport, Source, SourceReport};
pub use pipeline::Pipeline;
