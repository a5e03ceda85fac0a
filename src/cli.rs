//! Command-line interface definitions.
//!
//! Global options can also come from the environment.

use clap::{Parser, Subcommand};
use job_harvest::Source;
use std::path::PathBuf;

/// Scrape Seek and LinkedIn job postings into SQLite.
///
/// # Examples
///
/// ```sh
/// # Full fetch with the built-in Melbourne searches
/// job_harvest fetch
///
/// # Re-fetch detail pages for up to 20 LinkedIn jobs
/// job_harvest --config harvest.yaml refresh --source linkedin --limit 20
///
/// # Show the run log
/// job_harvest runs --limit 5
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a YAML config file
    #[arg(short, long, global = true, env = "JOB_HARVEST_CONFIG")]
    pub config: Option<PathBuf>,

    /// SQLite database path, overriding the config file
    #[arg(short, long, global = true, env = "JOB_HARVEST_DB")]
    pub database: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Scrape every enabled source and store new jobs
    Fetch,

    /// Re-fetch detail pages for jobs missing a description or score
    Refresh {
        /// Only refresh jobs from this source (seek, linkedin)
        #[arg(short, long)]
        source: Option<Source>,

        /// Maximum number of jobs to revisit
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Print the most recent fetch log entries
    Runs {
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },
}
