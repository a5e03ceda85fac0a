//! Drives one source through search, deduplication and enrichment.
//!
//! Nothing that goes wrong at page or job granularity stops a run. Failed
//! search pages end that query's paging; failed detail pages leave the record
//! as a summary. Every such problem is returned as a [`ScrapeError`] next to
//! the records that were gathered.

use super::{SearchQuery, SourceScraper};
use crate::error::{FetchError, ScrapeError};
use crate::models::JobRecord;
use crate::progress::ProgressSink;
use crate::transport::{Fetcher, Pacer};
use itertools::Itertools;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Records gathered from one source plus every non-fatal problem met on the way.
#[derive(Debug, Default)]
pub struct ScrapeOutcome {
    pub records: Vec<JobRecord>,
    pub errors: Vec<ScrapeError>,
}

impl ScrapeOutcome {
    pub fn error_messages(&self) -> Vec<String> {
        self.errors.iter().map(|e| e.to_string()).collect()
    }
}

pub struct Orchestrator<'a> {
    fetcher: &'a dyn Fetcher,
    pacer: Pacer,
    cancel: &'a CancellationToken,
}

impl<'a> Orchestrator<'a> {
    pub fn new(fetcher: &'a dyn Fetcher, pacer: Pacer, cancel: &'a CancellationToken) -> Self {
        Self { fetcher, pacer, cancel }
    }

    /// Search every configured query, dedupe, then enrich each summary.
    #[instrument(level = "info", skip_all, fields(source = %scraper.source))]
    pub async fn run(&self, scraper: &SourceScraper, progress: &dyn ProgressSink) -> ScrapeOutcome {
        let mut outcome = self.search(scraper, progress).await;
        if self.cancel.is_cancelled() {
            return outcome;
        }
        self.enrich(scraper, &mut outcome, progress).await;
        outcome
    }

    /// Collect deduplicated summaries from every query's result pages.
    pub async fn search(&self, scraper: &SourceScraper, progress: &dyn ProgressSink) -> ScrapeOutcome {
        let source = scraper.source;
        let max_pages = scraper.plan.max_pages.max(1);
        let total = scraper.plan.queries.len() * max_pages;
        let mut outcome = ScrapeOutcome::default();
        let mut found = Vec::new();
        let mut step = 0;

        progress.stage(&format!("searching {source}"));
        'queries: for query in &scraper.plan.queries {
            for page in 0..max_pages {
                if self.cancel.is_cancelled() {
                    outcome.errors.push(ScrapeError::Cancelled(source.as_str()));
                    break 'queries;
                }
                progress.progress(step, total);
                step += 1;

                let url = query.page_url(page);
                let fetched = self.fetcher.fetch(source, &url).await;
                self.pacer.pause_unless_cancelled(self.cancel).await;

                let body = match fetched {
                    Ok(body) => body,
                    Err(error) => {
                        warn!(%source, query = %query.label(), page, error = %error, "Search page failed");
                        outcome.errors.push(search_error(scraper, query, page, error));
                        break;
                    }
                };
                let jobs = scraper.chain.extract(&body);
                if jobs.is_empty() {
                    debug!(%source, query = %query.label(), page, "No more results");
                    break;
                }
                found.extend(jobs);
            }
        }

        let before = found.len();
        outcome.records = found.into_iter().unique_by(|r| r.external_id.clone()).collect();
        info!(
            %source,
            found = before,
            unique = outcome.records.len(),
            "Search finished"
        );
        outcome
    }

    /// Fetch each record's detail page and layer its content over the summary.
    ///
    /// On cancellation the remaining records are kept as summaries.
    pub async fn enrich(&self, scraper: &SourceScraper, outcome: &mut ScrapeOutcome, progress: &dyn ProgressSink) {
        let source = scraper.source;
        let total = outcome.records.len();
        let mut enriched = 0;

        progress.stage(&format!("fetching {source} details"));
        for (i, record) in outcome.records.iter_mut().enumerate() {
            if self.cancel.is_cancelled() {
                outcome.errors.push(ScrapeError::Cancelled(source.as_str()));
                break;
            }
            progress.progress(i, total);
            if record.url.is_empty() {
                continue;
            }

            match scraper.detail.enrich(self.fetcher, &record.url).await {
                Ok(detail) => {
                    if record.apply_detail(&detail) {
                        enriched += 1;
                    }
                }
                Err(error) => {
                    warn!(%source, url = %record.url, error = %error, "Detail fetch failed; keeping summary");
                    outcome.errors.push(ScrapeError::Detail {
                        board: source,
                        url: record.url.clone(),
                        error,
                    });
                }
            }
            self.pacer.pause_unless_cancelled(self.cancel).await;
        }
        info!(%source, total, enriched, "Enrichment finished");
    }
}

fn search_error(
    scraper: &SourceScraper,
    query: &SearchQuery,
    page: usize,
    error: FetchError,
) -> ScrapeError {
    ScrapeError::Search {
        board: scraper.source,
        query: query.label(),
        page,
        error,
    }
}
