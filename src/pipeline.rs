//! The two operations exposed to callers: a full fetch across every enabled
//! source, and a refresh pass over stored jobs that still lack a description
//! or a relevance score.

use crate::config::Config;
use crate::enrich::DetailExtractor;
use crate::error::{ConfigError, Error, ScrapeError};
use crate::models::{Detail, InsertOutcome, JobRecord, RefreshReport, RunLog, Source, SourceReport};
use crate::progress::ProgressSink;
use crate::scrapers::orchestrator::Orchestrator;
use crate::scrapers::{SourceScraper, detail_extractor};
use crate::store::JobStore;
use crate::transport::{Fetcher, Pacer};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

pub struct Pipeline {
    config: Config,
    fetcher: Arc<dyn Fetcher>,
    store: Arc<dyn JobStore>,
    pacer: Pacer,
    scrapers: Vec<SourceScraper>,
    details: HashMap<Source, DetailExtractor>,
}

impl Pipeline {
    /// Validate `config` and build the scrapers for every enabled source.
    pub fn new(config: Config, fetcher: Arc<dyn Fetcher>, store: Arc<dyn JobStore>) -> Result<Self, Error> {
        config.validate()?;
        let scrapers = Source::ALL
            .into_iter()
            .filter(|source| config.is_enabled(*source))
            .map(|source| SourceScraper::for_source(source, &config))
            .collect::<Result<Vec<_>, _>>()?;
        let details = Source::ALL
            .into_iter()
            .map(|source| detail_extractor(source).map(|extractor| (source, extractor)))
            .collect::<Result<HashMap<_, _>, ConfigError>>()?;
        Ok(Self {
            pacer: Pacer::new(config.delay)?,
            config,
            fetcher,
            store,
            scrapers,
            details,
        })
    }

    /// Override the politeness pacer derived from the config.
    pub fn with_pacer(mut self, pacer: Pacer) -> Self {
        self.pacer = pacer;
        self
    }

    /// Scrape every enabled source and store the new jobs.
    ///
    /// Sources run one after the other. Each yields a report with its found,
    /// new and error counts, which is also written to the run log.
    #[instrument(level = "info", skip_all)]
    pub async fn run_full_fetch(
        &self,
        progress: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<Vec<SourceReport>, Error> {
        let orchestrator = Orchestrator::new(self.fetcher.as_ref(), self.pacer, cancel);
        let mut reports = Vec::with_capacity(self.scrapers.len());

        for scraper in &self.scrapers {
            if cancel.is_cancelled() && !reports.is_empty() {
                break;
            }
            let source = scraper.source;
            let outcome = orchestrator.run(scraper, progress).await;
            let mut report = SourceReport {
                source,
                found: outcome.records.len(),
                new: 0,
                errors: outcome.error_messages(),
            };

            progress.stage(&format!("saving {source} jobs"));
            for record in &outcome.records {
                match self.store.insert_if_new(record).await {
                    Ok(InsertOutcome::Inserted(_)) => report.new += 1,
                    Ok(InsertOutcome::AlreadyExists) => {}
                    Err(error) => {
                        warn!(%source, external_id = %record.external_id, error = %error, "Failed to store job");
                        let error = ScrapeError::Storage {
                            context: format!("{source} job {}", record.external_id),
                            error,
                        };
                        report.errors.push(error.to_string());
                    }
                }
            }

            if let Err(error) = self.store.log_run(&RunLog::from_report(&report)).await {
                warn!(%source, error = %error, "Failed to write run log");
                let error = ScrapeError::Storage {
                    context: format!("{source} run log"),
                    error,
                };
                report.errors.push(error.to_string());
            }

            info!(
                %source,
                found = report.found,
                new = report.new,
                errors = report.errors.len(),
                "Source finished"
            );
            reports.push(report);
        }
        Ok(reports)
    }

    /// Re-fetch detail pages for stored jobs missing a description or score.
    ///
    /// A job is rewritten only when its page yields a new, non-empty
    /// description; rewriting clears its relevance score.
    #[instrument(level = "info", skip(self, progress, cancel))]
    pub async fn run_refresh(
        &self,
        source: Option<Source>,
        progress: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<RefreshReport, Error> {
        let jobs = self
            .store
            .jobs_missing_detail_or_score(source, self.config.refresh_limit)
            .await?;
        let total = jobs.len();
        let mut report = RefreshReport::default();
        info!(total, "Refreshing stored jobs");

        progress.stage("refreshing jobs");
        for (i, job) in jobs.iter().enumerate() {
            if cancel.is_cancelled() {
                report.errors.push(ScrapeError::Cancelled("refresh").to_string());
                break;
            }
            progress.progress(i, total);

            let record = &job.record;
            let Some(extractor) = self.details.get(&record.source) else {
                continue;
            };
            if record.url.is_empty() {
                continue;
            }
            report.checked += 1;

            match extractor.enrich(self.fetcher.as_ref(), &record.url).await {
                Ok(detail) => {
                    if let Some((description, salary)) = refresh_update(record, &detail) {
                        match self
                            .store
                            .update_description(job.id, &description, salary.as_deref())
                            .await
                        {
                            Ok(()) => report.updated += 1,
                            Err(error) => {
                                warn!(id = job.id, error = %error, "Failed to update job");
                                let error = ScrapeError::Storage {
                                    context: format!("update job {}", job.id),
                                    error,
                                };
                                report.errors.push(error.to_string());
                            }
                        }
                    }
                }
                Err(error) => {
                    warn!(id = job.id, url = %record.url, error = %error, "Refresh fetch failed");
                    let error = ScrapeError::Refresh {
                        board: record.source,
                        id: job.id,
                        error,
                    };
                    report.errors.push(error.to_string());
                }
            }
            self.pacer.pause_unless_cancelled(cancel).await;
        }

        info!(
            checked = report.checked,
            updated = report.updated,
            errors = report.errors.len(),
            "Refresh finished"
        );
        Ok(report)
    }
}

/// What a refresh should write back for `stored`, if anything.
///
/// Only a non-empty description that differs from the stored one triggers a
/// write. A salary rides along when the stored one is empty.
pub fn refresh_update(stored: &JobRecord, detail: &Detail) -> Option<(String, Option<String>)> {
    let description = detail.description.trim();
    if description.is_empty() || description == stored.description.trim() {
        return None;
    }
    let salary = (stored.salary.trim().is_empty() && !detail.salary.trim().is_empty())
        .then(|| detail.salary.trim().to_string());
    Some((description.to_string(), salary))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored(description: &str, salary: &str) -> JobRecord {
        let mut record = JobRecord::summary(Source::LinkedIn, "1", "https://www.linkedin.com/jobs/view/1");
        record.description = description.to_string();
        record.salary = salary.to_string();
        record
    }

    fn detail(description: &str, salary: &str) -> Detail {
        Detail {
            description: description.to_string(),
            salary: salary.to_string(),
        }
    }

    #[test]
    fn test_refresh_update_requires_new_description() {
        assert_eq!(refresh_update(&stored("", ""), &detail("", "$100k - $120k")), None);
        assert_eq!(refresh_update(&stored("Same", ""), &detail("Same", "")), None);
        assert_eq!(
            refresh_update(&stored("Old", ""), &detail("New", "")),
            Some(("New".to_string(), None))
        );
    }

    #[test]
    fn test_refresh_update_fills_only_empty_salary() {
        assert_eq!(
            refresh_update(&stored("", ""), &detail("Full", "$90k - $100k")),
            Some(("Full".to_string(), Some("$90k - $100k".to_string())))
        );
        assert_eq!(
            refresh_update(&stored("", "$80k"), &detail("Full", "$90k - $100k")),
            Some(("Full".to_string(), None))
        );
    }
}
