//! Ordered fallback extraction of job summaries from search-result pages.
//!
//! Each source declares a [`StrategyChain`]: an ordered list of
//! [`ExtractionStrategy`] implementations. The page is parsed once and handed
//! to each strategy in turn; the first one that yields at least one record
//! wins and the rest are never consulted.
//!
//! | Strategy | Module | Reads |
//! |----------|--------|-------|
//! | Structured data | [`structured`] | JSON embedded in `<script>` blocks |
//! | Markup cards | [`markup`] | Card elements matched by prioritized selectors |
//!
//! A page nothing recognizes is logged and yields an empty list; that is the
//! normal "no more results" signal for pagination, not an error.

pub mod markup;
pub mod structured;

use crate::models::{JobRecord, Source};
use crate::utils::truncate_for_log;
use scraper::Html;
use tracing::{debug, info, instrument};

pub use markup::{CardLayout, MarkupStrategy};
pub use structured::StructuredDataStrategy;

/// One way of turning a parsed page into summary records.
pub trait ExtractionStrategy: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Extract every job summary this strategy recognizes. Malformed parts of
    /// the page are skipped; an unrecognized page yields an empty list.
    fn extract(&self, page: &Html) -> Vec<JobRecord>;
}

/// First-non-empty-wins reducer over a source's strategies.
pub struct StrategyChain {
    source: Source,
    strategies: Vec<Box<dyn ExtractionStrategy>>,
}

impl StrategyChain {
    pub fn new(source: Source) -> Self {
        Self {
            source,
            strategies: Vec::new(),
        }
    }

    /// Append a strategy; strategies run in the order they were added.
    pub fn then(mut self, strategy: impl ExtractionStrategy + 'static) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Parse raw page content and run the chain over it.
    #[instrument(level = "debug", skip_all, fields(source = %self.source, bytes = raw.len()))]
    pub fn extract(&self, raw: &str) -> Vec<JobRecord> {
        let page = Html::parse_document(raw);
        for strategy in &self.strategies {
            let jobs = strategy.extract(&page);
            if !jobs.is_empty() {
                info!(
                    source = %self.source,
                    strategy = strategy.name(),
                    count = jobs.len(),
                    "Extracted job summaries"
                );
                return jobs;
            }
            debug!(strategy = strategy.name(), "Strategy found nothing; falling back");
        }
        debug!(
            source = %self.source,
            preview = %truncate_for_log(raw, 200),
            "No strategy recognized the page"
        );
        Vec::new()
    }
}

/// Seek shows an "Add expected salary" prompt where no salary is advertised.
pub fn clean_salary(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.to_lowercase().starts_with("add expected salary") {
        String::new()
    } else {
        trimmed.to_string()
    }
}
