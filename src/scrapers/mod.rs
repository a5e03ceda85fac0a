//! Per-board scrapers and the orchestrator that drives them.
//!
//! Each board module describes *what* to look for: its search queries, its
//! extraction chain and its detail-page profile. The [`orchestrator`] owns
//! *how* a run proceeds: paging, politeness delays, deduplication and the
//! enrichment pass.
//!
//! | Source | Module | Search pages | Extraction |
//! |--------|--------|--------------|------------|
//! | Seek | [`seek`] | `page=N` on a results url | embedded JSON, then cards |
//! | LinkedIn | [`linkedin`] | guest search API, `start=N*size` | cards |

pub mod linkedin;
pub mod orchestrator;
pub mod seek;

use crate::config::Config;
use crate::enrich::DetailExtractor;
use crate::error::ConfigError;
use crate::extract::StrategyChain;
use crate::models::Source;

/// One configured search against a board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchQuery {
    /// A full results url; later pages add a `page` parameter.
    Url(String),
    /// A guest-API search paged by result offset.
    Guest {
        keywords: String,
        location: String,
        page_size: usize,
    },
}

impl SearchQuery {
    /// Short human-readable form for logs and error messages.
    pub fn label(&self) -> String {
        match self {
            SearchQuery::Url(url) => url.clone(),
            SearchQuery::Guest { keywords, location, .. } => format!("{keywords} in {location}"),
        }
    }

    /// Address of results page `page`, counting from zero.
    pub fn page_url(&self, page: usize) -> String {
        match self {
            SearchQuery::Url(url) => seek::page_url(url, page),
            SearchQuery::Guest {
                keywords,
                location,
                page_size,
            } => linkedin::search_url(keywords, location, page * page_size),
        }
    }
}

/// The searches a source runs and how far each one pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPlan {
    pub queries: Vec<SearchQuery>,
    pub max_pages: usize,
}

/// Everything the orchestrator needs to scrape one board.
pub struct SourceScraper {
    pub source: Source,
    pub chain: StrategyChain,
    pub detail: DetailExtractor,
    pub plan: SearchPlan,
}

impl SourceScraper {
    pub fn new(
        source: Source,
        chain: StrategyChain,
        detail: DetailExtractor,
        plan: SearchPlan,
    ) -> Result<Self, ConfigError> {
        if plan.queries.is_empty() {
            return Err(ConfigError::NoQueries(source));
        }
        Ok(Self {
            source,
            chain,
            detail,
            plan,
        })
    }

    /// Build the scraper for `source` from its configuration section.
    pub fn for_source(source: Source, config: &Config) -> Result<Self, ConfigError> {
        match source {
            Source::Seek => seek::scraper(&config.seek),
            Source::LinkedIn => linkedin::scraper(&config.linkedin),
        }
    }
}

/// Detail-page extractor for a source, independent of its search config.
pub fn detail_extractor(source: Source) -> Result<DetailExtractor, ConfigError> {
    match source {
        Source::Seek => seek::detail(),
        Source::LinkedIn => linkedin::detail(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guest_query_pages_by_offset() {
        let query = SearchQuery::Guest {
            keywords: "rust developer".to_string(),
            location: "Melbourne".to_string(),
            page_size: 25,
        };
        assert_eq!(query.label(), "rust developer in Melbourne");
        assert!(query.page_url(0).contains("start=0"));
        assert!(query.page_url(2).contains("start=50"));
    }

    #[test]
    fn test_for_source_uses_config_section() {
        let config = Config::default();
        let seek = SourceScraper::for_source(Source::Seek, &config).unwrap();
        assert_eq!(seek.plan.queries.len(), 3);
        assert_eq!(seek.chain.strategy_names(), vec!["structured-data", "markup-cards"]);

        let linkedin = SourceScraper::for_source(Source::LinkedIn, &config).unwrap();
        assert_eq!(linkedin.plan.max_pages, 3);
        assert_eq!(linkedin.chain.strategy_names(), vec!["markup-cards"]);
        assert_eq!(linkedin.detail.source(), Source::LinkedIn);
    }
}
