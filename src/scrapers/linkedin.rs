//! LinkedIn guest job search.
//!
//! The unauthenticated `seeMoreJobPostings` endpoint returns bare result cards
//! as an HTML fragment, 25 per call, paged by `start` offset. Results are
//! limited to the past week and to remote or hybrid roles.

use super::{SearchPlan, SearchQuery, SourceScraper};
use crate::config::LinkedInConfig;
use crate::enrich::{DetailExtractor, DetailProfile};
use crate::error::ConfigError;
use crate::extract::{CardLayout, MarkupStrategy, StrategyChain};
use crate::models::Source;

pub const GUEST_SEARCH_URL: &str = "https://www.linkedin.com/jobs-guest/jobs/api/seeMoreJobPostings/search";

/// Posted in the last seven days.
const POSTED_WITHIN: &str = "r604800";
/// Remote (2) and hybrid (3) workplace types.
const WORKPLACE_TYPES: &str = "2,3";

pub const CARDS: CardLayout = CardLayout {
    cards: &["div.base-card", r#"div[class*="base-card"]"#, "li"],
    link: &[
        "a.base-card__full-link",
        r#"a[href*="linkedin.com/jobs/view"]"#,
        r#"a[href*="/jobs/view/"]"#,
    ],
    id_pattern: r"/jobs/view/(?:[^/?#]*-)?(\d+)/?(?:[?#]|$)",
    id_falls_back_to_url: true,
    url_from_id: false,
    title: &["h3.base-search-card__title", "span.sr-only"],
    company: &["h4.base-search-card__subtitle", "a.hidden-nested-link"],
    location: &["span.job-search-card__location"],
    salary: &[r#"[class*="job-search-card__salary"]"#],
    teaser: &[],
    posted: &["time"],
};

pub const DETAIL: DetailProfile = DetailProfile {
    description: &[
        "div.show-more-less-html__markup",
        "div.description__text",
        "section.description",
    ],
    salary: &[],
    salary_from_text: true,
};

pub fn chain() -> Result<StrategyChain, ConfigError> {
    Ok(StrategyChain::new(Source::LinkedIn).then(MarkupStrategy::new(Source::LinkedIn, &CARDS)?))
}

pub fn detail() -> Result<DetailExtractor, ConfigError> {
    DetailExtractor::new(Source::LinkedIn, &DETAIL)
}

pub fn scraper(config: &LinkedInConfig) -> Result<SourceScraper, ConfigError> {
    let plan = SearchPlan {
        queries: config
            .searches
            .iter()
            .map(|search| SearchQuery::Guest {
                keywords: search.keywords.clone(),
                location: search.location.clone(),
                page_size: config.page_size,
            })
            .collect(),
        max_pages: config.max_pages,
    };
    SourceScraper::new(Source::LinkedIn, chain()?, detail()?, plan)
}

pub fn search_url(keywords: &str, location: &str, start: usize) -> String {
    format!(
        "{GUEST_SEARCH_URL}?keywords={}&location={}&start={start}&f_TPR={POSTED_WITHIN}&f_WT={}",
        urlencoding::encode(keywords),
        urlencoding::encode(location),
        urlencoding::encode(WORKPLACE_TYPES),
    )
}
