//! Seek (seek.com.au) search and detail layouts.
//!
//! Seek renders results client-side and ships the search state as embedded
//! JSON, so structured data is tried before the result cards. Requests go out
//! with the browser-like identity profile; the plain one gets bot-blocked.

use super::{SearchPlan, SearchQuery, SourceScraper};
use crate::config::SeekConfig;
use crate::enrich::{DetailExtractor, DetailProfile};
use crate::error::ConfigError;
use crate::extract::{CardLayout, MarkupStrategy, StrategyChain, StructuredDataStrategy};
use crate::models::Source;
use url::Url;

pub const CARDS: CardLayout = CardLayout {
    cards: &[
        r#"article[data-testid="job-card"]"#,
        r#"[data-card-type="JobCard"]"#,
        "article",
    ],
    link: &[r#"a[data-automation="jobTitle"]"#, r#"a[href*="/job/"]"#],
    id_pattern: r"/job/(\d+)",
    id_falls_back_to_url: false,
    url_from_id: true,
    title: &[r#"[data-automation="jobTitle"]"#],
    company: &[
        r#"[data-testid="company-name"]"#,
        r#"a[data-type="company"]"#,
        r#"[data-automation="jobCompany"]"#,
    ],
    location: &[
        r#"[data-testid="job-location"]"#,
        r#"a[data-type="location"]"#,
        r#"[data-automation="jobLocation"]"#,
    ],
    salary: &[r#"[data-testid="job-salary"]"#, r#"[data-automation="jobSalary"]"#],
    teaser: &[
        r#"[data-testid="job-teaser"]"#,
        r#"span[class*="teaser"]"#,
        r#"[data-automation="jobShortDescription"]"#,
    ],
    posted: &[
        "time",
        r#"[data-testid="listing-date"]"#,
        r#"[data-automation="jobListingDate"]"#,
    ],
};

pub const DETAIL: DetailProfile = DetailProfile {
    description: &[
        r#"[data-automation="jobAdDetails"]"#,
        r#"[data-automation="jobDescription"]"#,
        r#"div[class*="jobAdDetails"]"#,
        r#"div[class*="job-description"]"#,
    ],
    salary: &[r#"[data-automation="job-detail-salary"]"#],
    salary_from_text: false,
};

pub fn chain() -> Result<StrategyChain, ConfigError> {
    Ok(StrategyChain::new(Source::Seek)
        .then(StructuredDataStrategy::new(Source::Seek))
        .then(MarkupStrategy::new(Source::Seek, &CARDS)?))
}

pub fn detail() -> Result<DetailExtractor, ConfigError> {
    DetailExtractor::new(Source::Seek, &DETAIL)
}

pub fn scraper(config: &SeekConfig) -> Result<SourceScraper, ConfigError> {
    let plan = SearchPlan {
        queries: config.search_urls.iter().cloned().map(SearchQuery::Url).collect(),
        max_pages: config.max_pages,
    };
    SourceScraper::new(Source::Seek, chain()?, detail()?, plan)
}

/// Results page `page` (zero-based) of a Seek search url.
pub fn page_url(search_url: &str, page: usize) -> String {
    if page == 0 {
        return search_url.to_string();
    }
    let number = (page + 1).to_string();
    match Url::parse(search_url) {
        Ok(mut url) => {
            let kept: Vec<(String, String)> = url
                .query_pairs()
                .filter(|(k, _)| k != "page")
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect();
            url.query_pairs_mut()
                .clear()
                .extend_pairs(kept)
                .append_pair("page", &number);
            url.to_string()
        }
        Err(_) => {
            let sep = if search_url.contains('?') { '&' } else { '?' };
            format!("{search_url}{sep}page={number}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_url_adds_page_number() {
        let base = "https://www.seek.com.au/rust-jobs/in-Melbourne-VIC?daterange=7";
        assert_eq!(page_url(base, 0), base);
        assert_eq!(
            page_url(base, 1),
            "https://www.seek.com.au/rust-jobs/in-Melbourne-VIC?daterange=7&page=2"
        );
        assert_eq!(
            page_url("https://www.seek.com.au/rust-jobs?page=9", 2),
            "https://www.seek.com.au/rust-jobs?page=3"
        );
    }

    #[test]
    fn test_search_page_prefers_structured_data() {
        let html = r#"<html><body>
            <script>window.SEEK_REDUX_DATA = {"results":{"jobs":[
                {"id":"50001","title":"Data Engineer","advertiser":{"id":"9","description":"Acme"}}
            ]}};</script>
            <article data-testid="job-card"><a data-automation="jobTitle" href="/job/60001">Card Only</a></article>
        </body></html>"#;
        let jobs = chain().unwrap().extract(html);
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].external_id, "50001");
        assert_eq!(jobs[0].company, "Acme");
    }

    #[test]
    fn test_search_page_falls_back_to_cards() {
        let html = r#"<html><body>
            <article data-testid="job-card">
                <a data-automation="jobTitle" href="/job/60001?type=standout">Senior Rust Engineer</a>
                <a data-type="company" href="/Acme-jobs">Acme</a>
                <a data-type="location" href="/jobs/in-Melbourne">Melbourne VIC</a>
                <span data-testid="job-salary">$160,000 – $180,000 per year</span>
                <span data-testid="job-teaser">Lead our ingest team.</span>
                <span data-automation="jobListingDate">3d ago</span>
            </article>
        </body></html>"#;
        let jobs = chain().unwrap().extract(html);
        assert_eq!(jobs.len(), 1);
        let job = &jobs[0];
        assert_eq!(job.external_id, "60001");
        assert_eq!(job.title, "Senior Rust Engineer");
        assert_eq!(job.company, "Acme");
        assert_eq!(job.location, "Melbourne VIC");
        assert_eq!(job.salary, "$160,000 – $180,000 per year");
        assert_eq!(job.description, "Lead our ingest team.");
        assert_eq!(job.posted_date, "3d ago");
        assert_eq!(job.url, "https://www.seek.com.au/job/60001");
    }

    #[test]
    fn test_generic_article_skips_links_without_id() {
        let html = r#"<html><body>
            <article><a href="/job/search-tips">Tips</a><a href="/job/777">Real Job</a></article>
        </body></html>"#;
        let jobs = chain().unwrap().extract(html);
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].external_id, "777");
        assert_eq!(jobs[0].title, "Real Job");
        assert_eq!(jobs[0].url, "https://www.seek.com.au/job/777");
    }

    #[test]
    fn test_scraper_requires_queries() {
        let config = SeekConfig {
            search_urls: vec![],
            ..SeekConfig::default()
        };
        assert!(matches!(scraper(&config), Err(ConfigError::NoQueries(Source::Seek))));
    }
}
