//! Job summaries from card-like markup.
//!
//! A [`CardLayout`] lists, for every piece of a search-result card, the
//! selectors to try in priority order: the most specific, source-stable
//! pattern first, broader fallbacks after it. Card selectors end in a generic
//! element so that a redesign degrades to a noisier scan instead of nothing.

use super::{ExtractionStrategy, clean_salary};
use crate::error::ConfigError;
use crate::models::{JobRecord, Source};
use crate::utils::inline_text;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

/// Declarative description of a board's result cards.
#[derive(Debug, Clone, Copy)]
pub struct CardLayout {
    /// Card containers, most specific first.
    pub cards: &'static [&'static str],
    /// Links to the job's detail page within a card.
    pub link: &'static [&'static str],
    /// Pattern applied to the link's `href`; capture group 1 is the posting id.
    pub id_pattern: &'static str,
    /// Use the detail url itself as the id when `id_pattern` does not match.
    pub id_falls_back_to_url: bool,
    /// Build the record url from the id rather than keeping the link's href.
    pub url_from_id: bool,
    /// Title selectors; the link text is used when none match.
    pub title: &'static [&'static str],
    pub company: &'static [&'static str],
    pub location: &'static [&'static str],
    pub salary: &'static [&'static str],
    pub teaser: &'static [&'static str],
    /// Posted-date selectors; a `datetime` attribute wins over text.
    pub posted: &'static [&'static str],
}

/// Compiled selector list, kept with its source text for logging.
#[derive(Debug, Clone)]
struct Selectors(Vec<(&'static str, Selector)>);

impl Selectors {
    fn parse(patterns: &[&'static str]) -> Result<Self, ConfigError> {
        patterns
            .iter()
            .map(|pattern| {
                Selector::parse(pattern)
                    .map(|selector| (*pattern, selector))
                    .map_err(|e| ConfigError::Selector {
                        selector: pattern.to_string(),
                        reason: e.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Selectors)
    }

    /// Inline text of the first matching element that has any.
    fn first_text(&self, scope: ElementRef<'_>) -> String {
        self.0
            .iter()
            .flat_map(|(_, selector)| scope.select(selector))
            .map(inline_text)
            .find(|text| !text.is_empty())
            .unwrap_or_default()
    }
}

/// Scans a page for result cards described by a [`CardLayout`].
#[derive(Debug, Clone)]
pub struct MarkupStrategy {
    source: Source,
    base: Url,
    cards: Selectors,
    link: Selectors,
    id_pattern: Regex,
    id_falls_back_to_url: bool,
    url_from_id: bool,
    title: Selectors,
    company: Selectors,
    location: Selectors,
    salary: Selectors,
    teaser: Selectors,
    posted: Selectors,
}

impl MarkupStrategy {
    pub fn new(source: Source, layout: &CardLayout) -> Result<Self, ConfigError> {
        let base = Url::parse(source.base_url()).map_err(|e| ConfigError::Selector {
            selector: source.base_url().to_string(),
            reason: e.to_string(),
        })?;
        let id_pattern = Regex::new(layout.id_pattern).map_err(|source| ConfigError::Pattern {
            pattern: layout.id_pattern.to_string(),
            source,
        })?;
        Ok(Self {
            source,
            base,
            cards: Selectors::parse(layout.cards)?,
            link: Selectors::parse(layout.link)?,
            id_pattern,
            id_falls_back_to_url: layout.id_falls_back_to_url,
            url_from_id: layout.url_from_id,
            title: Selectors::parse(layout.title)?,
            company: Selectors::parse(layout.company)?,
            location: Selectors::parse(layout.location)?,
            salary: Selectors::parse(layout.salary)?,
            teaser: Selectors::parse(layout.teaser)?,
            posted: Selectors::parse(layout.posted)?,
        })
    }

    fn parse_card(&self, card: ElementRef<'_>) -> Option<JobRecord> {
        let links: Vec<(ElementRef<'_>, &str)> = self
            .link
            .0
            .iter()
            .flat_map(|(_, selector)| card.select(selector))
            .filter_map(|a| a.value().attr("href").map(|href| (a, href)))
            .collect();

        // The first link carrying an id wins; a card whose links carry none
        // falls back to its first link only when the layout allows it.
        let identified = links.iter().find_map(|&(a, href)| {
            let id = self.id_pattern.captures(href)?.get(1)?;
            Some((a, href, Some(id.as_str().to_string())))
        });
        let (link, href, id) = match identified {
            Some(found) => found,
            None if self.id_falls_back_to_url => {
                let &(a, href) = links.first()?;
                (a, href, None)
            }
            None => return None,
        };

        let mut resolved = self.base.join(href).ok()?;
        resolved.set_query(None);
        resolved.set_fragment(None);
        let href_url = resolved.to_string();
        let external_id = id.unwrap_or_else(|| href_url.clone());

        let mut title = self.title.first_text(card);
        if title.is_empty() {
            title = inline_text(link);
        }
        if title.is_empty() {
            return None;
        }

        let url = if self.url_from_id {
            self.source.detail_url(&external_id)
        } else {
            href_url
        };
        let mut record = JobRecord::summary(self.source, external_id, url);
        record.title = title;
        record.company = self.company.first_text(card);
        record.location = self.location.first_text(card);
        record.salary = clean_salary(&self.salary.first_text(card));
        record.description = self.teaser.first_text(card);
        record.posted_date = self.posted_date(card);
        Some(record)
    }

    fn posted_date(&self, card: ElementRef<'_>) -> String {
        self.posted
            .0
            .iter()
            .flat_map(|(_, selector)| card.select(selector))
            .map(|el| match el.value().attr("datetime") {
                Some(dt) if !dt.trim().is_empty() => dt.trim().to_string(),
                _ => inline_text(el),
            })
            .find(|text| !text.is_empty())
            .unwrap_or_default()
    }
}

impl ExtractionStrategy for MarkupStrategy {
    fn name(&self) -> &'static str {
        "markup-cards"
    }

    fn extract(&self, page: &Html) -> Vec<JobRecord> {
        for (pattern, selector) in &self.cards.0 {
            let cards: Vec<ElementRef<'_>> = page.select(selector).collect();
            if cards.is_empty() {
                continue;
            }
            let total = cards.len();
            let jobs: Vec<JobRecord> = cards.into_iter().filter_map(|card| self.parse_card(card)).collect();
            debug!(
                source = %self.source,
                selector = pattern,
                cards = total,
                jobs = jobs.len(),
                skipped = total - jobs.len(),
                "Card selector matched"
            );
            return jobs;
        }
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LAYOUT: CardLayout = CardLayout {
        cards: &["article.job", "div.card", "li"],
        link: &["a.title", "a[href*=\"/job/\"]"],
        id_pattern: r"/job/(\d+)",
        id_falls_back_to_url: false,
        url_from_id: true,
        title: &[],
        company: &[".company", "span.org"],
        location: &[".where"],
        salary: &[".pay"],
        teaser: &["p.teaser"],
        posted: &["time", ".date"],
    };

    fn strategy() -> MarkupStrategy {
        MarkupStrategy::new(Source::Seek, &LAYOUT).unwrap()
    }

    #[test]
    fn test_parses_cards_with_all_fields() {
        let html = r#"<article class="job">
                <a class="title" href="/job/42?ref=search">Rust  Engineer</a>
                <span class="org">Acme</span>
                <span class="where">Melbourne VIC</span>
                <span class="pay">$150k</span>
                <p class="teaser">Own the ingest path.</p>
                <time datetime="2026-10-10T00:00:00Z">8d ago</time>
            </article>"#;
        let jobs = strategy().extract(&Html::parse_document(html));
        assert_eq!(jobs.len(), 1);
        let job = &jobs[0];
        assert_eq!(job.external_id, "42");
        assert_eq!(job.title, "Rust Engineer");
        assert_eq!(job.company, "Acme");
        assert_eq!(job.location, "Melbourne VIC");
        assert_eq!(job.salary, "$150k");
        assert_eq!(job.description, "Own the ingest path.");
        assert_eq!(job.posted_date, "2026-10-10T00:00:00Z");
        assert_eq!(job.url, "https://www.seek.com.au/job/42");
    }

    #[test]
    fn test_missing_fields_are_empty() {
        let html = r#"<article class="job"><a href="/job/7">Tester</a></article>"#;
        let jobs = strategy().extract(&Html::parse_document(html));
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].company, "");
        assert_eq!(jobs[0].salary, "");
        assert_eq!(jobs[0].posted_date, "");
    }

    #[test]
    fn test_cards_without_link_are_skipped() {
        let html = r#"
            <article class="job"><span class="company">Ad slot</span></article>
            <article class="job"><a href="/about">About us</a></article>
            <article class="job"><a href="/job/9">Real job</a></article>"#;
        let jobs = strategy().extract(&Html::parse_document(html));
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].external_id, "9");
    }

    #[test]
    fn test_link_with_id_wins_over_earlier_links() {
        let html = r#"<article class="job">
                <a href="/job/guide">Search tips</a>
                <a href="/job/31">Data Engineer</a>
            </article>"#;
        let jobs = strategy().extract(&Html::parse_document(html));
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].external_id, "31");
        assert_eq!(jobs[0].title, "Data Engineer");
    }

    #[test]
    fn test_first_matching_card_selector_wins() {
        let html = r#"
            <div class="card"><a href="/job/1">From div</a></div>
            <ul><li><a href="/job/2">From li</a></li></ul>"#;
        let jobs = strategy().extract(&Html::parse_document(html));
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].external_id, "1");
    }

    #[test]
    fn test_generic_fallback_is_used_last() {
        let html = r#"<ul><li><a href="/job/2">From li</a><span class="date">2d ago</span></li></ul>"#;
        let jobs = strategy().extract(&Html::parse_document(html));
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].external_id, "2");
        assert_eq!(jobs[0].posted_date, "2d ago");
    }

    #[test]
    fn test_href_url_and_id_fallback() {
        let layout = CardLayout {
            id_pattern: r"/view/(\d+)",
            id_falls_back_to_url: true,
            url_from_id: false,
            link: &["a"],
            ..LAYOUT
        };
        let strategy = MarkupStrategy::new(Source::LinkedIn, &layout).unwrap();
        let html = r#"
            <li><a href="https://au.linkedin.com/jobs/view/555?trk=x">Numbered</a></li>
            <li><a href="https://au.linkedin.com/jobs/view/slug-only?trk=y">Slugged</a></li>"#;
        let jobs = strategy.extract(&Html::parse_document(html));
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].external_id, "555");
        assert_eq!(jobs[0].url, "https://au.linkedin.com/jobs/view/555");
        assert_eq!(jobs[1].external_id, "https://au.linkedin.com/jobs/view/slug-only");
    }

    #[test]
    fn test_invalid_selector_is_a_config_error() {
        let layout = CardLayout {
            cards: &["article[[["],
            ..LAYOUT
        };
        assert!(matches!(
            MarkupStrategy::new(Source::Seek, &layout),
            Err(ConfigError::Selector { .. })
        ));
    }
}
