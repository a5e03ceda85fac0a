//! Detail-page enrichment.
//!
//! A summary record carries at most a teaser. Enrichment fetches the job's
//! own page and recovers the full description and, where possible, the
//! salary. Sources are tried most-authoritative first:
//!
//! 1. A `JobPosting` block in `application/ld+json`
//! 2. Any long description-like string in embedded JSON
//! 3. The source's known description containers
//! 4. A currency-range scan of the description text, for boards that do not
//!    publish salary as data

use crate::error::{ConfigError, FetchError};
use crate::extract::clean_salary;
use crate::extract::structured::script_payloads;
use crate::models::{Detail, Source};
use crate::transport::Fetcher;
use crate::utils::{block_text, html_to_text, looks_like_html};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use serde_json::{Map, Value};
use tracing::{debug, instrument};

/// Embedded-JSON strings shorter than this are teasers or placeholders.
pub const MIN_DESCRIPTION_LEN: usize = 100;

/// Depth bound for the embedded-JSON description search.
pub const DESCRIPTION_MAX_DEPTH: usize = 12;

const DESCRIPTION_KEYS: &[&str] = &["description", "content", "jobDetail", "jobDescription"];

static LD_JSON: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"script[type="application/ld+json"]"#).expect("static selector"));

static SALARY_RANGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\$[\d,]+(?:\.\d+)?k?\s*[-–]\s*\$[\d,]+(?:\.\d+)?k?(?:\s*(?:\+\s*super(?:annuation)?|per\s+(?:annum|year)|p\.?a\.?|base))?",
    )
    .expect("static regex")
});

/// Where a source keeps its detail content in markup.
#[derive(Debug, Clone, Copy)]
pub struct DetailProfile {
    pub description: &'static [&'static str],
    pub salary: &'static [&'static str],
    /// Scan the description for a currency range when no salary was found.
    pub salary_from_text: bool,
}

/// Compiled per-source detail extraction.
#[derive(Debug, Clone)]
pub struct DetailExtractor {
    source: Source,
    description: Vec<Selector>,
    salary: Vec<Selector>,
    salary_from_text: bool,
}

impl DetailExtractor {
    pub fn new(source: Source, profile: &DetailProfile) -> Result<Self, ConfigError> {
        let compile = |patterns: &[&str]| {
            patterns
                .iter()
                .map(|p| {
                    Selector::parse(p).map_err(|e| ConfigError::Selector {
                        selector: p.to_string(),
                        reason: e.to_string(),
                    })
                })
                .collect::<Result<Vec<_>, _>>()
        };
        Ok(Self {
            source,
            description: compile(profile.description)?,
            salary: compile(profile.salary)?,
            salary_from_text: profile.salary_from_text,
        })
    }

    pub fn source(&self) -> Source {
        self.source
    }

    /// Fetch a job's detail page and extract what it offers.
    #[instrument(level = "info", skip(self, fetcher), fields(source = %self.source))]
    pub async fn enrich(&self, fetcher: &dyn Fetcher, url: &str) -> Result<Detail, FetchError> {
        let body = fetcher.fetch(self.source, url).await?;
        let detail = self.extract(&body);
        debug!(
            description_len = detail.description.len(),
            has_salary = !detail.salary.is_empty(),
            "Extracted detail"
        );
        Ok(detail)
    }

    /// Run the fallback order over a fetched detail page.
    pub fn extract(&self, raw: &str) -> Detail {
        let page = Html::parse_document(raw);
        let mut detail = job_posting(&page).unwrap_or_default();

        if detail.description.is_empty() {
            detail.description = script_payloads(&page)
                .iter()
                .find_map(|payload| find_description(payload, 0, DESCRIPTION_MAX_DEPTH))
                .unwrap_or_default();
        }
        if detail.description.is_empty() {
            detail.description = first_block(&page, &self.description);
        }
        if detail.salary.is_empty() {
            detail.salary = first_block(&page, &self.salary).replace('\n', " ");
        }
        if detail.salary.is_empty() && self.salary_from_text {
            detail.salary = salary_in_text(&detail.description).unwrap_or_default();
        }
        detail.salary = clean_salary(&detail.salary);
        detail
    }
}

fn first_block(page: &Html, selectors: &[Selector]) -> String {
    selectors
        .iter()
        .flat_map(|selector| page.select(selector))
        .map(block_text)
        .find(|text| !text.is_empty())
        .unwrap_or_default()
}

/// Description and salary from a schema.org `JobPosting` block.
pub fn job_posting(page: &Html) -> Option<Detail> {
    for script in page.select(&LD_JSON) {
        let text: String = script.text().collect();
        let Ok(value) = serde_json::from_str::<Value>(text.trim()) else {
            debug!("Skipping unparseable ld+json block");
            continue;
        };
        if let Some(posting) = ld_candidates(&value).into_iter().find(|obj| is_job_posting(obj)) {
            let description = posting
                .get("description")
                .and_then(Value::as_str)
                .map(html_to_text)
                .unwrap_or_default();
            let salary = posting.get("baseSalary").and_then(salary_range).unwrap_or_default();
            return Some(Detail { description, salary });
        }
    }
    None
}

fn ld_candidates(value: &Value) -> Vec<&Map<String, Value>> {
    match value {
        Value::Array(items) => items.iter().flat_map(ld_candidates).collect(),
        Value::Object(map) => {
            let mut out = vec![map];
            if let Some(graph) = map.get("@graph") {
                out.extend(ld_candidates(graph));
            }
            out
        }
        _ => Vec::new(),
    }
}

fn is_job_posting(obj: &Map<String, Value>) -> bool {
    match obj.get("@type") {
        Some(Value::String(t)) => t == "JobPosting",
        Some(Value::Array(types)) => types.iter().any(|t| t.as_str() == Some("JobPosting")),
        _ => false,
    }
}

/// `"$min - $max"` from a `MonetaryAmount`, or `"$min"` with no maximum.
fn salary_range(base_salary: &Value) -> Option<String> {
    let value = base_salary.get("value")?;
    let (min, max) = match value {
        Value::Object(range) => (
            range.get("minValue").and_then(format_amount),
            range.get("maxValue").and_then(format_amount),
        ),
        other => (format_amount(other), None),
    };
    match (min, max) {
        (Some(min), Some(max)) => Some(format!("${min} - ${max}")),
        (Some(min), None) => Some(format!("${min}")),
        (None, Some(max)) => Some(format!("${max}")),
        (None, None) => None,
    }
}

fn format_amount(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => {
            let amount = n.as_f64()?;
            if amount <= 0.0 {
                None
            } else if amount.fract() == 0.0 {
                Some(group_thousands(amount as u64))
            } else {
                Some(format!("{amount:.2}"))
            }
        }
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Depth-bounded search for a substantial description string.
pub fn find_description(value: &Value, depth: usize, max_depth: usize) -> Option<String> {
    if depth > max_depth {
        return None;
    }
    match value {
        Value::Object(map) => {
            let direct = DESCRIPTION_KEYS
                .iter()
                .filter_map(|k| map.get(*k).and_then(Value::as_str))
                .find(|s| s.len() > MIN_DESCRIPTION_LEN);
            if let Some(text) = direct {
                return Some(if looks_like_html(text) {
                    html_to_text(text)
                } else {
                    text.trim().to_string()
                });
            }
            map.values().find_map(|v| find_description(v, depth + 1, max_depth))
        }
        Value::Array(items) => items.iter().find_map(|v| find_description(v, depth + 1, max_depth)),
        _ => None,
    }
}

/// First currency range mentioned in free text.
pub fn salary_in_text(text: &str) -> Option<String> {
    SALARY_RANGE.find(text).map(|m| m.as_str().trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PROFILE: DetailProfile = DetailProfile {
        description: &[r#"[data-automation="jobAdDetails"]"#, "div.description"],
        salary: &[r#"[data-automation="job-detail-salary"]"#],
        salary_from_text: false,
    };

    fn extractor(salary_from_text: bool) -> DetailExtractor {
        DetailExtractor::new(
            Source::Seek,
            &DetailProfile {
                salary_from_text,
                ..PROFILE
            },
        )
        .unwrap()
    }

    #[test]
    fn test_job_posting_block_wins() {
        let html = r#"<html><head><script type="application/ld+json">
            {"@context":"https://schema.org","@type":"JobPosting","title":"Rust Dev",
             "description":"<p>Build things.</p><ul><li>Rust</li><li>SQL</li></ul>",
             "baseSalary":{"@type":"MonetaryAmount","currency":"AUD",
               "value":{"@type":"QuantitativeValue","minValue":140000,"maxValue":160000}}}
            </script></head><body><div data-automation="jobAdDetails">Markup text</div></body></html>"#;
        let detail = extractor(false).extract(html);
        assert_eq!(detail.description, "Build things.\nRust\nSQL");
        assert_eq!(detail.salary, "$140,000 - $160,000");
    }

    #[test]
    fn test_job_posting_inside_graph_array() {
        let html = r#"<script type="application/ld+json">
            [{"@type":"Organization","name":"Acme"},
             {"@graph":[{"@type":["JobPosting"],"description":"Plain text role",
               "baseSalary":{"value":{"minValue":90000.5}}}]}]
            </script>"#;
        let detail = extractor(false).extract(html);
        assert_eq!(detail.description, "Plain text role");
        assert_eq!(detail.salary, "$90000.50");
    }

    #[test]
    fn test_embedded_json_description_needs_substance() {
        let long = "x".repeat(150);
        let html = format!(
            r#"<script type="application/json">{{"job":{{"description":"too short","detail":{{"content":"<p>{long}</p>"}}}}}}</script>"#
        );
        let detail = extractor(false).extract(&html);
        assert_eq!(detail.description, long);
    }

    #[test]
    fn test_falls_back_to_selectors() {
        let html = r#"<div class="description"><p>Line one</p><p>Line two</p></div>
            <span data-automation="job-detail-salary">$120,000 – $130,000 per year</span>"#;
        let detail = extractor(false).extract(html);
        assert_eq!(detail.description, "Line one\nLine two");
        assert_eq!(detail.salary, "$120,000 – $130,000 per year");
    }

    #[test]
    fn test_salary_scan_only_when_enabled() {
        let html = r#"<div class="description">Package: $120k - $140k + super, hybrid.</div>"#;
        assert_eq!(extractor(true).extract(html).salary, "$120k - $140k + super");
        assert_eq!(extractor(false).extract(html).salary, "");
    }

    #[test]
    fn test_empty_page_yields_empty_detail() {
        assert!(extractor(true).extract("<html><body></body></html>").is_empty());
    }

    #[test]
    fn test_salary_in_text_variants() {
        assert_eq!(
            salary_in_text("Paying $95,000 - $110,000 per annum plus bonus").as_deref(),
            Some("$95,000 - $110,000 per annum")
        );
        assert_eq!(salary_in_text("$150k–$170k p.a.").as_deref(), Some("$150k–$170k p.a."));
        assert_eq!(salary_in_text("Competitive salary"), None);
    }

    #[test]
    fn test_find_description_respects_depth() {
        let text = "d".repeat(200);
        let mut value = json!({ "description": text });
        for _ in 0..DESCRIPTION_MAX_DEPTH + 1 {
            value = json!({ "wrap": value });
        }
        assert_eq!(find_description(&value, 0, DESCRIPTION_MAX_DEPTH), None);
        assert!(find_description(&value, 0, DESCRIPTION_MAX_DEPTH + 1).is_some());
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(1234567), "1,234,567");
    }
}
