//! Job summaries from JSON embedded in `<script>` blocks.
//!
//! Boards that render client-side ship their search state as JSON, either in
//! a `type="application/json"` block or assigned to a global such as
//! `window.SEEK_REDUX_DATA = {...};`. The layout of that state changes often,
//! so instead of following a fixed path this strategy walks the whole tree
//! looking for objects shaped like a job posting.

use super::{ExtractionStrategy, clean_salary};
use crate::models::{JobRecord, Source};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use serde_json::{Map, Value};
use tracing::debug;

/// Default bound on how deep the search descends into a JSON tree.
pub const DEFAULT_MAX_DEPTH: usize = 10;

const ID_KEYS: &[&str] = &["id", "jobId"];
const TITLE_KEYS: &[&str] = &["title"];
const EMPLOYER_KEYS: &[&str] = &["advertiser", "company", "companyName"];
const LOCATION_KEYS: &[&str] = &["location", "suburb", "locations"];
const SALARY_KEYS: &[&str] = &["salary", "salaryLabel"];
const POSTED_KEYS: &[&str] = &["listingDate", "listedAt"];
const TEASER_KEYS: &[&str] = &["teaser", "abstract"];

/// Sub-keys holding the display text of a nested label object.
const LABEL_KEYS: &[&str] = &["label", "description", "name"];

static SCRIPT: Lazy<Selector> = Lazy::new(|| Selector::parse("script").expect("static selector"));

/// `window.X = {` / `var x = [` style assignments of a JSON literal.
static ASSIGNMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|[;\s])(?:window\.|self\.|var\s+|let\s+|const\s+)?[A-Za-z_$][\w$.]*\s*=\s*([\[{])")
        .expect("static regex")
});

/// Walks embedded JSON for job-shaped objects.
#[derive(Debug, Clone)]
pub struct StructuredDataStrategy {
    source: Source,
    max_depth: usize,
}

impl StructuredDataStrategy {
    pub fn new(source: Source) -> Self {
        Self {
            source,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

impl ExtractionStrategy for StructuredDataStrategy {
    fn name(&self) -> &'static str {
        "structured-data"
    }

    fn extract(&self, page: &Html) -> Vec<JobRecord> {
        let mut jobs = Vec::new();
        for payload in script_payloads(page) {
            let mut found = Vec::new();
            find_job_objects(&payload, 0, self.max_depth, &mut found);
            jobs.extend(found.into_iter().filter_map(|obj| normalize(self.source, obj)));
        }
        jobs
    }
}

/// Every JSON value that can be recovered from the page's script blocks.
///
/// Blocks that are not JSON and contain no JSON assignment are skipped.
pub fn script_payloads(page: &Html) -> Vec<Value> {
    let mut payloads = Vec::new();
    for script in page.select(&SCRIPT) {
        let text: String = script.text().collect();
        let text = text.trim();
        if text.is_empty() {
            continue;
        }
        if let Ok(value) = serde_json::from_str::<Value>(text) {
            payloads.push(value);
            continue;
        }
        let before = payloads.len();
        for caps in ASSIGNMENT.captures_iter(text) {
            let Some(open) = caps.get(1) else { continue };
            if let Some(value) = first_json_value(&text[open.start()..]) {
                payloads.push(value);
            }
        }
        if payloads.len() == before {
            debug!(bytes = text.len(), "Skipping script block without JSON");
        }
    }
    payloads
}

/// Parse the first complete JSON value at the start of `raw`, ignoring
/// whatever script follows it.
fn first_json_value(raw: &str) -> Option<Value> {
    let mut stream = serde_json::Deserializer::from_str(raw).into_iter::<Value>();
    match stream.next() {
        Some(Ok(value)) => Some(value),
        _ => None,
    }
}

/// Depth-bounded search for job-shaped objects.
///
/// Values nested deeper than `max_depth` are ignored. A matched object is
/// collected whole and not searched further.
pub fn find_job_objects<'a>(
    value: &'a Value,
    depth: usize,
    max_depth: usize,
    out: &mut Vec<&'a Map<String, Value>>,
) {
    if depth > max_depth {
        return;
    }
    match value {
        Value::Object(map) if is_job_shaped(map) => out.push(map),
        Value::Object(map) => {
            for child in map.values() {
                find_job_objects(child, depth + 1, max_depth, out);
            }
        }
        Value::Array(items) => {
            for child in items {
                find_job_objects(child, depth + 1, max_depth, out);
            }
        }
        _ => {}
    }
}

fn is_job_shaped(map: &Map<String, Value>) -> bool {
    let present = |keys: &[&str]| keys.iter().any(|k| map.get(*k).is_some_and(|v| !v.is_null()));
    present(ID_KEYS) && present(TITLE_KEYS) && present(EMPLOYER_KEYS)
}

/// Display text of a loosely typed field.
///
/// Strings and numbers are used as-is, arrays contribute their first element,
/// and objects the first non-empty of `sub_keys`.
pub fn label_of(value: &Value, sub_keys: &[&str]) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items.first().map(|v| label_of(v, sub_keys)).unwrap_or_default(),
        Value::Object(map) => sub_keys
            .iter()
            .filter_map(|k| map.get(*k))
            .filter(|v| !v.is_object())
            .map(|v| label_of(v, sub_keys))
            .find(|s| !s.is_empty())
            .unwrap_or_default(),
        Value::Bool(_) | Value::Null => String::new(),
    }
}

fn first_label(map: &Map<String, Value>, keys: &[&str]) -> String {
    keys.iter()
        .filter_map(|k| map.get(*k))
        .map(|v| label_of(v, LABEL_KEYS))
        .find(|s| !s.is_empty())
        .unwrap_or_default()
}

/// Map a job-shaped object onto a summary record.
fn normalize(source: Source, obj: &Map<String, Value>) -> Option<JobRecord> {
    let external_id = first_label(obj, ID_KEYS);
    let title = first_label(obj, TITLE_KEYS);
    if external_id.is_empty() || title.is_empty() {
        debug!(%source, id = %external_id, "Job-shaped object without id or title; skipping");
        return None;
    }

    let url = source.detail_url(&external_id);
    let mut record = JobRecord::summary(source, external_id, url);
    record.title = title;
    record.company = first_label(obj, EMPLOYER_KEYS);
    record.location = first_label(obj, LOCATION_KEYS);
    record.salary = clean_salary(&first_label(obj, SALARY_KEYS));
    record.posted_date = first_label(obj, POSTED_KEYS);
    record.description = first_label(obj, TEASER_KEYS);
    Some(record)
}
