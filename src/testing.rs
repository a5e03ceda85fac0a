//! Scripted collaborators for tests and offline runs.

use crate::error::FetchError;
use crate::models::Source;
use crate::transport::Fetcher;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, RwLock};

/// What a scripted url answers with.
#[derive(Debug, Clone)]
pub enum Scripted {
    Body(String),
    Status(u16),
    Timeout,
}

/// [`Fetcher`] serving canned responses keyed by exact url.
///
/// Urls that were never scripted answer `404`. Every request is recorded.
#[derive(Debug, Default)]
pub struct ScriptedFetcher {
    pages: RwLock<HashMap<String, Scripted>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(self, url: &str, body: impl Into<String>) -> Self {
        self.script(url, Scripted::Body(body.into()));
        self
    }

    pub fn with_status(self, url: &str, status: u16) -> Self {
        self.script(url, Scripted::Status(status));
        self
    }

    pub fn with_timeout(self, url: &str) -> Self {
        self.script(url, Scripted::Timeout);
        self
    }

    /// Replace the response for `url` on a shared fetcher.
    pub fn set_page(&self, url: &str, body: impl Into<String>) {
        self.script(url, Scripted::Body(body.into()));
    }

    pub fn script(&self, url: &str, response: Scripted) {
        self.pages
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(url.to_string(), response);
    }

    /// Every url requested so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Number of requests whose url starts with `prefix`.
    pub fn call_count(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|url| url.starts_with(prefix)).count()
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, _source: Source, url: &str) -> Result<String, FetchError> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(url.to_string());
        let response = self
            .pages
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(url)
            .cloned()
            .unwrap_or(Scripted::Status(404));
        match response {
            Scripted::Body(body) => Ok(body),
            Scripted::Status(status) => Err(FetchError::Status {
                url: url.to_string(),
                status,
            }),
            Scripted::Timeout => Err(FetchError::Timeout { url: url.to_string() }),
        }
    }
}
