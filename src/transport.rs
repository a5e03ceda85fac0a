//! HTTP transport with per-source identity profiles and politeness pacing.
//!
//! The transport never retries. A failed request surfaces as a
//! [`FetchError`] carrying the url, and the orchestrator decides whether to
//! move on.
//!
//! Browser-like profiles also shape the TLS handshake after desktop Chrome
//! (cipher-suite preference, key-exchange groups, `h2` ALPN). rustls cannot
//! send GREASE values or permute extensions, so the ClientHello is close to
//! Chrome's but not byte-identical.

use crate::config::{CHROME_USER_AGENT, Config, DelayRange};
use crate::error::{ConfigError, FetchError};
use crate::models::Source;
use async_trait::async_trait;
use rand::{Rng, rng};
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderName, HeaderValue};
use rustls::crypto::{CryptoProvider, ring};
use rustls::{ClientConfig, RootCertStore};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

/// Headers and client behaviour presented to one job board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityProfile {
    pub user_agent: String,
    pub accept: String,
    pub accept_language: String,
    /// Send the navigation headers a desktop browser sends and keep cookies
    /// across requests, the way a browser session would.
    pub browser_like: bool,
    pub extra_headers: BTreeMap<String, String>,
}

impl Default for IdentityProfile {
    fn default() -> Self {
        Self::plain()
    }
}

impl IdentityProfile {
    pub fn plain() -> Self {
        Self {
            user_agent: CHROME_USER_AGENT.to_string(),
            accept: "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8".to_string(),
            accept_language: "en-AU,en;q=0.9".to_string(),
            browser_like: false,
            extra_headers: BTreeMap::new(),
        }
    }

    pub fn browser() -> Self {
        Self {
            browser_like: true,
            ..Self::plain()
        }
    }

    fn header_map(&self, source: Source) -> Result<HeaderMap, FetchError> {
        let invalid = |reason: String| FetchError::Client { board: source, reason };

        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_str(&self.accept).map_err(|e| invalid(e.to_string()))?,
        );
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_str(&self.accept_language).map_err(|e| invalid(e.to_string()))?,
        );
        if self.browser_like {
            for (name, value) in [
                ("upgrade-insecure-requests", "1"),
                ("sec-fetch-dest", "document"),
                ("sec-fetch-mode", "navigate"),
                ("sec-fetch-site", "none"),
                ("sec-fetch-user", "?1"),
            ] {
                headers.insert(HeaderName::from_static(name), HeaderValue::from_static(value));
            }
        }
        for (name, value) in &self.extra_headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| invalid(e.to_string()))?;
            let value = HeaderValue::from_str(value).map_err(|e| invalid(e.to_string()))?;
            headers.insert(name, value);
        }
        Ok(headers)
    }
}

/// Fetches raw page content on behalf of a source.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// GET `url` using the identity profile configured for `source`.
    async fn fetch(&self, source: Source, url: &str) -> Result<String, FetchError>;
}

/// `reqwest`-backed fetcher holding one client per source.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    clients: HashMap<Source, reqwest::Client>,
}

impl HttpFetcher {
    /// Build clients for every source from the configured identity profiles.
    pub fn from_config(config: &Config) -> Result<Self, FetchError> {
        let mut clients = HashMap::new();
        for source in Source::ALL {
            let client = build_client(source, config.identity(source), config.request_timeout())?;
            clients.insert(source, client);
        }
        Ok(Self { clients })
    }
}

fn build_client(
    source: Source,
    profile: &IdentityProfile,
    timeout: Duration,
) -> Result<reqwest::Client, FetchError> {
    let client_error = |reason: String| FetchError::Client { board: source, reason };

    let mut builder = reqwest::Client::builder()
        .user_agent(profile.user_agent.clone())
        .default_headers(profile.header_map(source)?)
        .cookie_store(profile.browser_like)
        .gzip(true)
        .timeout(timeout);
    if profile.browser_like {
        let tls = browser_tls_config().map_err(|e| client_error(e.to_string()))?;
        builder = builder.use_preconfigured_tls(tls);
    }
    builder.build().map_err(|e| client_error(e.to_string()))
}

/// rustls client config ordered the way desktop Chrome offers its handshake.
pub fn browser_tls_config() -> Result<ClientConfig, rustls::Error> {
    use rustls::crypto::ring::cipher_suite::*;

    let provider = CryptoProvider {
        cipher_suites: vec![
            TLS13_AES_128_GCM_SHA256,
            TLS13_AES_256_GCM_SHA384,
            TLS13_CHACHA20_POLY1305_SHA256,
            TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256,
            TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256,
            TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384,
            TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384,
            TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305_SHA256,
            TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256,
        ],
        kx_groups: vec![
            ring::kx_group::X25519,
            ring::kx_group::SECP256R1,
            ring::kx_group::SECP384R1,
        ],
        ..ring::default_provider()
    };
    let roots: RootCertStore = webpki_roots::TLS_SERVER_ROOTS.iter().cloned().collect();

    let mut config = ClientConfig::builder_with_provider(Arc::new(provider))
        .with_protocol_versions(&[&rustls::version::TLS13, &rustls::version::TLS12])?
        .with_root_certificates(roots)
        .with_no_client_auth();
    config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];
    Ok(config)
}

fn classify(url: &str, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout { url: url.to_string() }
    } else {
        FetchError::Request {
            url: url.to_string(),
            source: error,
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    #[instrument(level = "debug", skip(self))]
    async fn fetch(&self, source: Source, url: &str) -> Result<String, FetchError> {
        let client = self.clients.get(&source).ok_or_else(|| FetchError::Client {
            board: source,
            reason: "no client configured".to_string(),
        })?;

        let t0 = Instant::now();
        let response = client.get(url).send().await.map_err(|e| classify(url, e))?;
        let status = response.status();
        if !status.is_success() {
            warn!(%url, status = status.as_u16(), "Non-success response");
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|e| classify(url, e))?;
        debug!(
            %url,
            bytes = body.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Fetched page"
        );
        Ok(body)
    }
}

/// Randomized pause inserted after every outbound request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pacer {
    min_secs: f64,
    max_secs: f64,
}

impl Pacer {
    pub fn new(range: DelayRange) -> Result<Self, ConfigError> {
        let (min, max) = range.bounds()?;
        Ok(Self {
            min_secs: min.as_secs_f64(),
            max_secs: max.as_secs_f64().max(min.as_secs_f64()),
        })
    }

    /// A pacer that never sleeps, for tests and local fixtures.
    pub fn disabled() -> Self {
        Self {
            min_secs: 0.0,
            max_secs: 0.0,
        }
    }

    /// Draw the next delay uniformly from the configured range.
    pub fn next_delay(&self) -> Duration {
        if self.max_secs <= 0.0 {
            return Duration::ZERO;
        }
        if self.max_secs - self.min_secs < f64::EPSILON {
            return Duration::from_secs_f64(self.min_secs);
        }
        Duration::from_secs_f64(rng().random_range(self.min_secs..=self.max_secs))
    }

    pub async fn pause(&self) {
        let delay = self.next_delay();
        if delay.is_zero() {
            return;
        }
        debug!(?delay, "Politeness delay");
        sleep(delay).await;
    }

    /// [`Pacer::pause`], cut short once `cancel` fires.
    pub async fn pause_unless_cancelled(&self, cancel: &CancellationToken) {
        tokio::select! {
            _ = cancel.cancelled() => {}
            _ = self.pause() => {}
        }
    }
}
