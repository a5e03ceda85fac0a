//! Scrape configuration loaded from YAML.
//!
//! Every key is optional; omitted keys fall back to the defaults below, which
//! target software roles in Melbourne.
//!
//! ```yaml
//! database: jobs.db
//! request_timeout_secs: 15
//! delay: { min_secs: 2, max_secs: 5 }
//! seek:
//!   search_urls:
//!     - https://www.seek.com.au/rust-jobs/in-Melbourne-VIC?daterange=7
//! linkedin:
//!   max_pages: 2
//!   searches:
//!     - { keywords: rust developer, location: "Melbourne, Victoria, Australia" }
//! ```

use crate::error::ConfigError;
use crate::models::Source;
use crate::transport::IdentityProfile;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{info, instrument};

pub const CHROME_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path of the SQLite database file.
    pub database: String,
    /// Per-request timeout applied by the transport layer.
    pub request_timeout_secs: u64,
    /// Politeness delay range between outbound requests.
    pub delay: DelayRange,
    /// Maximum number of stored jobs revisited by one refresh pass.
    pub refresh_limit: usize,
    pub seek: SeekConfig,
    pub linkedin: LinkedInConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: "jobs.db".to_string(),
            request_timeout_secs: 15,
            delay: DelayRange::default(),
            refresh_limit: 50,
            seek: SeekConfig::default(),
            linkedin: LinkedInConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DelayRange {
    pub min_secs: f64,
    pub max_secs: f64,
}

impl Default for DelayRange {
    fn default() -> Self {
        Self {
            min_secs: 2.0,
            max_secs: 5.0,
        }
    }
}

impl DelayRange {
    /// Both ends as durations. Negative, non-finite or out-of-range values
    /// are rejected.
    pub fn bounds(&self) -> Result<(Duration, Duration), ConfigError> {
        let secs = |field: &'static str, value: f64| {
            Duration::try_from_secs_f64(value).map_err(|_| ConfigError::InvalidDelay { field, value })
        };
        Ok((secs("min_secs", self.min_secs)?, secs("max_secs", self.max_secs)?))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeekConfig {
    pub enabled: bool,
    /// Full search-results URLs; further pages add `page=N`.
    pub search_urls: Vec<String>,
    pub max_pages: usize,
    pub identity: IdentityProfile,
}

impl Default for SeekConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            search_urls: vec![
                "https://www.seek.com.au/software-engineer-jobs/in-Melbourne-VIC?daterange=7".to_string(),
                "https://www.seek.com.au/software-developer-jobs/in-Melbourne-VIC?daterange=7".to_string(),
                "https://www.seek.com.au/python-developer-jobs/in-Melbourne-VIC?daterange=7".to_string(),
            ],
            max_pages: 1,
            identity: IdentityProfile::browser(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkedInConfig {
    pub enabled: bool,
    pub searches: Vec<LinkedInSearch>,
    pub max_pages: usize,
    pub page_size: usize,
    pub identity: IdentityProfile,
}

impl Default for LinkedInConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            searches: vec![
                LinkedInSearch::new("software engineer", "Melbourne, Victoria, Australia"),
                LinkedInSearch::new("software developer", "Melbourne, Victoria, Australia"),
            ],
            max_pages: 3,
            page_size: 25,
            identity: IdentityProfile::plain(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedInSearch {
    pub keywords: String,
    pub location: String,
}

impl LinkedInSearch {
    pub fn new(keywords: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            keywords: keywords.into(),
            location: location.into(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file, or defaults when no path is given.
    #[instrument(level = "info")]
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.display().to_string(),
                    source,
                })?;
                let config = Self::from_yaml(&raw)?;
                info!(path = %path.display(), "Loaded configuration");
                config
            }
            None => {
                info!("No config file given; using defaults");
                Self::default()
            }
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, ConfigError> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(raw)?)
    }

    /// Reject configurations no run could succeed with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        self.delay.bounds()?;
        if self.delay.min_secs > self.delay.max_secs {
            return Err(ConfigError::DelayRange {
                min: self.delay.min_secs,
                max: self.delay.max_secs,
            });
        }
        if self.seek.enabled && self.seek.search_urls.is_empty() {
            return Err(ConfigError::NoQueries(Source::Seek));
        }
        if self.linkedin.enabled && self.linkedin.searches.is_empty() {
            return Err(ConfigError::NoQueries(Source::LinkedIn));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn identity(&self, source: Source) -> &IdentityProfile {
        match source {
            Source::Seek => &self.seek.identity,
            Source::LinkedIn => &self.linkedin.identity,
        }
    }

    pub fn is_enabled(&self, source: Source) -> bool {
        match source {
            Source::Seek => self.seek.enabled,
            Source::LinkedIn => self.linkedin.enabled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.request_timeout(), Duration::from_secs(15));
        assert_eq!(config.linkedin.page_size, 25);
        assert_eq!(config.seek.max_pages, 1);
        assert!(config.seek.identity.browser_like);
        assert!(!config.linkedin.identity.browser_like);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = Config::from_yaml(
            r#"
request_timeout_secs: 30
delay: { min_secs: 0.5, max_secs: 1.5 }
linkedin:
  max_pages: 5
  searches:
    - { keywords: rust, location: Sydney }
"#,
        )
        .unwrap();
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.linkedin.max_pages, 5);
        assert_eq!(config.linkedin.page_size, 25);
        assert_eq!(config.linkedin.searches, vec![LinkedInSearch::new("rust", "Sydney")]);
        assert_eq!(config.seek, SeekConfig::default());
        assert_eq!(config.database, "jobs.db");
    }

    #[test]
    fn test_empty_yaml_is_default() {
        assert_eq!(Config::from_yaml("").unwrap(), Config::default());
    }

    #[test]
    fn test_enabled_source_without_queries_is_rejected() {
        let config = Config::from_yaml("seek:\n  search_urls: []\n").unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::NoQueries(Source::Seek))));

        let disabled = Config::from_yaml("seek:\n  enabled: false\n  search_urls: []\n").unwrap();
        assert!(disabled.validate().is_ok());
    }

    #[test]
    fn test_inverted_delay_is_rejected() {
        let config = Config::from_yaml("delay: { min_secs: 5, max_secs: 1 }\n").unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::DelayRange { .. })));
    }

    #[test]
    fn test_unusable_delays_are_rejected() {
        for yaml in [
            "delay: { min_secs: 1e300, max_secs: 1e300 }\n",
            "delay: { min_secs: -1, max_secs: 2 }\n",
            "delay: { min_secs: 0, max_secs: .inf }\n",
            "delay: { min_secs: .nan, max_secs: 1 }\n",
        ] {
            let config = Config::from_yaml(yaml).unwrap();
            assert!(
                matches!(config.validate(), Err(ConfigError::InvalidDelay { .. })),
                "{yaml}"
            );
        }
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let config = Config::from_yaml("request_timeout_secs: 0\n").unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::ZeroTimeout)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "database: /tmp/harvest.db\nrefresh_limit: 10").unwrap();
        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.database, "/tmp/harvest.db");
        assert_eq!(config.refresh_limit, 10);
    }

    #[test]
    fn test_load_missing_file_fails() {
        let err = Config::load(Some(Path::new("/nonexistent/harvest.yaml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
