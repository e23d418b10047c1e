//! Run configuration.
//!
//! One immutable [`Config`] is built per run, from a JSON file plus
//! environment overrides, and passed by reference to the client and the
//! pipeline driver.

use crate::error::{Result, ScopusError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Scopus API base URL
pub const DEFAULT_BASE_URL: &str = "https://api.elsevier.com/content";

/// Documents requested per search page
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Environment variable overriding `api_key`
pub const ENV_API_KEY: &str = "SCOPUS_API_KEY";

/// Environment variable overriding `author_id`
pub const ENV_AUTHOR_ID: &str = "SCOPUS_AUTHOR_ID";

/// What to do when a single document cannot be fetched or normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Stop the run at the first failing document
    #[default]
    Abort,
    /// Log the failure and leave the document out of the report
    Skip,
}

/// On-disk configuration shape. Everything but the credentials is optional.
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    api_key: Option<String>,
    author_id: Option<String>,
    base_url: Option<String>,
    page_size: Option<u32>,
    paginate: Option<bool>,
    concurrency: Option<usize>,
    failure_policy: Option<FailurePolicy>,
    timeout_secs: Option<u64>,
}

/// Run configuration.
#[derive(Clone)]
pub struct Config {
    /// Scopus API key, sent as `X-ELS-APIKey`
    pub api_key: String,
    /// Scopus author identifier the report is about
    pub author_id: String,
    /// API base URL (overridable for proxies and mock servers)
    pub base_url: String,
    /// Page size for the document search
    pub page_size: u32,
    /// Follow search pages past the first one
    pub paginate: bool,
    /// Maximum in-flight document fetches (1 = sequential)
    pub concurrency: usize,
    /// Per-document failure handling
    pub failure_policy: FailurePolicy,
    /// Request timeout
    pub timeout: Duration,
}

impl Config {
    /// Create a configuration with default tuning for the given credentials.
    pub fn new(api_key: impl Into<String>, author_id: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            author_id: author_id.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            paginate: false,
            concurrency: 1,
            failure_policy: FailurePolicy::Abort,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Create a test configuration pointed at a mock server.
    pub fn for_testing(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(5),
            ..Self::new("test-key", "57195963279")
        }
    }

    /// Load the configuration file, apply environment overrides and validate.
    ///
    /// # Errors
    ///
    /// Returns [`ScopusError::Config`] if the file is unreadable, malformed,
    /// or the credentials are missing after overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ScopusError::Config(format!("Cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&content)?
            .with_overrides(
                std::env::var(ENV_API_KEY).ok(),
                std::env::var(ENV_AUTHOR_ID).ok(),
            )
            .validated()
    }

    /// Parse configuration JSON. Missing credentials are tolerated here so
    /// that environment overrides can fill them in; call [`Config::validated`].
    pub fn from_json_str(content: &str) -> Result<Self> {
        let file: ConfigFile = serde_json::from_str(content)
            .map_err(|e| ScopusError::Config(format!("Malformed configuration: {}", e)))?;

        let defaults = Self::new(
            file.api_key.unwrap_or_default(),
            file.author_id.unwrap_or_default(),
        );

        Ok(Self {
            base_url: file
                .base_url
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or(defaults.base_url.clone()),
            page_size: file.page_size.unwrap_or(defaults.page_size),
            paginate: file.paginate.unwrap_or(defaults.paginate),
            concurrency: file.concurrency.unwrap_or(defaults.concurrency),
            failure_policy: file.failure_policy.unwrap_or(defaults.failure_policy),
            timeout: file
                .timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            ..defaults
        })
    }

    /// Replace credentials with non-empty override values.
    #[must_use]
    pub fn with_overrides(mut self, api_key: Option<String>, author_id: Option<String>) -> Self {
        if let Some(key) = api_key.filter(|k| !k.trim().is_empty()) {
            self.api_key = key;
        }
        if let Some(id) = author_id.filter(|i| !i.trim().is_empty()) {
            self.author_id = id;
        }
        self
    }

    /// Check the invariants every run depends on.
    ///
    /// # Errors
    ///
    /// Returns [`ScopusError::Config`] naming the first offending field.
    pub fn validated(mut self) -> Result<Self> {
        self.api_key = self.api_key.trim().to_string();
        self.author_id = self.author_id.trim().to_string();

        if self.api_key.is_empty() {
            return Err(ScopusError::Config(format!(
                "api_key is required (set it in the config file or {})",
                ENV_API_KEY
            )));
        }
        if self.author_id.is_empty() {
            return Err(ScopusError::Config(format!(
                "author_id is required (set it in the config file or {})",
                ENV_AUTHOR_ID
            )));
        }
        if self.page_size == 0 {
            return Err(ScopusError::Config("page_size must be at least 1".to_string()));
        }
        if self.concurrency == 0 {
            return Err(ScopusError::Config("concurrency must be at least 1".to_string()));
        }
        url::Url::parse(&self.base_url)
            .map_err(|e| ScopusError::Config(format!("Invalid base_url {}: {}", self.base_url, e)))?;
        Ok(self)
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &"<redacted>")
            .field("author_id", &self.author_id)
            .field("base_url", &self.base_url)
            .field("page_size", &self.page_size)
            .field("paginate", &self.paginate)
            .field("concurrency", &self.concurrency)
            .field("failure_policy", &self.failure_policy)
            .field("timeout", &self.timeout)
            .finish()
    }
}
