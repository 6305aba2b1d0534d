//! Engine connection and limit configuration.

use std::env;
use std::time::Duration;

/// Default engine endpoint.
const DEFAULT_ENDPOINT: &str = "http://localhost:9200";

/// Default index name prefix.
const DEFAULT_INDEX_PREFIX: &str = "sitesearch-";

/// Default hard per-request timeout in seconds.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Default retry budget for transient failures.
const DEFAULT_MAX_RETRIES: usize = 3;

/// Configuration for the engine client facade.
///
/// Consumed, not owned: the engine reads this but never persists or
/// edits it.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Engine endpoint URL.
    pub endpoint: String,
    /// Optional basic-auth credentials.
    pub username: Option<String>,
    pub password: Option<String>,
    /// Prefix for every index/alias name, ahead of the tenant ID.
    pub index_prefix: String,
    /// Hard timeout applied to every engine request.
    pub request_timeout: Duration,
    /// Retry attempts for transient (connection/5xx) failures.
    pub max_retries: usize,
    /// Base delay of the exponential backoff between retries.
    pub retry_base_delay: Duration,
    /// Cap on the backoff delay.
    pub retry_max_delay: Duration,
    /// Deepest `from + size` the engine serves without cursor paging.
    pub max_result_window: usize,
    /// Largest page size a single query may request; larger values are
    /// clamped.
    pub max_page_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            username: None,
            password: None,
            index_prefix: DEFAULT_INDEX_PREFIX.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_base_delay: Duration::from_millis(100),
            retry_max_delay: Duration::from_secs(2),
            max_result_window: 10_000,
            max_page_size: 1_000,
        }
    }
}

impl EngineConfig {
    /// Build a configuration from environment variables, falling back to
    /// the documented defaults.
    ///
    /// # Environment Variables
    ///
    /// - `SITESEARCH_ENGINE_URL`: engine endpoint (default: http://localhost:9200)
    /// - `SITESEARCH_ENGINE_USERNAME` / `SITESEARCH_ENGINE_PASSWORD`: basic auth
    /// - `SITESEARCH_INDEX_PREFIX`: index name prefix (default: "sitesearch-")
    /// - `SITESEARCH_REQUEST_TIMEOUT_SECS`: per-request timeout (default: 10)
    /// - `SITESEARCH_MAX_RETRIES`: transient retry budget (default: 3)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            endpoint: env::var("SITESEARCH_ENGINE_URL").unwrap_or(defaults.endpoint),
            username: env::var("SITESEARCH_ENGINE_USERNAME").ok(),
            password: env::var("SITESEARCH_ENGINE_PASSWORD").ok(),
            index_prefix: env::var("SITESEARCH_INDEX_PREFIX").unwrap_or(defaults.index_prefix),
            request_timeout: env::var("SITESEARCH_REQUEST_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
            max_retries: env::var("SITESEARCH_MAX_RETRIES")
                .ok()
                .and_then(|s| s.parse::<usize>().ok())
                .unwrap_or(defaults.max_retries),
            ..defaults
        }
    }

    /// Set basic-auth credentials.
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }
}
