//! Integration configuration.

use std::env;

use sitesearch_shared::SearchField;

/// Default number of documents per bulk batch.
const DEFAULT_BATCH_SIZE: usize = 350;

/// Default HTML tag wrapping highlighted fragments.
const DEFAULT_HIGHLIGHT_TAG: &str = "mark";

/// Configuration for the integration engine.
///
/// Injected by the host; the engine reads it but never persists or
/// edits it. `enabled` is the single process-wide switch; callers can
/// override it per request through `QueryRequest::integration`.
#[derive(Debug, Clone)]
pub struct IntegrationConfig {
    /// Process-wide integration switch consulted by the eligibility
    /// function.
    pub enabled: bool,
    /// Bulk batch size bound for sync flushes.
    pub batch_size: usize,
    /// Statuses a post query filters to when the request names none.
    pub default_statuses: Vec<String>,
    /// Weighted field set for free-text search.
    pub search_boosts: Vec<(SearchField, f32)>,
    /// Tag name wrapping highlighted fragments.
    pub highlight_tag: String,
}

impl Default for IntegrationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            batch_size: DEFAULT_BATCH_SIZE,
            default_statuses: vec!["publish".to_string()],
            search_boosts: vec![
                (SearchField::Title, 2.0),
                (SearchField::Excerpt, 1.0),
                (SearchField::Body, 1.0),
            ],
            highlight_tag: DEFAULT_HIGHLIGHT_TAG.to_string(),
        }
    }
}

impl IntegrationConfig {
    /// Build a configuration from environment variables, falling back to
    /// the documented defaults.
    ///
    /// # Environment Variables
    ///
    /// - `SITESEARCH_ENABLED`: process-wide switch (default: true)
    /// - `SITESEARCH_BATCH_SIZE`: bulk batch bound (default: 350)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            enabled: env::var("SITESEARCH_ENABLED")
                .ok()
                .map(|v| v != "0" && !v.eq_ignore_ascii_case("false"))
                .unwrap_or(defaults.enabled),
            batch_size: env::var("SITESEARCH_BATCH_SIZE")
                .ok()
                .and_then(|s| s.parse::<usize>().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.batch_size),
            ..defaults
        }
    }

    /// The boost weight for a search field, when configured.
    pub fn boost_for(&self, field: SearchField) -> Option<f32> {
        self.search_boosts
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, boost)| *boost)
    }
}
