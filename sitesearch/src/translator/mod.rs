//! Query translator.
//!
//! The central state machine of the read path: every incoming native
//! query is either `Ineligible` (the host executes it natively,
//! untouched) or `Delegated` (the engine executes an equivalent search
//! request). The decision is a pure function of the request plus the
//! single process-wide integration switch, which the request can
//! override in either direction.

pub mod builder;

use std::fmt;

use tracing::{debug, warn};

use crate::config::IntegrationConfig;
use sitesearch_repository::EngineConfig;
use sitesearch_shared::{QueryRequest, SortKey};

pub use builder::SearchRequest;

/// Why a query stays on (or falls back to) the native path.
///
/// Not an error: ineligibility is a normal routing outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    /// Integration is switched off and the request did not opt in.
    IntegrationDisabled,
    /// The request explicitly opted out.
    OptedOut,
    /// No search term, and no explicit opt-in.
    NoSearchTerm,
    /// The request uses a feature the engine path does not support.
    UnsupportedFeature(&'static str),
    /// Translation failed; the query runs natively instead of returning
    /// nothing.
    BuildFailed(String),
    /// The engine call failed after retries; same availability fallback.
    EngineFailed(String),
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackReason::IntegrationDisabled => write!(f, "integration disabled"),
            FallbackReason::OptedOut => write!(f, "request opted out"),
            FallbackReason::NoSearchTerm => write!(f, "no search term"),
            FallbackReason::UnsupportedFeature(feature) => {
                write!(f, "unsupported feature: {}", feature)
            }
            FallbackReason::BuildFailed(msg) => write!(f, "build failed: {}", msg),
            FallbackReason::EngineFailed(msg) => write!(f, "engine failed: {}", msg),
        }
    }
}

/// The translator's verdict for one request.
#[derive(Debug, Clone)]
pub enum Translation {
    /// Native execution proceeds unmodified.
    Ineligible(FallbackReason),
    /// The engine executes the derived request.
    Delegated(SearchRequest),
}

/// Translates native query requests into engine search requests.
pub struct QueryTranslator {
    config: IntegrationConfig,
    index_prefix: String,
    max_page_size: usize,
    max_result_window: usize,
}

impl QueryTranslator {
    pub fn new(config: IntegrationConfig, engine: &EngineConfig) -> Self {
        Self {
            config,
            index_prefix: engine.index_prefix.clone(),
            max_page_size: engine.max_page_size,
            max_result_window: engine.max_result_window,
        }
    }

    /// Decide eligibility and, when delegated, build the engine request.
    pub fn translate(&self, request: &QueryRequest) -> Translation {
        if let Err(reason) = self.decide(request) {
            debug!(reason = %reason, "Query stays on the native path");
            return Translation::Ineligible(reason);
        }

        match builder::build(
            request,
            &self.config,
            &self.index_prefix,
            self.max_page_size,
            self.max_result_window,
        ) {
            Ok(search_request) => Translation::Delegated(search_request),
            Err(e) => {
                // A build failure is a translator bug; fail this one
                // query loudly and let it run natively rather than
                // returning no results.
                warn!(error = %e, "Failed to build delegated query, falling back to native");
                Translation::Ineligible(FallbackReason::BuildFailed(e.to_string()))
            }
        }
    }

    /// The eligibility rule, evaluated once per request.
    ///
    /// Delegate when the request explicitly opts in, or when it carries a
    /// non-empty search term, has not opted out, and uses no feature the
    /// engine path cannot express. An explicit opt-out always wins.
    pub fn decide(&self, request: &QueryRequest) -> Result<(), FallbackReason> {
        if request.integration == Some(false) {
            return Err(FallbackReason::OptedOut);
        }
        if request.integration == Some(true) {
            return Ok(());
        }
        if !self.config.enabled {
            return Err(FallbackReason::IntegrationDisabled);
        }
        if request.search_term().is_none() {
            return Err(FallbackReason::NoSearchTerm);
        }
        if let Some(feature) = Self::unsupported_feature(request) {
            return Err(FallbackReason::UnsupportedFeature(feature));
        }
        Ok(())
    }

    /// The known-unsupported feature set blocking implicit delegation.
    fn unsupported_feature(request: &QueryRequest) -> Option<&'static str> {
        if request.sorts.iter().any(|s| s.key == SortKey::Random) {
            return Some("random ordering");
        }
        None
    }
}
