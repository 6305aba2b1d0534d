//! Engine error taxonomy.
//!
//! The taxonomy separates transient transport failures (retried with
//! bounded backoff, then surfaced as `Unavailable`) from engine-side
//! rejections (4xx, never retried) and schema drift (`MappingConflict`,
//! requiring an explicit migrate + reindex). Partial bulk failures are
//! not errors: they are reported per item in a bulk summary.

use thiserror::Error;

/// Unified errors from search engine operations.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// The engine could not be reached: connection failure, timeout, or a
    /// 5xx response that survived the retry budget.
    #[error("engine unavailable: {0}")]
    Unavailable(String),

    /// The engine rejected the request with a 4xx status. Never retried;
    /// a recurring rejection points at a translator bug.
    #[error("engine rejected request ({status}): {reason}")]
    Rejected { status: u16, reason: String },

    /// The index mapping differs from the deployed schema and the index
    /// holds data. Requires an explicit migrate + reindex.
    #[error("mapping conflict: {0}")]
    MappingConflict(String),

    /// Invalid input caught before any request was issued.
    #[error("validation error: {0}")]
    Validation(String),

    /// Failed to serialize a request body.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The engine response did not match the documented wire shape.
    #[error("failed to parse engine response: {0}")]
    Parse(String),
}

impl EngineError {
    /// Create an unavailable error.
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    /// Create a rejected error from a status code and response body.
    pub fn rejected(status: u16, reason: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            reason: reason.into(),
        }
    }

    /// Create a mapping conflict error.
    pub fn mapping_conflict(msg: impl Into<String>) -> Self {
        Self::MappingConflict(msg.into())
    }

    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a serialization error.
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    /// Create a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Whether the error class is worth retrying with backoff.
    ///
    /// Only unavailability (connection, timeout, 5xx) qualifies; 4xx
    /// rejections propagate immediately.
    pub fn is_transient(&self) -> bool {
        matches!(self, EngineError::Unavailable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(EngineError::unavailable("connection refused").is_transient());
        assert!(!EngineError::rejected(400, "bad request").is_transient());
        assert!(!EngineError::mapping_conflict("drift").is_transient());
        assert!(!EngineError::validation("bad input").is_transient());
        assert!(!EngineError::parse("truncated body").is_transient());
    }

    #[test]
    fn test_display_includes_status() {
        let err = EngineError::rejected(422, "mapper_parsing_exception");
        assert!(err.to_string().contains("422"));
        assert!(err.to_string().contains("mapper_parsing_exception"));
    }
}
