//! Error types for engine-facing operations.

pub mod engine_error;

pub use engine_error::EngineError;
