//! Interfaces for search engine backends.

pub mod engine_provider;

pub use engine_provider::SearchEngineProvider;
