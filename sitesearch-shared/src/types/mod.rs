//! Type definitions for the sitesearch integration engine.

pub mod content;
pub mod document;
pub mod query;
pub mod result;
