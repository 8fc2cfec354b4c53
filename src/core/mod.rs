//! Core primitives.
//!
//! Identifiers and the read-only question catalog shared by every layer.

pub mod ids;
pub mod catalog;

// Re-export core types
pub use ids::{ConnectionId, SessionId, TopicId};
pub use catalog::{CatalogError, Question, QuestionCatalog, Topic};
