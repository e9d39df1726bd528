//! Core types and traits for the SRE question-answering bot.
//!
//! This crate provides the data model, error handling, configuration and the
//! client traits the answer pipeline is assembled from.

/// Configuration loading and validation.
pub mod config;
/// Error types and result definitions.
pub mod error;
/// Lock helpers shared by test doubles.
pub mod sync;
/// Trait definitions for the embedding, retrieval and completion clients.
pub mod traits;
/// Core data types for questions, vectors and matches.
pub mod types;

pub use config::{BotConfig, DEFAULT_SYSTEM_PROMPT};
pub use error::{Error, Result};
pub use sync::IgnoreLock;
pub use traits::{CompletionModel, Embedder, SimilarityStore, user_prompt};
pub use types::{
    CONTENT_FIELD, CompletionSettings, EmbeddingVector, Metadata, Question, RetrievedMatch,
};
