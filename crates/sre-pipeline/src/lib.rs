//! Retrieval-augmented answering for the SRE bot.
//!
//! [`AnswerPipeline`] wires an [`sre_core::Embedder`], a
//! [`sre_core::SimilarityStore`] and a [`sre_core::CompletionModel`] together;
//! [`assemble`] renders retrieved matches into the prompt context.

/// Rendering of retrieved matches into a context block.
pub mod context;
/// The answer state machine.
pub mod pipeline;

pub use context::{AssembledContext, CONTEXT_FORMAT_VERSION, NO_CONTEXT, assemble};
pub use pipeline::{
    Answer, AnswerPipeline, DEFAULT_TOP_K, INTRO_LINE, PipelineError, PipelineState,
    RetrievalOutcome,
};
