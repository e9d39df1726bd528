use async_trait::async_trait;

use crate::{CompletionSettings, EmbeddingVector, Result, RetrievedMatch};

/// Turns text into an embedding vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Returns the identifier of this embedder, used in logs.
    fn name(&self) -> &'static str;

    /// Embeds a single piece of text.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Embedding`] if the provider cannot be reached,
    /// rejects the request, or returns no embedding.
    async fn embed(&self, text: &str) -> Result<EmbeddingVector>;
}

/// Nearest-neighbour lookup against a vector index.
#[async_trait]
pub trait SimilarityStore: Send + Sync {
    /// Returns the identifier of this store, used in logs.
    fn name(&self) -> &'static str;

    /// Dimensionality every query vector must have.
    fn dimension(&self) -> usize;

    /// Returns up to `top_k` matches ordered by descending score.
    ///
    /// An empty result is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::DimensionMismatch`] without contacting the store
    /// if `vector` has the wrong length, and [`crate::Error::Retrieval`] if the
    /// store fails.
    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<RetrievedMatch>>;
}

/// Chat-style text generation.
#[async_trait]
pub trait CompletionModel: Send + Sync {
    /// Returns the identifier of this model, used in logs.
    fn name(&self) -> &'static str;

    /// Generates an answer to `question` grounded in `context`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Completion`] if the provider fails or the
    /// response carries no usable text.
    async fn complete(
        &self,
        system_prompt: &str,
        context: &str,
        question: &str,
        settings: CompletionSettings,
    ) -> Result<String>;
}

/// Builds the user message sent alongside the system prompt.
pub fn user_prompt(context: &str, question: &str) -> String {
    format!("The following is relevant context:\n{context}\n\nQuestion: {question}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_prompt_layout() {
        let prompt = user_prompt("ID: 1, Content: x\n", "Why?");
        assert_eq!(
            prompt,
            "The following is relevant context:\nID: 1, Content: x\n\n\nQuestion: Why?"
        );
    }
}
