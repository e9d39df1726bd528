//! Mock clients for exercising the answer pipeline.
//!
//! Each mock can be told to succeed with canned data or to fail, and keeps
//! a call history so tests can verify what the pipeline sent.

use async_trait::async_trait;
use core::result::Result as CoreResult;
use sre_core::{
    CompletionModel, CompletionSettings, Embedder, EmbeddingVector, Error, IgnoreLock as _, Result,
    RetrievedMatch, SimilarityStore, user_prompt,
};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash as _, Hasher as _};
use std::sync::{Arc, Mutex};

/// Embedder returning deterministic, hash-derived vectors.
#[derive(Clone)]
pub struct MockEmbedder {
    /// Length of the produced vectors
    dimension: usize,
    /// Error message to fail with, if any
    failure: Option<String>,
    /// Texts embedded so far
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockEmbedder {
    /// Creates an embedder producing vectors of length `dimension`.
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            failure: None,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Creates an embedder whose every call fails with `message`.
    #[must_use]
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::new(0)
        }
    }

    /// Texts embedded so far, in call order.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock_ignore_poison().clone()
    }

    /// Deterministic vector derived from a hash of `text`.
    fn fake_embedding(&self, text: &str) -> EmbeddingVector {
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        let hash = hasher.finish();

        (0..self.dimension)
            .map(|idx| (hash.wrapping_add(idx as u64) % 1000) as f32 / 1000.0)
            .collect()
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    fn name(&self) -> &'static str {
        "mock-embedder"
    }

    async fn embed(&self, text: &str) -> Result<EmbeddingVector> {
        self.calls.with_lock(|calls| calls.push(text.to_owned()));
        match &self.failure {
            Some(message) => Err(Error::Embedding(message.clone())),
            None => Ok(self.fake_embedding(text)),
        }
    }
}

/// Store returning a fixed list of matches.
#[derive(Clone)]
pub struct MockStore {
    /// Dimension enforced on query vectors
    dimension: usize,
    /// Matches returned by every query
    matches: Vec<RetrievedMatch>,
    /// Error message to fail with, if any
    failure: Option<String>,
    /// `top_k` of every query that reached the store
    queries: Arc<Mutex<Vec<usize>>>,
}

impl MockStore {
    /// Creates a store for `dimension`-length vectors holding `matches`.
    #[must_use]
    pub fn new(dimension: usize, matches: Vec<RetrievedMatch>) -> Self {
        Self {
            dimension,
            matches,
            failure: None,
            queries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Creates a store with no matching items.
    #[must_use]
    pub fn empty(dimension: usize) -> Self {
        Self::new(dimension, Vec::new())
    }

    /// Creates a store whose every query fails with `message`.
    #[must_use]
    pub fn failing(dimension: usize, message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::empty(dimension)
        }
    }

    /// Number of queries that passed the dimension check.
    #[must_use]
    pub fn query_count(&self) -> usize {
        self.queries.lock_ignore_poison().len()
    }

    /// `top_k` values requested so far.
    #[must_use]
    pub fn requested_top_k(&self) -> Vec<usize> {
        self.queries.lock_ignore_poison().clone()
    }
}

#[async_trait]
impl SimilarityStore for MockStore {
    fn name(&self) -> &'static str {
        "mock-store"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<RetrievedMatch>> {
        if vector.len() != self.dimension {
            return Err(Error::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }

        self.queries.with_lock(|queries| queries.push(top_k));
        match &self.failure {
            Some(message) => Err(Error::Retrieval(message.clone())),
            None => Ok(self.matches.iter().take(top_k).cloned().collect()),
        }
    }
}

/// A completion request as seen by [`MockCompletion`].
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionCall {
    /// System persona message
    pub system_prompt: String,
    /// Assembled context passed in
    pub context: String,
    /// Original question text
    pub question: String,
    /// Sampling bounds requested
    pub settings: CompletionSettings,
    /// User message that would be sent to a real provider
    pub user_prompt: String,
}

/// Completion model returning a canned reply.
#[derive(Clone)]
pub struct MockCompletion {
    /// Reply or failure message
    reply: CoreResult<String, String>,
    /// Requests seen so far
    calls: Arc<Mutex<Vec<CompletionCall>>>,
}

impl MockCompletion {
    /// Creates a model that always answers `reply`.
    #[must_use]
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: Ok(reply.into()),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Creates a model whose every call fails with `message`.
    #[must_use]
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            reply: Err(message.into()),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Requests seen so far, in call order.
    #[must_use]
    pub fn calls(&self) -> Vec<CompletionCall> {
        self.calls.lock_ignore_poison().clone()
    }

    /// Number of completion requests made.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock_ignore_poison().len()
    }
}

#[async_trait]
impl CompletionModel for MockCompletion {
    fn name(&self) -> &'static str {
        "mock-completion"
    }

    async fn complete(
        &self,
        system_prompt: &str,
        context: &str,
        question: &str,
        settings: CompletionSettings,
    ) -> Result<String> {
        self.calls.with_lock(|calls| {
            calls.push(CompletionCall {
                system_prompt: system_prompt.to_owned(),
                context: context.to_owned(),
                question: question.to_owned(),
                settings,
                user_prompt: user_prompt(context, question),
            });
        });

        self.reply.clone().map_err(Error::Completion)
    }
}
