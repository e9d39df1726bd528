//! Answer pipeline: embed the question, retrieve related documents, assemble
//! a context block and ask the completion model.
//!
//! A run moves through [`PipelineState`] in a fixed order. Any retrieval
//! failure is absorbed and the run continues with an empty context. Embedding
//! and completion failures end the run.

use sre_core::{
    BotConfig, CompletionModel, CompletionSettings, DEFAULT_SYSTEM_PROMPT, Embedder, Error,
    Question, RetrievedMatch, SimilarityStore,
};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error as ThisError;
use tracing::{debug, error, info, warn};

use crate::context::assemble;

/// Sentence prepended to every generated answer.
pub const INTRO_LINE: &str =
    "Hi, this is the intl-sre bot helping with queries regarding incidents.\n";

/// Number of matches requested from the store.
pub const DEFAULT_TOP_K: usize = 5;

/// Stage of a single pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineState {
    /// Question received, nothing sent yet
    Idle,
    /// Waiting for the question embedding
    Embedding,
    /// Querying the similarity store
    Retrieving,
    /// Building the context block
    Assembling,
    /// Waiting for the completion model
    Completing,
    /// Answer produced
    Done,
    /// Run ended without an answer
    Errored,
}

impl PipelineState {
    /// Lowercase stage name used in logs and error messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Embedding => "embedding",
            Self::Retrieving => "retrieving",
            Self::Assembling => "assembling",
            Self::Completing => "completing",
            Self::Done => "done",
            Self::Errored => "errored",
        }
    }

    /// Whether a run stops in this state.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Errored)
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// What the retrieval step contributed to an answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetrievalOutcome {
    /// The store returned this many matches
    Matched(usize),
    /// The store answered with no matches
    NoMatches,
    /// The store could not be queried; the answer was built without context
    Failed(String),
}

impl RetrievalOutcome {
    /// Whether the answer was generated without any retrieved context.
    #[must_use]
    pub const fn is_degraded(&self) -> bool {
        !matches!(self, Self::Matched(_))
    }
}

/// Successful result of a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    /// Intro line followed by the model's reply
    pub text: String,
    /// How retrieval went for this run
    pub retrieval: RetrievalOutcome,
    /// States visited, in order, ending in [`PipelineState::Done`]
    pub trail: Vec<PipelineState>,
}

/// A run that ended in [`PipelineState::Errored`].
#[derive(Debug, ThisError)]
#[error("{stage} failed: {source}")]
pub struct PipelineError {
    /// State the run was in when it failed
    pub stage: PipelineState,
    /// States visited, in order, ending in [`PipelineState::Errored`]
    pub trail: Vec<PipelineState>,
    /// Underlying client error
    #[source]
    pub source: Error,
}

/// Records the states a run passes through.
struct Run {
    trail: Vec<PipelineState>,
}

impl Run {
    fn start() -> Self {
        Self {
            trail: vec![PipelineState::Idle],
        }
    }

    fn current(&self) -> PipelineState {
        self.trail
            .last()
            .copied()
            .unwrap_or(PipelineState::Idle)
    }

    fn enter(&mut self, next: PipelineState) {
        debug!("Pipeline {} -> {}", self.current(), next);
        self.trail.push(next);
    }

    fn fail(mut self, source: Error) -> PipelineError {
        let stage = self.current();
        error!("Pipeline failed while {stage}: {source}");
        self.trail.push(PipelineState::Errored);
        PipelineError {
            stage,
            trail: self.trail,
            source,
        }
    }
}

/// Orchestrates the embedder, similarity store and completion model.
///
/// Holds only shared read-only handles, so one pipeline may serve any number
/// of concurrent runs.
#[derive(Clone)]
pub struct AnswerPipeline {
    /// Turns the question into a vector
    embedder: Arc<dyn Embedder>,
    /// Finds documents near the question vector
    store: Arc<dyn SimilarityStore>,
    /// Generates the reply
    completion: Arc<dyn CompletionModel>,
    /// Persona sent as the system message
    system_prompt: String,
    /// Sampling bounds for the completion
    settings: CompletionSettings,
    /// Matches requested per question
    top_k: usize,
}

impl AnswerPipeline {
    /// Creates a pipeline with the default persona, sampling and `top_k`.
    #[must_use]
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn SimilarityStore>,
        completion: Arc<dyn CompletionModel>,
    ) -> Self {
        Self {
            embedder,
            store,
            completion,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_owned(),
            settings: CompletionSettings::default(),
            top_k: DEFAULT_TOP_K,
        }
    }

    /// Creates a pipeline using the persona, sampling and `top_k` from `config`.
    #[must_use]
    pub fn from_config(
        config: &BotConfig,
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn SimilarityStore>,
        completion: Arc<dyn CompletionModel>,
    ) -> Self {
        Self::new(embedder, store, completion)
            .with_system_prompt(config.completion.system_prompt.clone())
            .with_settings(config.completion.settings())
            .with_top_k(config.retrieval.top_k)
    }

    /// Overrides the system persona.
    #[must_use]
    pub fn with_system_prompt(mut self, system_prompt: String) -> Self {
        self.system_prompt = system_prompt;
        self
    }

    /// Overrides the completion sampling bounds.
    #[must_use]
    pub const fn with_settings(mut self, settings: CompletionSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Overrides the number of matches requested.
    #[must_use]
    pub const fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Matches requested per question.
    #[must_use]
    pub const fn top_k(&self) -> usize {
        self.top_k
    }

    /// Validates `text` and answers it.
    ///
    /// # Errors
    /// Fails in [`PipelineState::Idle`] with [`Error::EmptyQuestion`] for
    /// blank input, otherwise as [`Self::answer`].
    pub async fn answer_text(&self, text: &str) -> Result<Answer, PipelineError> {
        match Question::new(text) {
            Ok(question) => self.answer(&question).await,
            Err(err) => Err(Run::start().fail(err)),
        }
    }

    /// Runs the pipeline for one question.
    ///
    /// # Errors
    /// Returns a [`PipelineError`] if the question cannot be embedded or the
    /// completion model fails. Store errors never fail the run.
    pub async fn answer(&self, question: &Question) -> Result<Answer, PipelineError> {
        let started = Instant::now();
        let mut run = Run::start();
        info!("Answering question ({} chars)", question.as_str().len());

        run.enter(PipelineState::Embedding);
        let vector = match self.embedder.embed(question.as_str()).await {
            Ok(vector) => vector,
            Err(err) => return Err(run.fail(err)),
        };

        run.enter(PipelineState::Retrieving);
        let (matches, retrieval) = self.retrieve(&vector).await;

        run.enter(PipelineState::Assembling);
        let context = assemble(&matches);

        run.enter(PipelineState::Completing);
        let reply = match self
            .completion
            .complete(
                &self.system_prompt,
                context.as_str(),
                question.as_str(),
                self.settings,
            )
            .await
        {
            Ok(reply) => reply,
            Err(err) => return Err(run.fail(err)),
        };

        run.enter(PipelineState::Done);
        info!(
            "Answered in {:.2}s using {} via {} and {}",
            started.elapsed().as_secs_f64(),
            self.completion.name(),
            self.embedder.name(),
            self.store.name(),
        );

        Ok(Answer {
            text: format!("{INTRO_LINE}{reply}"),
            retrieval,
            trail: run.trail,
        })
    }

    /// Queries the store. Any store error yields an empty result.
    async fn retrieve(&self, vector: &[f32]) -> (Vec<RetrievedMatch>, RetrievalOutcome) {
        match self.store.query(vector, self.top_k).await {
            Ok(matches) if matches.is_empty() => {
                info!("No matches found in {}", self.store.name());
                (matches, RetrievalOutcome::NoMatches)
            }
            Ok(matches) => {
                debug!("Retrieved {} matches from {}", matches.len(), self.store.name());
                let count = matches.len();
                (matches, RetrievalOutcome::Matched(count))
            }
            Err(err) => {
                warn!(
                    kind = err.kind(),
                    "Retrieval from {} failed, answering without context: {err}",
                    self.store.name()
                );
                (Vec::new(), RetrievalOutcome::Failed(err.to_string()))
            }
        }
    }
}
