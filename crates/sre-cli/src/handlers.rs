//! Command handlers for CLI operations

use anyhow::{Context as _, Result};
use console::Term;
use sre_core::BotConfig;
use sre_pipeline::AnswerPipeline;
use sre_providers::{OpenAiChat, OpenAiEmbedder, PineconeIndex};
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::{
    EnvFilter, Registry, fmt, layer::SubscriberExt as _, util::SubscriberInitExt as _,
};

use crate::interactive;
use crate::render;

/// Filter used when `RUST_LOG` is unset.
const DEFAULT_FILTER: &str = "sre_cli=info,sre_pipeline=info,sre_providers=info";
/// Filter used with `--verbose`.
const VERBOSE_FILTER: &str = "sre_cli=debug,sre_pipeline=debug,sre_providers=debug,sre_core=debug";

/// Sends logs to stderr so stdout carries only answers.
pub fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new(VERBOSE_FILTER)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    };

    Registry::default()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(io::stderr)
                .with_target(false)
                .with_level(true),
        )
        .init();
}

/// Explicit `--config` path, else `~/.sre-bot/config.toml`.
///
/// # Errors
/// Returns an error if no path is given and the home directory is unknown
pub fn config_path(explicit: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path);
    }
    Ok(BotConfig::config_path()?)
}

/// Loads the config at `path`, creating it with defaults on first run.
///
/// # Errors
/// Returns an error if the file cannot be read, written or validated
pub fn load_config(path: &Path) -> Result<BotConfig> {
    BotConfig::load_or_create(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))
}

/// Builds the `OpenAI` and Pinecone clients and wires them into a pipeline.
///
/// # Errors
/// Returns an error if an API key is missing or an HTTP client cannot be built
pub fn build_pipeline(config: &BotConfig) -> Result<AnswerPipeline> {
    let embedder = OpenAiEmbedder::from_config(config)?;
    let store = PineconeIndex::from_config(config)?;
    let completion = OpenAiChat::from_config(config)?;

    tracing::debug!(
        "Embedding with {}, answering with {}, querying index {}",
        config.embedding.model,
        config.completion.model,
        config.retrieval.index_name,
    );

    Ok(AnswerPipeline::from_config(
        config,
        Arc::new(embedder),
        Arc::new(store),
        Arc::new(completion),
    ))
}

/// Runs one question through the pipeline and renders the outcome.
///
/// Returns whether an answer was produced.
///
/// # Errors
/// Returns an error only if the terminal cannot be written
pub async fn answer_and_render(
    pipeline: &AnswerPipeline,
    question: &str,
    out: &Term,
    err: &Term,
) -> Result<bool> {
    render::status(err)?;
    let result = pipeline.answer_text(question).await;
    render::clear_status(err)?;

    match result {
        Ok(answer) => {
            tracing::debug!("Answer trail: {:?}", answer.trail);
            render::answer(out, err, &answer)?;
            Ok(true)
        }
        Err(failure) => {
            render::failure(err, &failure.to_string())?;
            Ok(false)
        }
    }
}

/// Handle `ask`: answer a single question.
///
/// # Errors
/// Returns an error if the config cannot be loaded or the clients cannot be built
pub async fn handle_ask(config: Option<PathBuf>, question: &str) -> Result<ExitCode> {
    let err = Term::stderr();
    if question.trim().is_empty() {
        render::empty_question(&err)?;
        return Ok(ExitCode::FAILURE);
    }

    let path = config_path(config)?;
    let pipeline = build_pipeline(&load_config(&path)?)?;

    if answer_and_render(&pipeline, question, &Term::stdout(), &err).await? {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

/// Handle `interactive`: answer questions from stdin until EOF.
///
/// # Errors
/// Returns an error if the config cannot be loaded, the clients cannot be
/// built or stdin cannot be read
pub async fn handle_interactive(config: Option<PathBuf>) -> Result<()> {
    let path = config_path(config)?;
    let pipeline = build_pipeline(&load_config(&path)?)?;
    interactive::run(&pipeline).await
}

/// Handle `config`: show the effective configuration.
///
/// # Errors
/// Returns an error if the config cannot be loaded or rendered
pub fn handle_config(config: Option<PathBuf>, full: bool) -> Result<()> {
    let path = config_path(config)?;
    let loaded = load_config(&path)?;
    render::config(&Term::stdout(), &loaded, &path, full)
}
