//! Terminal output for answers, warnings and configuration.

use anyhow::Result;
use console::{Term, style};
use sre_core::BotConfig;
use sre_pipeline::{Answer, RetrievalOutcome};
use std::io;
use std::path::Path;

/// Shown once when an interactive session starts.
pub const BANNER: &str = "Ask any question, and the INTL-SRE bot will provide an answer based on the relevant context from the database.";
/// Shown when the user submits blank input.
pub const EMPTY_QUESTION_WARNING: &str = "Please enter a question.";
/// Shown while a question is being answered.
pub const STATUS_LINE: &str = "Analyzing your question and fetching the answer...";
/// Shown when a run ends without an answer.
pub const FAILURE_MESSAGE: &str = "Could not generate an answer. Please try again.";
/// Input prompt for interactive sessions.
const PROMPT: &str = "Question: ";

/// Prints the session banner.
pub fn banner(term: &Term) -> io::Result<()> {
    term.write_line(&format!("{}", style("INTL-SRE bot").cyan().bold()))?;
    term.write_line(BANNER)?;
    term.write_line(&format!(
        "{}",
        style("Type `exit` or `quit` to leave.").dim()
    ))
}

/// Writes the input prompt without a trailing newline.
pub fn prompt(term: &Term) -> io::Result<()> {
    term.write_str(&format!("{}", style(PROMPT).bold()))?;
    term.flush()
}

/// Warns about blank input.
pub fn empty_question(term: &Term) -> io::Result<()> {
    term.write_line(&format!("{}", style(EMPTY_QUESTION_WARNING).yellow()))
}

/// Shows the in-flight status line.
pub fn status(term: &Term) -> io::Result<()> {
    term.write_line(&format!("{}", style(STATUS_LINE).dim()))
}

/// Removes the status line again when writing to a terminal.
pub fn clear_status(term: &Term) -> io::Result<()> {
    if term.is_term() {
        term.clear_last_lines(1)?;
    }
    Ok(())
}

/// Prints a generated answer, noting when it was built without context.
pub fn answer(out: &Term, err: &Term, answer: &Answer) -> io::Result<()> {
    if let RetrievalOutcome::Failed(reason) = &answer.retrieval {
        err.write_line(&format!(
            "{} {}",
            style("Knowledge base unavailable, answering without context:").yellow(),
            style(reason).dim()
        ))?;
    }
    out.write_line(&format!("{}", style("Answer:").green().bold()))?;
    out.write_line(&answer.text)
}

/// Reports a failed run.
pub fn failure(term: &Term, reason: &str) -> io::Result<()> {
    term.write_line(&format!("{}", style(FAILURE_MESSAGE).red().bold()))?;
    term.write_line(&format!("{}", style(reason).dim()))
}

/// `set` / `not set` for an API key, never the key itself.
const fn key_status(available: bool) -> &'static str {
    if available { "set" } else { "not set" }
}

/// Human-readable summary of the effective configuration.
pub fn config_summary(config: &BotConfig, path: &Path) -> Vec<String> {
    let host = config
        .retrieval
        .index_host
        .clone()
        .unwrap_or_else(|| format!("resolved via {}", config.retrieval.control_plane_url));

    vec![
        format!("Config file: {}", path.display()),
        format!(
            "Embedding: {} ({} dimensions) at {}",
            config.embedding.model, config.embedding.dimension, config.embedding.base_url
        ),
        format!(
            "Completion: {} at {} (max_tokens={}, temperature={})",
            config.completion.model,
            config.completion.base_url,
            config.completion.max_tokens,
            config.completion.temperature
        ),
        format!(
            "Index: {} (top_k={}, host {host})",
            config.retrieval.index_name, config.retrieval.top_k
        ),
        format!("Request timeout: {}s", config.http.timeout_seconds),
        format!(
            "OpenAI API key: {}",
            key_status(config.openai_api_key().is_ok())
        ),
        format!(
            "Pinecone API key: {}",
            key_status(config.pinecone_api_key().is_ok())
        ),
    ]
}

/// Full configuration as TOML with the API keys stripped.
///
/// # Errors
/// Returns an error if the config cannot be serialized
pub fn redacted_toml(config: &BotConfig) -> Result<String> {
    let mut redacted = config.clone();
    redacted.api_keys.openai_api_key = None;
    redacted.api_keys.pinecone_api_key = None;
    Ok(toml::to_string_pretty(&redacted)?)
}

/// Prints the configuration summary, optionally followed by the full TOML.
///
/// # Errors
/// Returns an error if the config cannot be serialized or stdout is closed
pub fn config(term: &Term, config: &BotConfig, path: &Path, full: bool) -> Result<()> {
    term.write_line(&format!("{}", style("Configuration:").bold()))?;
    for line in config_summary(config, path) {
        term.write_line(&format!("  {line}"))?;
    }
    if full {
        term.write_line("")?;
        term.write_line(&redacted_toml(config)?)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keyed_config() -> BotConfig {
        let mut config = BotConfig::default();
        config.api_keys.openai_api_key = Some("sk-do-not-print".to_owned());
        config.api_keys.pinecone_api_key = Some("pc-do-not-print".to_owned());
        config
    }

    #[test]
    fn test_summary_hides_keys() {
        let lines = config_summary(&keyed_config(), Path::new("/tmp/config.toml"));
        let joined = lines.join("\n");
        assert!(joined.contains("OpenAI API key: set"));
        assert!(joined.contains("Pinecone API key: set"));
        assert!(!joined.contains("do-not-print"));
    }

    #[test]
    fn test_summary_mentions_models_and_index() {
        let lines = config_summary(&BotConfig::default(), Path::new("/tmp/config.toml"));
        assert_eq!(lines[0], "Config file: /tmp/config.toml");
        assert!(lines[1].contains("text-embedding-ada-002"));
        assert!(lines[1].contains("1536 dimensions"));
        assert!(lines[2].contains("gpt-4o-mini"));
        assert!(lines[3].contains("chatbot"));
        assert!(lines[3].contains("top_k=5"));
        assert!(lines[3].contains("resolved via https://api.pinecone.io"));
    }

    #[test]
    fn test_configured_host_is_shown() {
        let mut config = BotConfig::default();
        config.retrieval.index_host = Some("chatbot-abc.svc.pinecone.io".to_owned());
        let lines = config_summary(&config, Path::new("config.toml"));
        assert!(lines[3].contains("host chatbot-abc.svc.pinecone.io"));
    }

    #[test]
    fn test_redacted_toml_drops_keys() {
        let rendered = redacted_toml(&keyed_config()).unwrap_or_else(|err| panic!("{err}"));
        assert!(!rendered.contains("do-not-print"));
        assert!(rendered.contains("[retrieval]"));
        assert!(rendered.contains("index_name = \"chatbot\""));
    }

    #[test]
    fn test_key_status() {
        assert_eq!(key_status(true), "set");
        assert_eq!(key_status(false), "not set");
    }
}
