//! Flattens retrieved matches into the context block handed to the model.

use serde_json::Value;
use sre_core::{Metadata, RetrievedMatch};
use std::fmt::{self, Write as _};
use tracing::warn;

/// Emitted in place of a context block when nothing was retrieved.
pub const NO_CONTEXT: &str = "No relevant context found in the database.";

/// Version of the line layout produced by [`assemble`].
///
/// Bump when the rendering of a match changes, since prompts built from
/// older layouts are no longer comparable.
pub const CONTEXT_FORMAT_VERSION: u32 = 1;

/// Context block built from zero or more matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledContext {
    /// Rendered text passed to the completion model
    text: String,
    /// Number of matches rendered into `text`
    match_count: usize,
}

impl AssembledContext {
    /// Rendered context text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Number of matches the context was built from.
    #[must_use]
    pub const fn match_count(&self) -> usize {
        self.match_count
    }

    /// Whether the context is the [`NO_CONTEXT`] sentinel.
    #[must_use]
    pub const fn is_sentinel(&self) -> bool {
        self.match_count == 0
    }

    /// Consumes the context, returning its text.
    #[must_use]
    pub fn into_string(self) -> String {
        self.text
    }
}

impl fmt::Display for AssembledContext {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.text)
    }
}

/// Renders `matches` in input order, one line per match:
///
/// ```text
/// ID: {id}, Metadata: {metadata as compact JSON}, Content: {content}
/// ```
///
/// An empty slice yields [`NO_CONTEXT`].
#[must_use]
pub fn assemble(matches: &[RetrievedMatch]) -> AssembledContext {
    if matches.is_empty() {
        return AssembledContext {
            text: NO_CONTEXT.to_owned(),
            match_count: 0,
        };
    }

    let mut text = String::new();
    for found in matches {
        if let Err(err) = writeln!(
            text,
            "ID: {}, Metadata: {}, Content: {}",
            found.id,
            render_metadata(&found.metadata),
            found.content()
        ) {
            warn!("Failed to render match {}: {err}", found.id);
        }
    }

    AssembledContext {
        text,
        match_count: matches.len(),
    }
}

/// Compact JSON object with keys in lexicographic order.
fn render_metadata(metadata: &Metadata) -> String {
    let fields: Vec<String> = metadata
        .iter()
        .map(|(key, value)| format!("{}:{value}", Value::String(key.clone())))
        .collect();
    format!("{{{}}}", fields.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_matches_yield_sentinel() {
        let context = assemble(&[]);
        assert_eq!(context.as_str(), "No relevant context found in the database.");
        assert!(context.is_sentinel());
        assert_eq!(context.match_count(), 0);
    }

    #[test]
    fn test_single_match_line() {
        let found = RetrievedMatch::with_content("inc-42", 0.9, "Rotate the TLS cert.");
        let context = assemble(&[found]);
        assert_eq!(
            context.as_str(),
            "ID: inc-42, Metadata: {\"content\":\"Rotate the TLS cert.\"}, Content: Rotate the TLS cert.\n"
        );
        assert!(!context.is_sentinel());
    }

    #[test]
    fn test_lines_keep_input_order() {
        let matches = [
            RetrievedMatch::with_content("b", 0.5, "second"),
            RetrievedMatch::with_content("a", 0.9, "first"),
        ];
        let text = assemble(&matches).into_string();
        let ids: Vec<_> = text
            .lines()
            .filter_map(|line| line.strip_prefix("ID: "))
            .filter_map(|rest| rest.split(',').next())
            .collect();
        assert_eq!(ids, ["b", "a"]);
        assert_eq!(text.matches('\n').count(), 2);
    }

    #[test]
    fn test_metadata_keys_sorted() {
        let mut metadata = Metadata::new();
        metadata.insert("source".to_owned(), json!("pagerduty"));
        metadata.insert("content".to_owned(), json!("Disk full on db-1"));
        metadata.insert("attempts".to_owned(), json!(3));
        let context = assemble(&[RetrievedMatch::new("x", 0.1, metadata)]);
        assert_eq!(
            context.as_str(),
            "ID: x, Metadata: {\"attempts\":3,\"content\":\"Disk full on db-1\",\"source\":\"pagerduty\"}, Content: Disk full on db-1\n"
        );
    }

    #[test]
    fn test_missing_content_renders_empty() {
        let mut metadata = Metadata::new();
        metadata.insert("title".to_owned(), json!("Runbook"));
        let context = assemble(&[RetrievedMatch::new("r1", 0.3, metadata)]);
        assert_eq!(
            context.as_str(),
            "ID: r1, Metadata: {\"title\":\"Runbook\"}, Content: \n"
        );
    }

    #[test]
    fn test_non_string_content_rendered_as_json() {
        let mut metadata = Metadata::new();
        metadata.insert("content".to_owned(), json!(["a", 1]));
        let context = assemble(&[RetrievedMatch::new("j", 0.3, metadata)]);
        assert!(context.as_str().ends_with("Content: [\"a\",1]\n"));
    }

    #[test]
    fn test_keys_are_escaped() {
        let mut metadata = Metadata::new();
        metadata.insert("say \"hi\"".to_owned(), json!(true));
        let context = assemble(&[RetrievedMatch::new("e", 0.3, metadata)]);
        assert!(context.as_str().contains(r#"{"say \"hi\"":true}"#));
    }

    #[test]
    fn test_assemble_is_idempotent() {
        let matches = vec![
            RetrievedMatch::with_content("1", 0.9, "one"),
            RetrievedMatch::with_content("2", 0.8, "two"),
        ];
        assert_eq!(assemble(&matches), assemble(&matches));
    }
}
