use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use crate::{Error, Result};

/// Metadata key holding the stored text of a match.
pub const CONTENT_FIELD: &str = "content";

/// Embedding vector produced for a piece of text.
pub type EmbeddingVector = Vec<f32>;

/// Metadata attached to a stored vector, kept in key order.
pub type Metadata = BTreeMap<String, Value>;

/// A question asked by the user. Never empty or whitespace-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Question(String);

impl Question {
    /// Creates a question from user input.
    ///
    /// # Errors
    /// Returns [`Error::EmptyQuestion`] if the text is empty or only whitespace.
    pub fn new<T: Into<String>>(text: T) -> Result<Self> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(Error::EmptyQuestion);
        }
        Ok(Self(text))
    }

    /// The question text exactly as entered.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Question {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

/// A stored item returned by a similarity query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedMatch {
    /// Identifier of the stored vector.
    pub id: String,
    /// Similarity score reported by the store.
    pub score: f32,
    /// Metadata stored alongside the vector.
    #[serde(default)]
    pub metadata: Metadata,
}

impl RetrievedMatch {
    /// Creates a match with the given metadata.
    pub fn new<T: Into<String>>(id: T, score: f32, metadata: Metadata) -> Self {
        Self {
            id: id.into(),
            score,
            metadata,
        }
    }

    /// Creates a match whose metadata holds only a `content` field.
    pub fn with_content<T: Into<String>, C: Into<String>>(id: T, score: f32, content: C) -> Self {
        let mut metadata = Metadata::new();
        metadata.insert(CONTENT_FIELD.to_owned(), Value::String(content.into()));
        Self::new(id, score, metadata)
    }

    /// Text of the `content` metadata field.
    ///
    /// Strings are returned as-is, other values as compact JSON, and a
    /// missing field as an empty string.
    pub fn content(&self) -> String {
        match self.metadata.get(CONTENT_FIELD) {
            None => String::new(),
            Some(Value::String(text)) => text.clone(),
            Some(other) => other.to_string(),
        }
    }
}

/// Sampling bounds for a completion request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompletionSettings {
    /// Maximum number of tokens in the generated answer.
    pub max_tokens: u32,
    /// Sampling temperature; low values keep answers close to the context.
    pub temperature: f32,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            max_tokens: 150,
            temperature: 0.2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_question_rejects_blank_input() {
        assert!(matches!(Question::new(""), Err(Error::EmptyQuestion)));
        assert!(matches!(Question::new("  \n\t "), Err(Error::EmptyQuestion)));
    }

    #[test]
    fn test_question_keeps_text_verbatim() {
        let question = Question::new("  What is an SRE? ").unwrap_or_else(|err| panic!("{err}"));
        assert_eq!(question.as_str(), "  What is an SRE? ");
        assert_eq!(question.to_string(), "  What is an SRE? ");
    }

    #[test]
    fn test_match_content_variants() {
        let text = RetrievedMatch::with_content("a", 0.9, "disk full on node-3");
        assert_eq!(text.content(), "disk full on node-3");

        let missing = RetrievedMatch::new("b", 0.5, Metadata::new());
        assert_eq!(missing.content(), "");

        let mut metadata = Metadata::new();
        metadata.insert(CONTENT_FIELD.to_owned(), json!(42));
        let numeric = RetrievedMatch::new("c", 0.1, metadata);
        assert_eq!(numeric.content(), "42");
    }

    #[test]
    fn test_match_deserializes_without_metadata() {
        let parsed: RetrievedMatch = serde_json::from_str(r#"{"id":"x","score":0.25}"#)
            .unwrap_or_else(|err| panic!("parse failed: {err}"));
        assert_eq!(parsed.id, "x");
        assert!(parsed.metadata.is_empty());
    }

    #[test]
    fn test_completion_settings_default() {
        let settings = CompletionSettings::default();
        assert_eq!(settings.max_tokens, 150);
        assert!((settings.temperature - 0.2).abs() < f32::EPSILON);
    }
}
