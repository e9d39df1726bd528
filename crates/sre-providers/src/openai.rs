use async_trait::async_trait;
use reqwest::{Client, Response as HttpResponse};
use serde::{Deserialize, Serialize};
use sre_core::config::ENV_OPENAI_API_KEY;
use sre_core::{
    BotConfig, CompletionModel, CompletionSettings, Embedder, EmbeddingVector, Error, Result,
    user_prompt,
};
use std::time::Instant;

use crate::{DEFAULT_TIMEOUT, describe_transport_error, endpoint, http_client};

/// Default `OpenAI` REST base URL.
const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
/// Default embedding model.
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-ada-002";
/// Default chat model.
const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";

/// Rejects an empty key before any request is attempted.
fn require_key(api_key: &str) -> Result<()> {
    if api_key.is_empty() {
        return Err(Error::MissingApiKey(ENV_OPENAI_API_KEY.to_owned()));
    }
    Ok(())
}

/// Reads an unsuccessful response into a `status: body` message.
async fn error_body(response: HttpResponse) -> String {
    let status = response.status();
    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_owned());
    format!("{status}: {error_text}")
}

/// `OpenAI` embeddings client.
pub struct OpenAiEmbedder {
    /// HTTP client for API requests.
    client: Client,
    /// `OpenAI` API key.
    api_key: String,
    /// Embedding model identifier.
    model: String,
    /// API base URL, without the `/embeddings` suffix.
    base_url: String,
}

impl OpenAiEmbedder {
    /// Creates an embedder with the default model and endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is empty or the HTTP client cannot be built.
    pub fn new(api_key: String) -> Result<Self> {
        require_key(&api_key)?;
        Ok(Self {
            client: http_client(DEFAULT_TIMEOUT)?,
            api_key,
            model: DEFAULT_EMBEDDING_MODEL.to_owned(),
            base_url: OPENAI_BASE_URL.to_owned(),
        })
    }

    /// Creates an embedder from the `[embedding]` and `[http]` config sections.
    ///
    /// # Errors
    ///
    /// Returns an error if no API key is configured or the HTTP client cannot be built.
    pub fn from_config(config: &BotConfig) -> Result<Self> {
        let api_key = config.openai_api_key()?;
        require_key(&api_key)?;
        Ok(Self {
            client: http_client(config.http.timeout())?,
            api_key,
            model: config.embedding.model.clone(),
            base_url: config.embedding.base_url.clone(),
        })
    }

    /// Sets the embedding model.
    #[must_use]
    pub fn with_model(mut self, model: String) -> Self {
        self.model = model;
        self
    }

    /// Sets the API base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    /// Replaces the HTTP client, e.g. to change the timeout.
    #[must_use]
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }
}

/// Request payload for the embeddings endpoint.
#[derive(Debug, Serialize)]
struct EmbeddingRequest<'req> {
    /// Embedding model identifier.
    model: &'req str,
    /// Text to embed.
    input: &'req str,
}

/// Response payload from the embeddings endpoint.
#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    /// One entry per input.
    #[serde(default)]
    data: Vec<EmbeddingData>,
}

/// A single embedding in the response.
#[derive(Debug, Deserialize)]
struct EmbeddingData {
    /// The embedding values.
    embedding: Vec<f32>,
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn name(&self) -> &'static str {
        "openai-embeddings"
    }

    async fn embed(&self, text: &str) -> Result<EmbeddingVector> {
        let start = Instant::now();
        let request = EmbeddingRequest {
            model: &self.model,
            input: text,
        };

        let response = self
            .client
            .post(endpoint(&self.base_url, "embeddings"))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|err| Error::Embedding(describe_transport_error(&err)))?;

        if !response.status().is_success() {
            return Err(Error::Embedding(format!(
                "OpenAI embeddings API error {}",
                error_body(response).await
            )));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|err| Error::Embedding(format!("Failed to parse embeddings response: {err}")))?;

        let embedding = parsed
            .data
            .into_iter()
            .next()
            .map(|data| data.embedding)
            .ok_or_else(|| Error::Embedding("No embedding returned".to_owned()))?;

        tracing::debug!(
            "Query embedding length: {} ({} ms)",
            embedding.len(),
            start.elapsed().as_millis()
        );
        Ok(embedding)
    }
}

/// `OpenAI` chat completions client.
pub struct OpenAiChat {
    /// HTTP client for API requests.
    client: Client,
    /// `OpenAI` API key.
    api_key: String,
    /// Chat model identifier.
    model: String,
    /// API base URL, without the `/chat/completions` suffix.
    base_url: String,
}

impl OpenAiChat {
    /// Creates a chat client with the default model and endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is empty or the HTTP client cannot be built.
    pub fn new(api_key: String) -> Result<Self> {
        require_key(&api_key)?;
        Ok(Self {
            client: http_client(DEFAULT_TIMEOUT)?,
            api_key,
            model: DEFAULT_CHAT_MODEL.to_owned(),
            base_url: OPENAI_BASE_URL.to_owned(),
        })
    }

    /// Creates a chat client from the `[completion]` and `[http]` config sections.
    ///
    /// # Errors
    ///
    /// Returns an error if no API key is configured or the HTTP client cannot be built.
    pub fn from_config(config: &BotConfig) -> Result<Self> {
        let api_key = config.openai_api_key()?;
        require_key(&api_key)?;
        Ok(Self {
            client: http_client(config.http.timeout())?,
            api_key,
            model: config.completion.model.clone(),
            base_url: config.completion.base_url.clone(),
        })
    }

    /// Sets the chat model.
    #[must_use]
    pub fn with_model(mut self, model: String) -> Self {
        self.model = model;
        self
    }

    /// Sets the API base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    /// Replaces the HTTP client, e.g. to change the timeout.
    #[must_use]
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }
}

/// Request payload sent to the chat completions API.
#[derive(Debug, Serialize)]
struct ChatRequest<'req> {
    /// Chat model identifier.
    model: &'req str,
    /// System persona followed by the grounded user message.
    messages: Vec<ChatMessage<'req>>,
    /// Maximum number of tokens allowed in the completion.
    max_tokens: u32,
    /// Sampling temperature controlling response randomness.
    temperature: f32,
}

/// Message delivered to the chat API.
#[derive(Debug, Serialize)]
struct ChatMessage<'req> {
    /// Role of the message author (`system` or `user`).
    role: &'static str,
    /// Textual content of the message.
    content: &'req str,
}

/// Response payload returned by the chat API.
#[derive(Debug, Deserialize)]
struct ChatResponse {
    /// List of candidate completions.
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

/// A single completion choice.
#[derive(Debug, Deserialize)]
struct ChatChoice {
    /// Message generated for the choice.
    message: ChatResponseMessage,
}

/// Generated message; `content` is null for refusals and tool calls.
#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    /// Generated text content.
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl CompletionModel for OpenAiChat {
    fn name(&self) -> &'static str {
        "openai-chat"
    }

    async fn complete(
        &self,
        system_prompt: &str,
        context: &str,
        question: &str,
        settings: CompletionSettings,
    ) -> Result<String> {
        let start = Instant::now();
        let user_content = user_prompt(context, question);

        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: &user_content,
                },
            ],
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
        };

        let response = self
            .client
            .post(endpoint(&self.base_url, "chat/completions"))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|err| Error::Completion(describe_transport_error(&err)))?;

        if !response.status().is_success() {
            return Err(Error::Completion(format!(
                "OpenAI chat API error {}",
                error_body(response).await
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|err| Error::Completion(format!("Failed to parse chat response: {err}")))?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| Error::Completion("No choices in chat response".to_owned()))?;

        let text = choice
            .message
            .content
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| Error::Completion("Chat response has no content".to_owned()))?;

        tracing::debug!(
            "{} answered in {} ms",
            self.model,
            start.elapsed().as_millis()
        );
        Ok(text)
    }
}
