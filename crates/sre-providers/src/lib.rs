//! Provider adapters for the embedding, vector index and chat services.

/// In-memory clients for tests and offline runs.
pub mod mock;
/// `OpenAI` embeddings and chat completions.
pub mod openai;
/// Pinecone vector index queries.
pub mod pinecone;

pub use mock::{CompletionCall, MockCompletion, MockEmbedder, MockStore};
pub use openai::{OpenAiChat, OpenAiEmbedder};
pub use pinecone::PineconeIndex;

use reqwest::{Client, Error as HttpError};
use sre_core::{Error, Result};
use std::time::Duration;

/// Timeout used by clients constructed without a configuration.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Builds the HTTP client shared by a provider's requests.
///
/// # Errors
/// Returns [`Error::Config`] if the TLS backend cannot be initialised.
pub fn http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|err| Error::Config(format!("Failed to build HTTP client: {err}")))
}

/// Describes a transport failure, calling out timeouts explicitly.
fn describe_transport_error(err: &HttpError) -> String {
    if err.is_timeout() {
        format!("request timed out: {err}")
    } else if err.is_connect() {
        format!("connection failed: {err}")
    } else {
        format!("request failed: {err}")
    }
}

/// Joins a base URL and a path without doubling the slash.
fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_cleanly() {
        assert_eq!(
            endpoint("https://api.openai.com/v1/", "/embeddings"),
            "https://api.openai.com/v1/embeddings"
        );
        assert_eq!(endpoint("http://127.0.0.1:80", "query"), "http://127.0.0.1:80/query");
    }

    #[test]
    fn test_http_client_builds() {
        let Ok(_client) = http_client(Duration::from_millis(250)) else {
            panic!("client with a short timeout should build");
        };
    }
}
