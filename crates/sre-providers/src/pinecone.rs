//! Pinecone index client.
//!
//! Queries go to the index's data-plane host. When no host is configured it
//! is looked up once through the control plane (`GET /indexes/{name}`) and
//! reused for the lifetime of the client.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sre_core::config::ENV_PINECONE_API_KEY;
use sre_core::{BotConfig, Error, Metadata, Result, RetrievedMatch, SimilarityStore};
use std::cmp::Ordering;
use tokio::sync::OnceCell;

use crate::{DEFAULT_TIMEOUT, describe_transport_error, endpoint, http_client};

/// Default Pinecone control-plane URL.
const CONTROL_PLANE_URL: &str = "https://api.pinecone.io";
/// API version sent with every request.
const API_VERSION: &str = "2024-10";

/// Client for a single Pinecone index.
pub struct PineconeIndex {
    /// HTTP client for API requests.
    client: Client,
    /// Pinecone API key.
    api_key: String,
    /// Index name, used for host resolution.
    index_name: String,
    /// Control-plane base URL.
    control_plane_url: String,
    /// Data-plane base URL, resolved lazily unless configured.
    host: OnceCell<String>,
    /// Namespace to query, if any.
    namespace: Option<String>,
    /// Vector length the index expects.
    dimension: usize,
}

impl PineconeIndex {
    /// Creates a client for `index_name` whose vectors have `dimension` entries.
    ///
    /// # Errors
    /// Returns an error if the API key is empty or the HTTP client cannot be built.
    pub fn new(api_key: String, index_name: String, dimension: usize) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::MissingApiKey(ENV_PINECONE_API_KEY.to_owned()));
        }

        Ok(Self {
            client: http_client(DEFAULT_TIMEOUT)?,
            api_key,
            index_name,
            control_plane_url: CONTROL_PLANE_URL.to_owned(),
            host: OnceCell::new(),
            namespace: None,
            dimension,
        })
    }

    /// Creates a client from the `[retrieval]`, `[embedding]` and `[http]` sections.
    ///
    /// # Errors
    /// Returns an error if no API key is configured or the HTTP client cannot be built.
    pub fn from_config(config: &BotConfig) -> Result<Self> {
        let retrieval = &config.retrieval;
        let mut index = Self::new(
            config.pinecone_api_key()?,
            retrieval.index_name.clone(),
            config.embedding.dimension,
        )?
        .with_http_client(http_client(config.http.timeout())?)
        .with_control_plane_url(retrieval.control_plane_url.clone());

        if let Some(host) = &retrieval.index_host {
            index = index.with_host(host);
        }
        if let Some(namespace) = &retrieval.namespace {
            index = index.with_namespace(namespace.clone());
        }
        Ok(index)
    }

    /// Uses `host` for queries instead of resolving it.
    ///
    /// A bare host name is assumed to be served over HTTPS.
    #[must_use]
    pub fn with_host(mut self, host: &str) -> Self {
        self.host = OnceCell::new_with(Some(normalize_host(host)));
        self
    }

    /// Queries the given namespace. An empty string means the default namespace.
    #[must_use]
    pub fn with_namespace(mut self, namespace: String) -> Self {
        self.namespace = (!namespace.is_empty()).then_some(namespace);
        self
    }

    /// Sets the control-plane URL used for host resolution.
    #[must_use]
    pub fn with_control_plane_url(mut self, url: String) -> Self {
        self.control_plane_url = url;
        self
    }

    /// Replaces the HTTP client, e.g. to change the timeout.
    #[must_use]
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// Returns the data-plane URL, resolving it on first use.
    async fn data_plane_url(&self) -> Result<&str> {
        self.host
            .get_or_try_init(|| self.describe_index())
            .await
            .map(String::as_str)
    }

    /// Looks up the index host through the control plane.
    async fn describe_index(&self) -> Result<String> {
        let url = endpoint(
            &self.control_plane_url,
            &format!("indexes/{}", self.index_name),
        );

        let response = self
            .client
            .get(url)
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
            .send()
            .await
            .map_err(|err| {
                Error::Retrieval(format!(
                    "describe index '{}': {}",
                    self.index_name,
                    describe_transport_error(&err)
                ))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(Error::Retrieval(format!(
                "describe index '{}' failed with status {status}: {error_text}",
                self.index_name
            )));
        }

        let description: IndexDescription = response
            .json()
            .await
            .map_err(|err| Error::Retrieval(format!("Failed to parse index description: {err}")))?;

        if let Some(reported) = description.dimension
            && reported != self.dimension
        {
            tracing::warn!(
                "Index '{}' reports dimension {reported}, configured {}",
                self.index_name,
                self.dimension
            );
        }

        tracing::debug!("Resolved index '{}' to {}", self.index_name, description.host);
        Ok(normalize_host(&description.host))
    }
}

/// Prefixes `https://` to bare host names and drops trailing slashes.
fn normalize_host(host: &str) -> String {
    let trimmed = host.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_owned()
    } else {
        format!("https://{trimmed}")
    }
}

/// Orders matches by descending score and keeps at most `top_k`.
fn rank(mut matches: Vec<RetrievedMatch>, top_k: usize) -> Vec<RetrievedMatch> {
    matches.sort_by(|first, second| {
        second
            .score
            .partial_cmp(&first.score)
            .unwrap_or(Ordering::Equal)
    });
    matches.truncate(top_k);
    matches
}

/// Control-plane description of an index.
#[derive(Debug, Deserialize)]
struct IndexDescription {
    /// Data-plane host name.
    host: String,
    /// Vector dimension, when reported.
    #[serde(default)]
    dimension: Option<usize>,
}

/// Request payload for the data-plane `query` endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'req> {
    /// Query vector.
    vector: &'req [f32],
    /// Number of matches to return.
    top_k: usize,
    /// Whether stored vector values are returned.
    include_values: bool,
    /// Whether stored metadata is returned.
    include_metadata: bool,
    /// Namespace to search.
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'req str>,
}

/// Response payload from the `query` endpoint.
#[derive(Debug, Deserialize)]
struct QueryResponse {
    /// Matches ordered by similarity.
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

/// A single match; metadata may be absent or null.
#[derive(Debug, Deserialize)]
struct QueryMatch {
    /// Vector identifier.
    id: String,
    /// Similarity score.
    #[serde(default)]
    score: f32,
    /// Stored metadata.
    #[serde(default)]
    metadata: Option<Metadata>,
}

impl From<QueryMatch> for RetrievedMatch {
    fn from(found: QueryMatch) -> Self {
        Self::new(found.id, found.score, found.metadata.unwrap_or_default())
    }
}

#[async_trait]
impl SimilarityStore for PineconeIndex {
    fn name(&self) -> &'static str {
        "pinecone"
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

        let host = self.data_plane_url().await?;
        let request = QueryRequest {
            vector,
            top_k,
            include_values: false,
            include_metadata: true,
            namespace: self.namespace.as_deref(),
        };

        let response = self
            .client
            .post(endpoint(host, "query"))
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|err| Error::Retrieval(describe_transport_error(&err)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(Error::Retrieval(format!(
                "Pinecone query failed with status {status}: {error_text}"
            )));
        }

        let parsed: QueryResponse = response
            .json()
            .await
            .map_err(|err| Error::Retrieval(format!("Failed to parse query response: {err}")))?;

        let matches = rank(
            parsed.matches.into_iter().map(RetrievedMatch::from).collect(),
            top_k,
        );
        tracing::debug!("Pinecone returned {} matches", matches.len());
        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, to_value};

    #[test]
    fn test_normalize_host() {
        assert_eq!(
            normalize_host("chatbot-abc.svc.pinecone.io/"),
            "https://chatbot-abc.svc.pinecone.io"
        );
        assert_eq!(normalize_host("http://127.0.0.1:5080"), "http://127.0.0.1:5080");
    }

    #[test]
    fn test_query_request_shape() {
        let vector = [0.5f32, 0.25];
        let request = QueryRequest {
            vector: &vector,
            top_k: 5,
            include_values: false,
            include_metadata: true,
            namespace: None,
        };
        let value = to_value(&request).unwrap_or_else(|err| panic!("serialize: {err}"));
        assert_eq!(
            value,
            json!({
                "vector": [0.5, 0.25],
                "topK": 5,
                "includeValues": false,
                "includeMetadata": true
            })
        );
    }

    #[test]
    fn test_rank_orders_and_truncates() {
        let matches = vec![
            RetrievedMatch::with_content("low", 0.1, "a"),
            RetrievedMatch::with_content("high", 0.9, "b"),
            RetrievedMatch::with_content("mid", 0.5, "c"),
        ];
        let ranked = rank(matches, 2);
        let ids: Vec<_> = ranked.iter().map(|found| found.id.as_str()).collect();
        assert_eq!(ids, ["high", "mid"]);
    }

    #[test]
    fn test_query_response_tolerates_missing_fields() {
        let parsed: QueryResponse = serde_json::from_str(
            r#"{"matches":[{"id":"a","score":0.7,"values":[]},{"id":"b","score":0.6,"metadata":null}],"namespace":""}"#,
        )
        .unwrap_or_else(|err| panic!("parse: {err}"));
        let matches: Vec<RetrievedMatch> =
            parsed.matches.into_iter().map(RetrievedMatch::from).collect();
        assert_eq!(matches.len(), 2);
        assert!(matches.iter().all(|found| found.metadata.is_empty()));

        let empty: QueryResponse =
            serde_json::from_str("{}").unwrap_or_else(|err| panic!("parse: {err}"));
        assert!(empty.matches.is_empty());
    }

    #[test]
    fn test_blank_namespace_is_default() {
        let index = PineconeIndex::new("pc-test".to_owned(), "chatbot".to_owned(), 3)
            .unwrap_or_else(|err| panic!("index: {err}"))
            .with_namespace(String::new());
        assert!(index.namespace.is_none());
        assert_eq!(index.dimension(), 3);
    }
}
