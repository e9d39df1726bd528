//! Configuration for the embedding, retrieval and completion clients.

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{CompletionSettings, Error, Result};

/// Env var consulted when no `OpenAI` key is configured.
pub const ENV_OPENAI_API_KEY: &str = "OPENAI_API_KEY";
/// Env var consulted when no Pinecone key is configured.
pub const ENV_PINECONE_API_KEY: &str = "PINECONE_API_KEY";

/// Persona given to the chat model unless configured otherwise.
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a sre bot trying to help sre engineers to debug issues";

/// Default `OpenAI` REST base URL.
const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Complete bot configuration.
#[derive(Default, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// Embedding model settings
    pub embedding: EmbeddingConfig,
    /// Chat completion settings
    pub completion: CompletionConfig,
    /// Vector index settings
    pub retrieval: RetrievalConfig,
    /// HTTP client settings
    pub http: HttpConfig,
    /// API keys for the providers
    pub api_keys: ApiKeys,
}

/// API keys for the providers.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ApiKeys {
    /// `OpenAI` key used for embeddings and completions
    pub openai_api_key: Option<String>,
    /// Pinecone key used for index queries
    pub pinecone_api_key: Option<String>,
}

/// Embedding model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Embedding model identifier
    pub model: String,
    /// Vector length the index was built with
    pub dimension: usize,
    /// Base URL of the embeddings API
    pub base_url: String,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "text-embedding-ada-002".to_owned(),
            dimension: 1536,
            base_url: OPENAI_BASE_URL.to_owned(),
        }
    }
}

/// Chat completion settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionConfig {
    /// Chat model identifier
    pub model: String,
    /// Base URL of the chat completions API
    pub base_url: String,
    /// Persona given to the model as the system message
    pub system_prompt: String,
    /// Maximum tokens in a generated answer
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        let settings = CompletionSettings::default();
        Self {
            model: "gpt-4o-mini".to_owned(),
            base_url: OPENAI_BASE_URL.to_owned(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_owned(),
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
        }
    }
}

impl CompletionConfig {
    /// Sampling bounds passed with every completion request.
    pub fn settings(&self) -> CompletionSettings {
        CompletionSettings {
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }
}

/// Vector index settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Name of the Pinecone index
    pub index_name: String,
    /// Data-plane host of the index; resolved from the control plane when unset
    pub index_host: Option<String>,
    /// Namespace to query, if the index is partitioned
    pub namespace: Option<String>,
    /// Number of matches to retrieve per question
    pub top_k: usize,
    /// Pinecone control-plane URL used to resolve the index host
    pub control_plane_url: String,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            index_name: "chatbot".to_owned(),
            index_host: None,
            namespace: None,
            top_k: 5,
            control_plane_url: "https://api.pinecone.io".to_owned(),
        }
    }
}

/// HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Timeout applied to every provider request
    pub timeout_seconds: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
        }
    }
}

impl HttpConfig {
    /// Request timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl BotConfig {
    /// Get the default config directory path (`~/.sre-bot`)
    ///
    /// # Errors
    /// Returns an error if the home directory cannot be determined
    pub fn config_dir() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| Error::Config("Could not determine home directory".to_owned()))?;
        Ok(home.join(".sre-bot"))
    }

    /// Get the default config file path (`~/.sre-bot/config.toml`)
    ///
    /// # Errors
    /// Returns an error if the home directory cannot be determined
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load config from `path`, writing the defaults there first if it does
    /// not exist yet.
    ///
    /// # Errors
    /// Returns an error if the config cannot be read, created or validated
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load_from_file(path)
        } else {
            let config = Self::default();
            config.save_to_file(path)?;
            tracing::info!("Wrote default configuration to {}", path.display());
            Ok(config)
        }
    }

    /// Load config from a specific file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, parsed or validated
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;

        tracing::debug!(
            "Loaded config from {}: openai_api_key={}, pinecone_api_key={}",
            path.display(),
            presence(config.api_keys.openai_api_key.as_ref()),
            presence(config.api_keys.pinecone_api_key.as_ref()),
        );

        Ok(config)
    }

    /// Save config to a specific file
    ///
    /// # Errors
    /// Returns an error if the file cannot be written
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;

        let header = "# SRE bot configuration\n\
                      # Generated on first run; API keys may also come from\n\
                      # OPENAI_API_KEY and PINECONE_API_KEY\n\n";

        fs::write(path, format!("{header}{contents}"))?;
        Ok(())
    }

    /// Rejects values no provider would accept.
    ///
    /// # Errors
    /// Returns [`Error::Config`] naming the offending setting
    pub fn validate(&self) -> Result<()> {
        if self.embedding.dimension == 0 {
            return Err(Error::Config("embedding.dimension must be positive".to_owned()));
        }
        if self.retrieval.top_k == 0 {
            return Err(Error::Config("retrieval.top_k must be positive".to_owned()));
        }
        if self.completion.max_tokens == 0 {
            return Err(Error::Config("completion.max_tokens must be positive".to_owned()));
        }
        if !(0.0..=2.0).contains(&self.completion.temperature) {
            return Err(Error::Config(format!(
                "completion.temperature must be within 0.0..=2.0, got {}",
                self.completion.temperature
            )));
        }
        Ok(())
    }

    /// `OpenAI` key from the config file, falling back to `OPENAI_API_KEY`.
    ///
    /// # Errors
    /// Returns [`Error::MissingApiKey`] if neither source provides a key
    pub fn openai_api_key(&self) -> Result<String> {
        resolve_key(self.api_keys.openai_api_key.as_ref(), ENV_OPENAI_API_KEY)
    }

    /// Pinecone key from the config file, falling back to `PINECONE_API_KEY`.
    ///
    /// # Errors
    /// Returns [`Error::MissingApiKey`] if neither source provides a key
    pub fn pinecone_api_key(&self) -> Result<String> {
        resolve_key(self.api_keys.pinecone_api_key.as_ref(), ENV_PINECONE_API_KEY)
    }
}

/// Picks the configured key, else the env var; blank values count as unset.
fn resolve_key(configured: Option<&String>, env_var: &str) -> Result<String> {
    configured
        .filter(|key| !key.trim().is_empty())
        .cloned()
        .or_else(|| env::var(env_var).ok().filter(|key| !key.trim().is_empty()))
        .ok_or_else(|| Error::MissingApiKey(format!("{env_var} or config.toml api_keys")))
}

/// Describes whether a secret is set without revealing it.
pub fn presence(value: Option<&String>) -> &'static str {
    if value.is_some_and(|key| !key.is_empty()) {
        "present"
    } else {
        "missing"
    }
}
