//! Knowledge store configuration.
//!
//! The default lives in `config/knowledge.toml` and is embedded at compile
//! time. A runtime file with the same layout can replace it.

use std::path::Path;
use std::sync::Arc;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::embedder::{DEFAULT_DIMENSIONS, Embedder, EmbeddingError, HashingEmbedder};
use crate::remote::HttpEmbedder;

const KNOWLEDGE_TOML: &str = include_str!("../config/knowledge.toml");

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Which embedder the store indexes with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    #[default]
    Hashing,
    Http,
}

/// Settings for an OpenAI-compatible embeddings endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpEmbeddingConfig {
    pub endpoint: String,
    pub model: String,
    /// Length of the vectors the model returns.
    pub dimensions: usize,
    /// Environment variable holding the bearer token. No token is sent when
    /// absent.
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Most texts sent in one request.
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,
}

const fn default_timeout_secs() -> u64 {
    30
}

const fn default_max_batch_size() -> usize {
    32
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub backend: EmbeddingBackend,
    #[serde(default = "default_hashing_dimensions")]
    pub hashing_dimensions: usize,
    /// Required when `backend = "http"`.
    #[serde(default)]
    pub http: Option<HttpEmbeddingConfig>,
}

const fn default_hashing_dimensions() -> usize {
    DEFAULT_DIMENSIONS
}

/// Canonical district name and the lowercase spellings that mean it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistrictVariations {
    pub name: String,
    pub variations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeConfig {
    /// Hits considered per query.
    pub top_k: usize,
    /// Lowest similarity accepted when no hit contains the query verbatim.
    pub min_similarity: f32,
    /// Age in days up to which the cache counts as fresh.
    pub freshness_days: i64,
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub districts: Vec<DistrictVariations>,
}

impl KnowledgeConfig {
    /// Parses and validates a configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the TOML is malformed or a value is
    /// unusable.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str)?;
        config.check()?;
        Ok(config)
    }

    /// Loads a runtime configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        log::info!("Loading knowledge configuration from {}", path.display());
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// The configuration shipped with the crate.
    ///
    /// # Panics
    ///
    /// Panics if the embedded `knowledge.toml` is malformed.
    #[must_use]
    pub fn embedded() -> Self {
        Self::from_toml(KNOWLEDGE_TOML)
            .unwrap_or_else(|e| panic!("Failed to parse knowledge.toml: {e}"))
    }

    fn check(&self) -> Result<(), ConfigError> {
        if self.top_k == 0 {
            return Err(ConfigError::Invalid("top_k must be at least 1".to_string()));
        }
        if self.freshness_days < 0 {
            return Err(ConfigError::Invalid(
                "freshness_days must not be negative".to_string(),
            ));
        }
        if self.embedding.backend == EmbeddingBackend::Http && self.embedding.http.is_none() {
            return Err(ConfigError::Invalid(
                "backend = \"http\" needs an [embedding.http] section".to_string(),
            ));
        }
        if let Some(district) = self
            .districts
            .iter()
            .find(|d| d.name.trim().is_empty() || d.variations.is_empty())
        {
            return Err(ConfigError::Invalid(format!(
                "district '{}' needs a name and at least one variation",
                district.name
            )));
        }
        Ok(())
    }

    #[must_use]
    pub fn freshness_window(&self) -> Duration {
        Duration::days(self.freshness_days)
    }

    /// Builds the configured embedder.
    ///
    /// # Errors
    ///
    /// Returns [`EmbeddingError::Config`] when the HTTP embedder cannot be
    /// set up, e.g. its API key variable is unset.
    pub fn build_embedder(&self) -> Result<Arc<dyn Embedder>, EmbeddingError> {
        let embedder: Arc<dyn Embedder> = match (self.embedding.backend, &self.embedding.http) {
            (EmbeddingBackend::Http, Some(http)) => Arc::new(HttpEmbedder::new(http.clone())?),
            (EmbeddingBackend::Http, None) => {
                return Err(EmbeddingError::Config(
                    "missing [embedding.http] section".to_string(),
                ));
            }
            (EmbeddingBackend::Hashing, _) => {
                Arc::new(HashingEmbedder::new(self.embedding.hashing_dimensions))
            }
        };
        Ok(embedder)
    }
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self::embedded()
    }
}
