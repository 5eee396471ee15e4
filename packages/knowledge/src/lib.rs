#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Searchable store of district price documents.
//!
//! [`DistrictKnowledgeStore`] embeds district documents into an in-memory
//! [`VectorIndex`], persists them to a [`CacheDir`] and refreshes them from
//! a [`DocumentSource`] once the cache is older than the freshness window.
//!
//! Embeddings come from [`HashingEmbedder`] offline or from an
//! OpenAI-compatible API through [`HttpEmbedder`], chosen in
//! [`KnowledgeConfig`].

pub mod cache;
pub mod config;
pub mod districts;
pub mod embedder;
pub mod index;
pub mod remote;
pub mod store;

use thiserror::Error;

pub use cache::{CacheDir, CacheSnapshot, CacheStatus, freshness_window, is_fresh_at};
pub use config::{
    ConfigError, DistrictVariations, EmbeddingBackend, EmbeddingConfig, HttpEmbeddingConfig,
    KnowledgeConfig,
};
pub use districts::DistrictMatcher;
pub use embedder::{
    DEFAULT_DIMENSIONS, Embedder, EmbeddingError, HashingEmbedder, cosine_similarity,
};
pub use remote::HttpEmbedder;
pub use index::{Hit, IndexEntry, VectorIndex};
pub use store::{
    COMPARISON_KEYWORDS, DistrictKnowledgeStore, DocumentSource, NOT_FOUND, RefreshOutcome,
    StoreState, is_comparison_query,
};

#[derive(Debug, Error)]
pub enum KnowledgeError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("Invalid timestamp: {0}")]
    Timestamp(#[from] chrono::ParseError),
    #[error("Corrupt cache: {0}")]
    Corrupt(String),
}
