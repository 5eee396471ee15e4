//! Embeddings from an OpenAI-compatible HTTP API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};

use crate::config::HttpEmbeddingConfig;
use crate::embedder::{Embedder, EmbeddingError, normalize};

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

/// Calls `POST {endpoint}` with `{"model", "input"}` and reads
/// `data[].embedding`, reordered by `data[].index`.
#[derive(Debug)]
pub struct HttpEmbedder {
    client: reqwest::Client,
    config: HttpEmbeddingConfig,
}

impl HttpEmbedder {
    /// Builds the client, reading the bearer token from
    /// `config.api_key_env` when it is set.
    ///
    /// # Errors
    ///
    /// Returns [`EmbeddingError::Config`] when the key variable is named but
    /// unset, or the client cannot be built.
    pub fn new(config: HttpEmbeddingConfig) -> Result<Self, EmbeddingError> {
        if config.dimensions == 0 || config.max_batch_size == 0 {
            return Err(EmbeddingError::Config(
                "dimensions and max_batch_size must be at least 1".to_string(),
            ));
        }

        let mut headers = HeaderMap::new();
        if let Some(var) = &config.api_key_env {
            let key = std::env::var(var)
                .map_err(|_| EmbeddingError::Config(format!("{var} is not set")))?;
            let value = HeaderValue::from_str(&format!("Bearer {key}"))
                .map_err(|e| EmbeddingError::Config(format!("Invalid API key in {var}: {e}")))?;
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| EmbeddingError::Config(format!("Failed to build HTTP client: {e}")))?;

        log::info!(
            "Using HTTP embeddings from {} (model {}, {} dimensions)",
            config.endpoint,
            config.model,
            config.dimensions
        );

        Ok(Self { client, config })
    }

    async fn request(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        log::debug!(
            "Requesting {} embeddings from {}",
            texts.len(),
            self.config.endpoint
        );

        let response = self
            .client
            .post(&self.config.endpoint)
            .json(&EmbeddingRequest {
                model: &self.config.model,
                input: texts,
            })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map_or(body, |parsed| parsed.error.message);
            return Err(EmbeddingError::Status {
                status: status.as_u16(),
                message,
            });
        }

        parse_response(&body, texts.len(), self.config.dimensions)
    }
}

/// Decodes a successful response body into `expected` unit vectors of
/// `dimensions` entries each, in input order.
fn parse_response(
    body: &str,
    expected: usize,
    dimensions: usize,
) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    let mut data = serde_json::from_str::<EmbeddingResponse>(body)
        .map_err(|e| EmbeddingError::Response(e.to_string()))?
        .data;

    if data.len() != expected {
        return Err(EmbeddingError::Response(format!(
            "expected {expected} embeddings, got {}",
            data.len()
        )));
    }

    data.sort_by_key(|d| d.index);
    data.into_iter()
        .map(|d| {
            if d.embedding.len() != dimensions {
                return Err(EmbeddingError::Response(format!(
                    "expected {dimensions} dimensions, got {}",
                    d.embedding.len()
                )));
            }
            let mut vector = d.embedding;
            normalize(&mut vector);
            Ok(vector)
        })
        .collect()
}

#[async_trait]
impl Embedder for HttpEmbedder {
    fn name(&self) -> &str {
        &self.config.model
    }

    fn dimensions(&self) -> usize {
        self.config.dimensions
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(self.config.max_batch_size) {
            vectors.extend(self.request(chunk).await?);
        }
        Ok(vectors)
    }
}
