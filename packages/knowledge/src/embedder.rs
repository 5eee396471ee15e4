//! Text embedding for similarity search.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("Embedding API returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("Invalid embedding configuration: {0}")]
    Config(String),
    #[error("Unexpected embedding response: {0}")]
    Response(String),
}

/// Maps text to a fixed-length vector. Vectors from the same embedder are
/// compared with [`cosine_similarity`].
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Short label for logs.
    fn name(&self) -> &str;

    /// Length of every vector this embedder produces.
    fn dimensions(&self) -> usize;

    /// Embeds every text, in order.
    ///
    /// # Errors
    ///
    /// Returns [`EmbeddingError`] if any text could not be embedded.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Embeds one text.
    ///
    /// # Errors
    ///
    /// Returns [`EmbeddingError`] if the text could not be embedded.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.embed_batch(&[text])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::Response("no embedding returned".to_string()))
    }
}

/// Default vector length of [`HashingEmbedder`].
pub const DEFAULT_DIMENSIONS: usize = 512;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0100_0000_01b3;

/// Feature-hashing embedder over character trigrams and whole words.
///
/// Deterministic and offline. Each feature is hashed (FNV-1a) to a slot and
/// a sign; the result is L2-normalized.
#[derive(Debug, Clone, Copy)]
pub struct HashingEmbedder {
    dimensions: usize,
}

impl HashingEmbedder {
    /// Creates an embedder producing vectors of `dimensions` (at least 1)
    /// entries.
    #[must_use]
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    /// Embeds `text`. Never fails.
    #[must_use]
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0_f32; self.dimensions];
        let lowered = text.to_lowercase();

        for word in lowered.split(|c: char| !c.is_alphanumeric() && c != '-') {
            if word.is_empty() {
                continue;
            }
            self.add_feature(&mut vector, word);

            let padded: Vec<char> = format!(" {word} ").chars().collect();
            for gram in padded.windows(3) {
                let gram: String = gram.iter().collect();
                self.add_feature(&mut vector, &gram);
            }
        }

        normalize(&mut vector);
        vector
    }

    #[allow(clippy::cast_possible_truncation)]
    fn add_feature(&self, vector: &mut [f32], feature: &str) {
        let hash = fnv1a(feature.as_bytes());
        let slot = (hash % self.dimensions as u64) as usize;
        let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
        vector[slot] += sign;
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSIONS)
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    fn name(&self) -> &str {
        "hashing"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|text| self.embed_text(text)).collect())
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET, |hash, byte| {
        (hash ^ u64::from(*byte)).wrapping_mul(FNV_PRIME)
    })
}

/// Scales `vector` to unit length in place. All-zero vectors are left as
/// they are.
pub fn normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in vector.iter_mut() {
            *v /= norm;
        }
    }
}

/// Cosine similarity of two vectors. Zero when either is all zeros or the
/// lengths differ.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|v| v * v).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}
