//! Embedding trait and vector utilities.
//!
//! Defines the [`Embedder`] trait every embedding backend implements, plus
//! a deterministic [`HashEmbedder`] that needs no model or network and is
//! used for offline runs and tests.
//!
//! HTTP-backed providers (Ollama, OpenAI) and the optional local model
//! live in the `docvec` app crate.

use anyhow::{bail, Result};
use async_trait::async_trait;
use sha2::{Digest, Sha256};

/// Turns text into fixed-size vectors.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Returns the model identifier (e.g. `"nomic-embed-text"`).
    fn model_name(&self) -> &str;
    /// Returns the vector dimensionality. Every vector from [`embed`](Embedder::embed)
    /// has exactly this length.
    fn dims(&self) -> usize;

    /// Embed a batch of texts, one vector per input, in input order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single query string.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed(&[text.to_string()]).await?;
        match vectors.pop() {
            Some(v) if vectors.is_empty() => Ok(v),
            _ => bail!("embedder returned an unexpected number of vectors for one query"),
        }
    }
}

/// Compute cosine similarity between two vectors.
///
/// Returns a value in `[-1.0, 1.0]`, or `0.0` for empty vectors, vectors of
/// different lengths, or zero vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}

/// Feature-hashing embedder.
///
/// Each lowercase alphanumeric token is hashed with SHA-256; the hash picks
/// a bucket and a sign. The bucket counts are L2-normalized. Texts that
/// share words score high against each other, which is enough to exercise
/// the pipeline without a model server.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dims: usize,
    name: String,
}

impl HashEmbedder {
    pub fn new(dims: usize) -> Self {
        Self {
            dims,
            name: format!("hash-{}", dims),
        }
    }

    /// Embed one text synchronously.
    pub fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dims];
        if self.dims == 0 {
            return vector;
        }

        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let digest = Sha256::digest(token.to_lowercase().as_bytes());
            let mut bucket_bytes = [0u8; 8];
            bucket_bytes.copy_from_slice(&digest[..8]);
            let bucket = (u64::from_le_bytes(bucket_bytes) % self.dims as u64) as usize;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > f32::EPSILON {
            for x in vector.iter_mut() {
                *x /= norm;
            }
        }
        vector
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn model_name(&self) -> &str {
        &self.name
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}
