//! Embedding backends.
//!
//! Concrete [`Embedder`] implementations selected by `embedding.provider`:
//! - **[`OllamaEmbedder`]** calls a local Ollama instance's `/api/embed` endpoint.
//! - **[`OpenAiEmbedder`]** calls the OpenAI embeddings API.
//! - **[`HashEmbedder`]** is deterministic feature hashing; no model, no network.
//! - **`LocalEmbedder`** runs a fastembed model in-process
//!   (feature `local-embeddings-fastembed`).
//!
//! Use [`create_embedder`] to build the one named in the configuration.
//! The HTTP backends retry 429/5xx with exponential backoff, see
//! [`crate::http`].

#[cfg(feature = "local-embeddings-fastembed")]
mod local;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use std::sync::Arc;

pub use docvec_core::embedding::{Embedder, HashEmbedder};

use crate::config::EmbeddingConfig;
use crate::http;

#[cfg(feature = "local-embeddings-fastembed")]
pub use local::LocalEmbedder;

const OLLAMA_DEFAULT_URL: &str = "http://localhost:11434";
const OPENAI_EMBEDDINGS_URL: &str = "https://api.openai.com/v1/embeddings";

fn required_model(config: &EmbeddingConfig, provider: &str) -> Result<String> {
    config
        .model
        .clone()
        .ok_or_else(|| anyhow!("embedding.model required for {} provider", provider))
}

fn required_dims(config: &EmbeddingConfig, provider: &str) -> Result<usize> {
    config
        .dims
        .ok_or_else(|| anyhow!("embedding.dims required for {} provider", provider))
}

// ============ Ollama ============

/// Embedding provider using a local Ollama instance.
///
/// Requires Ollama to be running with an embedding model pulled
/// (e.g. `ollama pull nomic-embed-text`).
pub struct OllamaEmbedder {
    client: reqwest::Client,
    model: String,
    dims: usize,
    url: String,
    max_retries: u32,
}

impl OllamaEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        Ok(Self {
            client: http::client(config.timeout_secs)?,
            model: required_model(config, "Ollama")?,
            dims: required_dims(config, "Ollama")?,
            url: config
                .url
                .clone()
                .unwrap_or_else(|| OLLAMA_DEFAULT_URL.to_string()),
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });
        let json = http::post_json_with_retry(
            &self.client,
            "Ollama",
            &format!("{}/api/embed", self.url.trim_end_matches('/')),
            None,
            &body,
            self.max_retries,
        )
        .await?;
        parse_ollama_response(&json)
    }
}

fn parse_ollama_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>> {
    json.get("embeddings")
        .and_then(|e| e.as_array())
        .ok_or_else(|| anyhow!("Invalid Ollama response: missing embeddings array"))?
        .iter()
        .map(|embedding| http::parse_vector(embedding, "Ollama"))
        .collect()
}

// ============ OpenAI ============

/// Embedding provider using the OpenAI API.
///
/// Requires the `OPENAI_API_KEY` environment variable.
pub struct OpenAiEmbedder {
    client: reqwest::Client,
    model: String,
    dims: usize,
    api_key: String,
    max_retries: u32,
}

impl OpenAiEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow!("OPENAI_API_KEY environment variable not set"))?;

        Ok(Self {
            client: http::client(config.timeout_secs)?,
            model: required_model(config, "OpenAI")?,
            dims: required_dims(config, "OpenAI")?,
            api_key,
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });
        let json = http::post_json_with_retry(
            &self.client,
            "OpenAI",
            OPENAI_EMBEDDINGS_URL,
            Some(&self.api_key),
            &body,
            self.max_retries,
        )
        .await?;
        parse_openai_response(&json)
    }
}

/// Extract `data[].embedding`, ordered by each item's `index`.
fn parse_openai_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>> {
    let data = json
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| anyhow!("Invalid OpenAI response: missing data array"))?;

    let mut indexed = Vec::with_capacity(data.len());
    for (position, item) in data.iter().enumerate() {
        let embedding = item
            .get("embedding")
            .ok_or_else(|| anyhow!("Invalid OpenAI response: missing embedding"))?;
        let index = item
            .get("index")
            .and_then(|i| i.as_u64())
            .map(|i| i as usize)
            .unwrap_or(position);
        indexed.push((index, http::parse_vector(embedding, "OpenAI")?));
    }

    indexed.sort_by_key(|(index, _)| *index);
    Ok(indexed.into_iter().map(|(_, v)| v).collect())
}

/// Create the [`Embedder`] named by `config.provider`.
///
/// | Config Value | Provider |
/// |-------------|----------|
/// | `"ollama"` | [`OllamaEmbedder`] |
/// | `"openai"` | [`OpenAiEmbedder`] |
/// | `"hash"` | [`HashEmbedder`] |
/// | `"local"` | `LocalEmbedder` (feature `local-embeddings-fastembed`) |
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    match config.provider.as_str() {
        "ollama" => Ok(Arc::new(OllamaEmbedder::new(config)?)),
        "openai" => Ok(Arc::new(OpenAiEmbedder::new(config)?)),
        "hash" => Ok(Arc::new(HashEmbedder::new(required_dims(config, "hash")?))),
        #[cfg(feature = "local-embeddings-fastembed")]
        "local" => Ok(Arc::new(LocalEmbedder::new(config)?)),
        #[cfg(not(feature = "local-embeddings-fastembed"))]
        "local" => bail!(
            "Local embedding provider requires building with --features local-embeddings-fastembed"
        ),
        other => bail!("Unknown embedding provider: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_ollama_embeddings() {
        let json = json!({ "embeddings": [[0.5, -1.0], [0.0, 2.0]] });
        let vectors = parse_ollama_response(&json).unwrap();
        assert_eq!(vectors, vec![vec![0.5, -1.0], vec![0.0, 2.0]]);
        assert!(parse_ollama_response(&json!({ "error": "no model" })).is_err());
    }

    #[test]
    fn openai_response_ordered_by_index() {
        let json = json!({
            "data": [
                { "index": 1, "embedding": [2.0] },
                { "index": 0, "embedding": [1.0] }
            ]
        });
        let vectors = parse_openai_response(&json).unwrap();
        assert_eq!(vectors, vec![vec![1.0], vec![2.0]]);
    }

    #[test]
    fn factory_builds_hash_embedder() {
        let config = EmbeddingConfig {
            provider: "hash".to_string(),
            dims: Some(48),
            ..EmbeddingConfig::default()
        };
        let embedder = create_embedder(&config).unwrap();
        assert_eq!(embedder.dims(), 48);
        assert_eq!(embedder.model_name(), "hash-48");
    }

    #[test]
    fn factory_rejects_unknown_provider() {
        let config = EmbeddingConfig {
            provider: "magic".to_string(),
            ..EmbeddingConfig::default()
        };
        assert!(create_embedder(&config).is_err());
    }

    #[test]
    fn ollama_defaults_url() {
        let embedder = OllamaEmbedder::new(&EmbeddingConfig::default()).unwrap();
        assert_eq!(embedder.url, OLLAMA_DEFAULT_URL);
        assert_eq!(embedder.dims(), 768);
    }
}
