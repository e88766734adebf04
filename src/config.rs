use anyhow::{bail, Context, Result};
use docvec_core::chunk::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use docvec_core::normalize::{KeepSet, DEFAULT_MAX_LENGTH};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub normalize: NormalizeConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub prompt: PromptConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_storage_dir")]
    pub dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: default_storage_dir(),
        }
    }
}

fn default_storage_dir() -> PathBuf {
    PathBuf::from("./data/documents")
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    #[serde(default = "default_store_backend")]
    pub backend: String,
    #[serde(default = "default_store_url")]
    pub url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            url: default_store_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_store_backend() -> String {
    "qdrant".to_string()
}
fn default_store_url() -> String {
    "http://localhost:6333".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default = "default_embedding_model")]
    pub model: Option<String>,
    #[serde(default = "default_embedding_dims")]
    pub dims: Option<usize>,
    /// Base URL for the Ollama provider.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: default_embedding_model(),
            dims: default_embedding_dims(),
            url: None,
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_embedding_provider() -> String {
    "ollama".to_string()
}
fn default_embedding_model() -> Option<String> {
    Some("nomic-embed-text".to_string())
}
fn default_embedding_dims() -> Option<usize> {
    Some(768)
}
fn default_batch_size() -> usize {
    32
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_llm_provider")]
    pub provider: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            model: default_llm_model(),
            url: None,
            temperature: default_temperature(),
            timeout_secs: default_llm_timeout_secs(),
        }
    }
}

fn default_llm_provider() -> String {
    "ollama".to_string()
}
fn default_llm_model() -> String {
    "llama3".to_string()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_llm_timeout_secs() -> u64 {
    120
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,
    #[serde(default = "default_score_threshold")]
    pub score_threshold: f32,
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            search_limit: default_search_limit(),
            score_threshold: default_score_threshold(),
            max_pages: default_max_pages(),
        }
    }
}

fn default_search_limit() -> usize {
    20
}
fn default_score_threshold() -> f32 {
    0.4
}
fn default_max_pages() -> usize {
    3
}

#[derive(Debug, Deserialize, Clone)]
pub struct NormalizeConfig {
    #[serde(default = "default_max_length")]
    pub max_length: usize,
    #[serde(default = "default_language")]
    pub language: String,
    /// Extra single-letter words to keep, one character per entry.
    #[serde(default)]
    pub keep_letters: Vec<String>,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            max_length: default_max_length(),
            language: default_language(),
            keep_letters: Vec::new(),
        }
    }
}

impl NormalizeConfig {
    /// Built-in set for `language` plus `keep_letters`.
    pub fn keep_set(&self) -> Result<KeepSet> {
        let base = KeepSet::for_language(&self.language).ok_or_else(|| {
            anyhow::anyhow!(
                "Unknown normalize.language: '{}'. Must be english, russian, or none.",
                self.language
            )
        })?;

        let mut extra = Vec::with_capacity(self.keep_letters.len());
        for entry in &self.keep_letters {
            let mut chars = entry.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => extra.push(c),
                _ => bail!(
                    "normalize.keep_letters entries must be single characters, got '{}'",
                    entry
                ),
            }
        }

        Ok(base.with_letters(extra))
    }
}

fn default_max_length() -> usize {
    DEFAULT_MAX_LENGTH
}
fn default_language() -> String {
    "english".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}
fn default_chunk_overlap() -> usize {
    DEFAULT_CHUNK_OVERLAP
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct PromptConfig {
    #[serde(default)]
    pub template: Option<String>,
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    // Chunking
    if config.chunking.chunk_size == 0 {
        bail!("chunking.chunk_size must be > 0");
    }
    if config.chunking.chunk_overlap >= config.chunking.chunk_size {
        bail!("chunking.chunk_overlap must be < chunking.chunk_size");
    }

    // Retrieval
    if config.retrieval.search_limit < 1 {
        bail!("retrieval.search_limit must be >= 1");
    }
    if config.retrieval.max_pages < 1 {
        bail!("retrieval.max_pages must be >= 1");
    }
    if !(-1.0..=1.0).contains(&config.retrieval.score_threshold) {
        bail!("retrieval.score_threshold must be in [-1.0, 1.0]");
    }

    // Embedding
    if config.embedding.batch_size == 0 {
        bail!("embedding.batch_size must be > 0");
    }
    match config.embedding.provider.as_str() {
        "ollama" | "openai" => {
            if config.embedding.model.is_none() {
                bail!(
                    "embedding.model must be specified when provider is '{}'",
                    config.embedding.provider
                );
            }
            require_dims(config)?;
        }
        "hash" => require_dims(config)?,
        "local" => {}
        other => bail!(
            "Unknown embedding provider: '{}'. Must be ollama, openai, hash, or local.",
            other
        ),
    }

    // LLM
    match config.llm.provider.as_str() {
        "ollama" | "openai" => {}
        other => bail!(
            "Unknown llm provider: '{}'. Must be ollama or openai.",
            other
        ),
    }
    if !(0.0..=2.0).contains(&config.llm.temperature) {
        bail!("llm.temperature must be in [0.0, 2.0]");
    }

    // Store
    match config.store.backend.as_str() {
        "qdrant" | "memory" => {}
        other => bail!(
            "Unknown store backend: '{}'. Must be qdrant or memory.",
            other
        ),
    }

    config.normalize.keep_set()?;

    Ok(())
}

fn require_dims(config: &Config) -> Result<()> {
    if config.embedding.dims.is_none() || config.embedding.dims == Some(0) {
        bail!(
            "embedding.dims must be > 0 when provider is '{}'",
            config.embedding.provider
        );
    }
    Ok(())
}
