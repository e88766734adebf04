//! Process-wide wiring: turns a [`Config`] into a ready [`DocumentVectors`].

use std::sync::Arc;

use anyhow::{bail, Result};
use tracing::debug;

use docvec_core::chunk::TextSplitter;
use docvec_core::store::memory::InMemoryVectorStore;
use docvec_core::store::VectorStore;

use crate::config::{Config, StoreConfig};
use crate::documents::{AnswerSettings, DocumentVectors};
use crate::embedding::create_embedder;
use crate::llm::create_llm;
use crate::processor::FileProcessor;
use crate::qdrant::QdrantStore;
use crate::repository::{IndexSettings, VectorIndexRepository};

/// Create the [`VectorStore`] named by `store.backend`.
pub fn create_store(config: &StoreConfig) -> Result<Arc<dyn VectorStore>> {
    match config.backend.as_str() {
        "qdrant" => Ok(Arc::new(QdrantStore::from_env(
            &config.url,
            config.timeout_secs,
        )?)),
        "memory" => Ok(Arc::new(InMemoryVectorStore::new())),
        other => bail!("Unknown store backend: {}", other),
    }
}

/// Build every backend named in `config` and assemble the orchestrator.
pub fn build(config: &Config) -> Result<DocumentVectors> {
    let store = create_store(&config.store)?;
    let embedder = create_embedder(&config.embedding)?;
    let llm = create_llm(&config.llm)?;
    let splitter = TextSplitter::new(config.chunking.chunk_size, config.chunking.chunk_overlap)?;

    debug!(
        store = %config.store.backend,
        embedder = embedder.model_name(),
        dims = embedder.dims(),
        llm = llm.name(),
        "backends ready"
    );

    let repository =
        VectorIndexRepository::new(store, embedder, IndexSettings::from_config(config)?);
    Ok(DocumentVectors::new(
        config.storage.dir.clone(),
        repository,
        Arc::new(FileProcessor::new(splitter)),
        llm,
        AnswerSettings::from_config(config),
    ))
}
