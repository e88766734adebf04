//! In-process embeddings via fastembed.
//!
//! The model is downloaded from Hugging Face on first use and cached; later
//! runs need no network. Inference is CPU-bound, so it runs on tokio's
//! blocking pool.

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use docvec_core::embedding::Embedder;

use crate::config::EmbeddingConfig;

const DEFAULT_LOCAL_MODEL: &str = "all-minilm-l6-v2";

pub struct LocalEmbedder {
    model_name: String,
    dims: usize,
    batch_size: usize,
    model: Arc<Mutex<Option<fastembed::TextEmbedding>>>,
}

impl LocalEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let model_name = config
            .model
            .clone()
            .unwrap_or_else(|| DEFAULT_LOCAL_MODEL.to_string());
        // Fail at startup on unknown names rather than on first upload.
        to_fastembed_model(&model_name)?;

        let dims = config.dims.unwrap_or(match model_name.as_str() {
            "bge-base-en-v1.5" | "nomic-embed-text-v1" | "nomic-embed-text-v1.5" => 768,
            "multilingual-e5-base" => 768,
            "bge-large-en-v1.5" | "multilingual-e5-large" => 1024,
            _ => 384,
        });

        Ok(Self {
            model_name,
            dims,
            batch_size: config.batch_size,
            model: Arc::new(Mutex::new(None)),
        })
    }
}

fn to_fastembed_model(name: &str) -> Result<fastembed::EmbeddingModel> {
    match name {
        "all-minilm-l6-v2" => Ok(fastembed::EmbeddingModel::AllMiniLML6V2),
        "bge-small-en-v1.5" => Ok(fastembed::EmbeddingModel::BGESmallENV15),
        "bge-base-en-v1.5" => Ok(fastembed::EmbeddingModel::BGEBaseENV15),
        "bge-large-en-v1.5" => Ok(fastembed::EmbeddingModel::BGELargeENV15),
        "nomic-embed-text-v1" => Ok(fastembed::EmbeddingModel::NomicEmbedTextV1),
        "nomic-embed-text-v1.5" => Ok(fastembed::EmbeddingModel::NomicEmbedTextV15),
        "multilingual-e5-small" => Ok(fastembed::EmbeddingModel::MultilingualE5Small),
        "multilingual-e5-base" => Ok(fastembed::EmbeddingModel::MultilingualE5Base),
        "multilingual-e5-large" => Ok(fastembed::EmbeddingModel::MultilingualE5Large),
        other => bail!(
            "Unknown local embedding model: '{}'. Supported models: \
             all-minilm-l6-v2, bge-small-en-v1.5, bge-base-en-v1.5, bge-large-en-v1.5, \
             nomic-embed-text-v1, nomic-embed-text-v1.5, \
             multilingual-e5-small, multilingual-e5-base, multilingual-e5-large",
            other
        ),
    }
}

#[async_trait]
impl Embedder for LocalEmbedder {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let texts = texts.to_vec();
        let model_slot = Arc::clone(&self.model);
        let model_name = self.model_name.clone();
        let batch_size = self.batch_size;

        tokio::task::spawn_blocking(move || {
            let mut slot = model_slot
                .lock()
                .map_err(|_| anyhow!("local embedding model lock poisoned"))?;

            if slot.is_none() {
                let model = fastembed::TextEmbedding::try_new(
                    fastembed::InitOptions::new(to_fastembed_model(&model_name)?)
                        .with_show_download_progress(true),
                )
                .map_err(|e| anyhow!("Failed to initialize local embedding model: {}", e))?;
                *slot = Some(model);
            }

            match slot.as_mut() {
                Some(model) => model
                    .embed(texts, Some(batch_size))
                    .map_err(|e| anyhow!("Local embedding failed: {}", e)),
                None => bail!("local embedding model unavailable"),
            }
        })
        .await?
    }
}
