//! Vector index repository: normalized, embedded records in named collections.
//!
//! The repository owns the physical collection lifecycle but never invents
//! collection names; every operation takes the name from its caller.
//!
//! # Upload pipeline
//!
//! ```text
//! records ──▶ normalize ──▶ drop short (≤ min_text_length chars)
//!                              │
//!                              ▼
//!                 embed in batches of batch_size
//!                              │
//!                              ▼
//!              ensure_collection ──▶ upsert points (UUIDv4 ids)
//! ```
//!
//! Nothing is created or written when no record survives the filter.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use docvec_core::embedding::Embedder;
use docvec_core::models::{Chunk, IndexRecord, Page, PointPayload, RecordKind, SearchHit};
use docvec_core::normalize::{normalize, KeepSet, DEFAULT_MAX_LENGTH};
use docvec_core::retrieval::unique_pages;
use docvec_core::store::{Point, VectorStore};

use crate::config::Config;

/// Records at or below this many characters after normalization are skipped.
pub const MIN_TEXT_LENGTH: usize = 50;
pub const DEFAULT_BATCH_SIZE: usize = 32;

#[derive(Debug, Clone)]
pub struct IndexSettings {
    pub max_text_length: usize,
    pub min_text_length: usize,
    pub batch_size: usize,
    pub keep_set: KeepSet,
    /// Candidate hits fetched when ranking pages.
    pub search_limit: usize,
    pub score_threshold: f32,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            max_text_length: DEFAULT_MAX_LENGTH,
            min_text_length: MIN_TEXT_LENGTH,
            batch_size: DEFAULT_BATCH_SIZE,
            keep_set: KeepSet::english(),
            search_limit: 20,
            score_threshold: 0.4,
        }
    }
}

impl IndexSettings {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            max_text_length: config.normalize.max_length,
            min_text_length: MIN_TEXT_LENGTH,
            batch_size: config.embedding.batch_size,
            keep_set: config.normalize.keep_set()?,
            search_limit: config.retrieval.search_limit,
            score_threshold: config.retrieval.score_threshold,
        })
    }
}

pub struct VectorIndexRepository {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    settings: IndexSettings,
}

impl VectorIndexRepository {
    pub fn new(
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn Embedder>,
        settings: IndexSettings,
    ) -> Self {
        Self {
            store,
            embedder,
            settings,
        }
    }

    pub fn settings(&self) -> &IndexSettings {
        &self.settings
    }

    /// Create `name` with the embedder's dimensionality unless it exists.
    ///
    /// Returns `true` when this call issued the creation.
    pub async fn ensure_collection(&self, name: &str) -> Result<bool> {
        if self.store.collection_exists(name).await? {
            return Ok(false);
        }
        self.store
            .create_collection(name, self.embedder.dims())
            .await
            .with_context(|| format!("failed to create collection '{}'", name))?;
        info!(collection = name, dims = self.embedder.dims(), "collection created");
        Ok(true)
    }

    /// Normalize, filter, embed and write `records` into `name`.
    ///
    /// Returns the number of points written; `0` means nothing survived the
    /// length filter and the collection was left untouched.
    pub async fn upload(
        &self,
        name: &str,
        records: &[IndexRecord],
        kind: RecordKind,
        source: &str,
    ) -> Result<usize> {
        let survivors: Vec<(&IndexRecord, String)> = records
            .iter()
            .filter_map(|record| {
                let text = normalize(
                    &record.text,
                    self.settings.max_text_length,
                    &self.settings.keep_set,
                );
                (text.chars().count() > self.settings.min_text_length).then_some((record, text))
            })
            .collect();

        if survivors.is_empty() {
            debug!(
                collection = name,
                total = records.len(),
                "no records long enough to index"
            );
            return Ok(0);
        }

        let texts: Vec<String> = survivors.iter().map(|(_, text)| text.clone()).collect();
        let vectors = self.embed_batches(&texts).await?;

        self.ensure_collection(name).await?;

        let points: Vec<Point> = survivors
            .into_iter()
            .zip(vectors)
            .enumerate()
            .map(|(index, ((record, text), vector))| -> Result<Point> {
                let payload = PointPayload {
                    text,
                    page_number: record.page_index + 1,
                    source: source.to_string(),
                    index,
                    kind,
                    page_link: record.page_link.clone(),
                };
                Ok(Point {
                    id: Uuid::new_v4().to_string(),
                    vector,
                    payload: serde_json::to_value(payload)?,
                })
            })
            .collect::<Result<_>>()?;

        let written = points.len();
        let batch_size = self.settings.batch_size.max(1);
        let mut batch = Vec::with_capacity(batch_size);
        for point in points {
            batch.push(point);
            if batch.len() == batch_size {
                self.store
                    .upsert_points(name, std::mem::take(&mut batch))
                    .await?;
            }
        }
        if !batch.is_empty() {
            self.store.upsert_points(name, batch).await?;
        }

        info!(
            collection = name,
            kind = %kind,
            written,
            skipped = records.len() - written,
            "points written"
        );
        Ok(written)
    }

    pub async fn upload_pages(&self, name: &str, pages: &[Page], source: &str) -> Result<usize> {
        let records: Vec<IndexRecord> = pages.iter().map(IndexRecord::from).collect();
        self.upload(name, &records, RecordKind::Page, source).await
    }

    pub async fn upload_chunks(&self, name: &str, chunks: &[Chunk], source: &str) -> Result<usize> {
        let records: Vec<IndexRecord> = chunks.iter().map(IndexRecord::from).collect();
        self.upload(name, &records, RecordKind::Chunk, source).await
    }

    async fn embed_batches(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let dims = self.embedder.dims();
        let mut vectors = Vec::with_capacity(texts.len());

        for batch in texts.chunks(self.settings.batch_size.max(1)) {
            let embedded = self
                .embedder
                .embed(batch)
                .await
                .with_context(|| format!("embedding with {} failed", self.embedder.model_name()))?;
            if embedded.len() != batch.len() {
                bail!(
                    "embedder returned {} vectors for {} texts",
                    embedded.len(),
                    batch.len()
                );
            }
            if let Some(bad) = embedded.iter().find(|v| v.len() != dims) {
                bail!(
                    "embedder returned a {}-dim vector, expected {}",
                    bad.len(),
                    dims
                );
            }
            vectors.extend(embedded);
        }
        Ok(vectors)
    }

    /// Ranked hits from `name` with score ≥ `score_threshold`.
    ///
    /// A missing collection yields no hits.
    pub async fn search(
        &self,
        name: &str,
        query: &str,
        limit: usize,
        score_threshold: f32,
    ) -> Result<Vec<SearchHit>> {
        if !self.store.collection_exists(name).await? {
            debug!(collection = name, "search on missing collection");
            return Ok(Vec::new());
        }

        let vector = self
            .embedder
            .embed_query(query)
            .await
            .context("embedding the query failed")?;
        let points = self
            .store
            .search(name, &vector, limit, score_threshold)
            .await?;

        let hits: Vec<SearchHit> = points
            .into_iter()
            .filter_map(|point| match serde_json::from_value::<PointPayload>(point.payload) {
                Ok(payload) => Some(SearchHit::from_payload(payload, point.score)),
                Err(e) => {
                    debug!(collection = name, id = %point.id, error = %e, "skipping point without text payload");
                    None
                }
            })
            .collect();

        debug!(collection = name, hits = hits.len(), "search done");
        Ok(hits)
    }

    /// Distinct page numbers of the best chunk hits, in rank order.
    pub async fn relevant_pages(&self, name: &str, query: &str, max_pages: usize) -> Result<Vec<u32>> {
        let hits = self
            .search(
                name,
                query,
                self.settings.search_limit,
                self.settings.score_threshold,
            )
            .await?;
        Ok(unique_pages(hits.iter().map(|h| h.page_number), max_pages))
    }

    /// Text of the first record in `name` stored for `page_number`.
    pub async fn fetch_page_text(&self, name: &str, page_number: u32) -> Result<Option<String>> {
        if !self.store.collection_exists(name).await? {
            return Ok(None);
        }
        let found = self
            .store
            .find_by_field(name, "page_number", &json!(page_number), 1)
            .await?;
        Ok(found.into_iter().next().and_then(|point| {
            point
                .payload
                .get("text")
                .and_then(|t| t.as_str())
                .map(str::to_string)
        }))
    }

    pub async fn list_collections(&self) -> Result<Vec<String>> {
        self.store.list_collections().await
    }

    /// Returns `false` when the collection did not exist.
    pub async fn delete_collection(&self, name: &str) -> Result<bool> {
        let deleted = self.store.delete_collection(name).await?;
        if deleted {
            info!(collection = name, "collection deleted");
        } else {
            debug!(collection = name, "collection already absent");
        }
        Ok(deleted)
    }

    /// Delete each name independently; returns the names actually deleted.
    ///
    /// A failure on one name is logged and does not stop the others.
    pub async fn delete_collections(&self, names: &[String]) -> Vec<String> {
        let mut deleted = Vec::new();
        for name in names {
            match self.delete_collection(name).await {
                Ok(true) => deleted.push(name.clone()),
                Ok(false) => {}
                Err(e) => warn!(collection = %name, error = %e, "failed to delete collection"),
            }
        }
        deleted
    }
}
