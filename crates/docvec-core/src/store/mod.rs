//! Vector store abstraction.
//!
//! The [`VectorStore`] trait covers the collection and point operations the
//! indexing pipeline needs, so the Qdrant REST backend and the in-memory
//! backend are interchangeable.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A vector with its id and JSON payload, ready to be written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub id: String,
    pub vector: Vec<f32>,
    pub payload: Value,
}

/// A point returned from a query, with its similarity score.
///
/// Scroll-style lookups that do not rank results report a score of `0.0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPoint {
    pub id: String,
    pub score: f32,
    pub payload: Value,
}

/// Abstract vector store.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`collection_exists`](VectorStore::collection_exists) | Check for a named collection |
/// | [`create_collection`](VectorStore::create_collection) | Create a cosine collection if absent |
/// | [`delete_collection`](VectorStore::delete_collection) | Drop a collection and its points |
/// | [`list_collections`](VectorStore::list_collections) | Names of all collections |
/// | [`upsert_points`](VectorStore::upsert_points) | Write a batch of points |
/// | [`search`](VectorStore::search) | Ranked cosine similarity query |
/// | [`find_by_field`](VectorStore::find_by_field) | Exact-match payload lookup |
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn collection_exists(&self, name: &str) -> Result<bool>;

    /// Create a cosine-distance collection of `dims`-sized vectors.
    ///
    /// Creating a collection that already exists is not an error.
    async fn create_collection(&self, name: &str, dims: usize) -> Result<()>;

    /// Delete a collection. Returns `false` if it did not exist.
    async fn delete_collection(&self, name: &str) -> Result<bool>;

    async fn list_collections(&self) -> Result<Vec<String>>;

    /// Insert or replace points by id. Fails if the collection is missing
    /// or a vector has the wrong dimensionality.
    async fn upsert_points(&self, name: &str, points: Vec<Point>) -> Result<()>;

    /// Return up to `limit` points with similarity at or above
    /// `score_threshold`, best first.
    async fn search(
        &self,
        name: &str,
        vector: &[f32],
        limit: usize,
        score_threshold: f32,
    ) -> Result<Vec<ScoredPoint>>;

    /// Return up to `limit` points whose payload field `key` equals `value`.
    async fn find_by_field(
        &self,
        name: &str,
        key: &str,
        value: &Value,
        limit: usize,
    ) -> Result<Vec<ScoredPoint>>;
}
