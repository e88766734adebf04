//! In-memory [`VectorStore`] implementation for tests and offline runs.
//!
//! Collections live in a `BTreeMap` behind `std::sync::RwLock`. Search is
//! brute-force cosine similarity over every point in the collection.

use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use serde_json::Value;

use crate::embedding::cosine_similarity;

use super::{Point, ScoredPoint, VectorStore};

struct Collection {
    dims: usize,
    /// Insertion-ordered; upserts replace in place.
    points: Vec<Point>,
    /// Point id to its position in `points`.
    positions: HashMap<String, usize>,
}

/// In-memory vector store.
#[derive(Default)]
pub struct InMemoryVectorStore {
    collections: RwLock<BTreeMap<String, Collection>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of points in `name`, or `None` if the collection is missing.
    pub fn point_count(&self, name: &str) -> Option<usize> {
        self.read()
            .ok()
            .and_then(|c| c.get(name).map(|col| col.points.len()))
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, BTreeMap<String, Collection>>> {
        self.collections
            .read()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, BTreeMap<String, Collection>>> {
        self.collections
            .write()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn collection_exists(&self, name: &str) -> Result<bool> {
        Ok(self.read()?.contains_key(name))
    }

    async fn create_collection(&self, name: &str, dims: usize) -> Result<()> {
        self.write()?
            .entry(name.to_string())
            .or_insert_with(|| Collection {
                dims,
                points: Vec::new(),
                positions: HashMap::new(),
            });
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<bool> {
        Ok(self.write()?.remove(name).is_some())
    }

    async fn list_collections(&self) -> Result<Vec<String>> {
        Ok(self.read()?.keys().cloned().collect())
    }

    async fn upsert_points(&self, name: &str, points: Vec<Point>) -> Result<()> {
        let mut collections = self.write()?;
        let collection = match collections.get_mut(name) {
            Some(c) => c,
            None => bail!("collection '{}' not found", name),
        };

        if let Some(bad) = points.iter().find(|p| p.vector.len() != collection.dims) {
            bail!(
                "point {} has {} dims, collection '{}' expects {}",
                bad.id,
                bad.vector.len(),
                name,
                collection.dims
            );
        }

        for point in points {
            match collection.positions.get(&point.id) {
                Some(&at) => collection.points[at] = point,
                None => {
                    collection
                        .positions
                        .insert(point.id.clone(), collection.points.len());
                    collection.points.push(point);
                }
            }
        }
        Ok(())
    }

    async fn search(
        &self,
        name: &str,
        vector: &[f32],
        limit: usize,
        score_threshold: f32,
    ) -> Result<Vec<ScoredPoint>> {
        let collections = self.read()?;
        let collection = match collections.get(name) {
            Some(c) => c,
            None => bail!("collection '{}' not found", name),
        };

        let mut hits: Vec<ScoredPoint> = collection
            .points
            .iter()
            .map(|p| ScoredPoint {
                id: p.id.clone(),
                score: cosine_similarity(vector, &p.vector),
                payload: p.payload.clone(),
            })
            .filter(|hit| hit.score >= score_threshold)
            .collect();

        // Stable sort keeps insertion order among equal scores.
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(limit);
        Ok(hits)
    }

    async fn find_by_field(
        &self,
        name: &str,
        key: &str,
        value: &Value,
        limit: usize,
    ) -> Result<Vec<ScoredPoint>> {
        let collections = self.read()?;
        let collection = match collections.get(name) {
            Some(c) => c,
            None => bail!("collection '{}' not found", name),
        };

        Ok(collection
            .points
            .iter()
            .filter(|p| p.payload.get(key) == Some(value))
            .take(limit)
            .map(|p| ScoredPoint {
                id: p.id.clone(),
                score: 0.0,
                payload: p.payload.clone(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn point(id: &str, vector: Vec<f32>, page: u32) -> Point {
        Point {
            id: id.to_string(),
            vector,
            payload: json!({ "text": format!("text {}", id), "page_number": page }),
        }
    }

    #[tokio::test]
    async fn test_create_is_idempotent() {
        let store = InMemoryVectorStore::new();
        store.create_collection("docs", 2).await.unwrap();
        store
            .upsert_points("docs", vec![point("a", vec![1.0, 0.0], 1)])
            .await
            .unwrap();
        store.create_collection("docs", 2).await.unwrap();
        assert_eq!(store.point_count("docs"), Some(1));
        assert_eq!(store.list_collections().await.unwrap(), vec!["docs"]);
    }

    #[tokio::test]
    async fn test_delete_reports_existence() {
        let store = InMemoryVectorStore::new();
        store.create_collection("docs", 2).await.unwrap();
        assert!(store.delete_collection("docs").await.unwrap());
        assert!(!store.delete_collection("docs").await.unwrap());
        assert!(!store.collection_exists("docs").await.unwrap());
    }

    #[tokio::test]
    async fn test_upsert_rejects_wrong_dims_and_missing_collection() {
        let store = InMemoryVectorStore::new();
        assert!(store
            .upsert_points("missing", vec![point("a", vec![1.0, 0.0], 1)])
            .await
            .is_err());

        store.create_collection("docs", 3).await.unwrap();
        assert!(store
            .upsert_points("docs", vec![point("a", vec![1.0, 0.0], 1)])
            .await
            .is_err());
        assert_eq!(store.point_count("docs"), Some(0));
    }

    #[tokio::test]
    async fn test_upsert_replaces_by_id() {
        let store = InMemoryVectorStore::new();
        store.create_collection("docs", 2).await.unwrap();
        store
            .upsert_points("docs", vec![point("a", vec![1.0, 0.0], 1)])
            .await
            .unwrap();
        store
            .upsert_points("docs", vec![point("a", vec![0.0, 1.0], 7)])
            .await
            .unwrap();
        assert_eq!(store.point_count("docs"), Some(1));
        let found = store
            .find_by_field("docs", "page_number", &json!(7), 1)
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn test_upsert_keeps_insertion_order_across_batches() {
        let store = InMemoryVectorStore::new();
        store.create_collection("docs", 2).await.unwrap();
        let first: Vec<Point> = (0..500)
            .map(|i| point(&format!("p{}", i), vec![1.0, 0.0], 1))
            .collect();
        store.upsert_points("docs", first).await.unwrap();
        store
            .upsert_points(
                "docs",
                vec![
                    point("p10", vec![0.0, 1.0], 2),
                    point("new", vec![1.0, 0.0], 1),
                    point("new", vec![1.0, 0.0], 3),
                ],
            )
            .await
            .unwrap();
        assert_eq!(store.point_count("docs"), Some(501));

        let replaced = store
            .find_by_field("docs", "page_number", &json!(2), 10)
            .await
            .unwrap();
        assert_eq!(replaced.len(), 1);
        assert_eq!(replaced[0].id, "p10");

        let page_one = store
            .find_by_field("docs", "page_number", &json!(1), 1000)
            .await
            .unwrap();
        assert_eq!(page_one.len(), 499);
        assert_eq!(page_one[9].id, "p9");
        assert_eq!(page_one[10].id, "p11");
        let newest = store
            .find_by_field("docs", "page_number", &json!(3), 1)
            .await
            .unwrap();
        assert_eq!(newest[0].id, "new");
    }

    #[tokio::test]
    async fn test_search_orders_and_thresholds() {
        let store = InMemoryVectorStore::new();
        store.create_collection("docs", 2).await.unwrap();
        store
            .upsert_points(
                "docs",
                vec![
                    point("far", vec![0.0, 1.0], 1),
                    point("near", vec![1.0, 0.1], 2),
                    point("exact", vec![1.0, 0.0], 3),
                ],
            )
            .await
            .unwrap();

        let hits = store.search("docs", &[1.0, 0.0], 10, 0.5).await.unwrap();
        let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["exact", "near"]);
        assert!(hits[0].score >= hits[1].score);

        let top = store.search("docs", &[1.0, 0.0], 1, 0.0).await.unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].id, "exact");
    }

    #[tokio::test]
    async fn test_find_by_field_respects_limit() {
        let store = InMemoryVectorStore::new();
        store.create_collection("docs", 2).await.unwrap();
        store
            .upsert_points(
                "docs",
                vec![
                    point("a", vec![1.0, 0.0], 4),
                    point("b", vec![0.0, 1.0], 4),
                    point("c", vec![1.0, 1.0], 5),
                ],
            )
            .await
            .unwrap();
        let found = store
            .find_by_field("docs", "page_number", &json!(4), 1)
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "a");
        assert!(store
            .find_by_field("docs", "page_number", &json!(9), 1)
            .await
            .unwrap()
            .is_empty());
    }
}
