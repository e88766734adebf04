//! Qdrant vector store over its REST API.
//!
//! | Operation | Endpoint |
//! |-----------|----------|
//! | exists | `GET /collections/{name}/exists` |
//! | create | `PUT /collections/{name}` (409 means it already exists) |
//! | delete | `DELETE /collections/{name}` |
//! | list | `GET /collections` |
//! | upsert | `PUT /collections/{name}/points?wait=true` |
//! | search | `POST /collections/{name}/points/search` |
//! | field lookup | `POST /collections/{name}/points/scroll` |
//!
//! An API key, if any, is read from `QDRANT_API_KEY` and sent as `api-key`.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use docvec_core::store::{Point, ScoredPoint, VectorStore};

use crate::http;

pub struct QdrantStore {
    client: reqwest::Client,
    base_url: Url,
    api_key: Option<String>,
}

#[derive(Deserialize)]
struct Envelope<T> {
    result: T,
}

#[derive(Deserialize)]
struct CollectionList {
    collections: Vec<CollectionDescription>,
}

#[derive(Deserialize)]
struct CollectionDescription {
    name: String,
}

#[derive(Deserialize)]
struct Exists {
    exists: bool,
}

#[derive(Deserialize)]
struct RawPoint {
    id: Value,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    payload: Option<Value>,
}

#[derive(Deserialize)]
struct ScrollPage {
    points: Vec<RawPoint>,
}

impl RawPoint {
    fn into_scored(self) -> ScoredPoint {
        let id = match self.id {
            Value::String(s) => s,
            other => other.to_string(),
        };
        ScoredPoint {
            id,
            score: self.score,
            payload: self.payload.unwrap_or(Value::Null),
        }
    }
}

impl QdrantStore {
    pub fn new(url: &str, api_key: Option<String>, timeout_secs: u64) -> Result<Self> {
        let base_url = Url::parse(url).with_context(|| format!("invalid qdrant url '{}'", url))?;
        if base_url.cannot_be_a_base() {
            bail!("qdrant url '{}' cannot carry a path", url);
        }
        Ok(Self {
            client: http::client(timeout_secs)?,
            base_url,
            api_key,
        })
    }

    /// Build from `url`, taking the API key from `QDRANT_API_KEY`.
    pub fn from_env(url: &str, timeout_secs: u64) -> Result<Self> {
        let api_key = std::env::var("QDRANT_API_KEY")
            .ok()
            .filter(|k| !k.is_empty());
        Self::new(url, api_key, timeout_secs)
    }

    /// Append percent-encoded path segments to the base url.
    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("qdrant url '{}' cannot carry a path", self.base_url))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = &self.api_key {
            headers.insert(
                HeaderName::from_static("api-key"),
                HeaderValue::from_str(key).context("QDRANT_API_KEY is not a valid header value")?,
            );
        }
        Ok(headers)
    }

    async fn send(&self, request: reqwest::RequestBuilder, what: &str) -> Result<Response> {
        request
            .headers(self.headers()?)
            .send()
            .await
            .with_context(|| {
                format!(
                    "qdrant {} request failed (is Qdrant running at {}?)",
                    what, self.base_url
                )
            })
    }
}

/// Decode a successful response or turn the status and body into an error.
async fn decode<T: DeserializeOwned>(response: Response, what: &str) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        bail!("qdrant {} failed ({}): {}", what, status, body);
    }
    let envelope: Envelope<T> = response
        .json()
        .await
        .with_context(|| format!("invalid qdrant {} response", what))?;
    Ok(envelope.result)
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn collection_exists(&self, name: &str) -> Result<bool> {
        let response = self
            .send(
                self.client.get(self.url(&["collections", name, "exists"])?),
                "exists",
            )
            .await?;
        let exists: Exists = decode(response, "exists").await?;
        Ok(exists.exists)
    }

    async fn create_collection(&self, name: &str, dims: usize) -> Result<()> {
        let body = json!({
            "vectors": {
                "size": dims,
                "distance": "Cosine"
            }
        });
        let response = self
            .send(
                self.client
                    .put(self.url(&["collections", name])?)
                    .json(&body),
                "create collection",
            )
            .await?;

        match response.status() {
            s if s.is_success() => {
                debug!(collection = name, dims, "qdrant collection created");
                Ok(())
            }
            // Lost a create race; the collection is there either way.
            StatusCode::CONFLICT => Ok(()),
            other => {
                let body = response.text().await.unwrap_or_default();
                if body.contains("already exists") {
                    return Ok(());
                }
                bail!("qdrant create collection failed ({}): {}", other, body)
            }
        }
    }

    async fn delete_collection(&self, name: &str) -> Result<bool> {
        let response = self
            .send(
                self.client.delete(self.url(&["collections", name])?),
                "delete collection",
            )
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        let deleted: Value = decode(response, "delete collection").await?;
        Ok(deleted.as_bool().unwrap_or(true))
    }

    async fn list_collections(&self) -> Result<Vec<String>> {
        let response = self
            .send(
                self.client.get(self.url(&["collections"])?),
                "list collections",
            )
            .await?;
        let list: CollectionList = decode(response, "list collections").await?;
        Ok(list.collections.into_iter().map(|c| c.name).collect())
    }

    async fn upsert_points(&self, name: &str, points: Vec<Point>) -> Result<()> {
        if points.is_empty() {
            return Ok(());
        }
        let count = points.len();
        let body = json!({ "points": points });
        let mut url = self.url(&["collections", name, "points"])?;
        url.query_pairs_mut().append_pair("wait", "true");
        let response = self
            .send(self.client.put(url).json(&body), "upsert")
            .await?;
        let _: Value = decode(response, "upsert").await?;
        debug!(collection = name, count, "qdrant points upserted");
        Ok(())
    }

    async fn search(
        &self,
        name: &str,
        vector: &[f32],
        limit: usize,
        score_threshold: f32,
    ) -> Result<Vec<ScoredPoint>> {
        let body = json!({
            "vector": vector,
            "limit": limit,
            "score_threshold": score_threshold,
            "with_payload": true,
        });
        let response = self
            .send(
                self.client
                    .post(self.url(&["collections", name, "points", "search"])?)
                    .json(&body),
                "search",
            )
            .await?;
        let hits: Vec<RawPoint> = decode(response, "search").await?;
        Ok(hits.into_iter().map(RawPoint::into_scored).collect())
    }

    async fn find_by_field(
        &self,
        name: &str,
        key: &str,
        value: &Value,
        limit: usize,
    ) -> Result<Vec<ScoredPoint>> {
        let body = json!({
            "filter": {
                "must": [{ "key": key, "match": { "value": value } }]
            },
            "limit": limit,
            "with_payload": true,
            "with_vector": false,
        });
        let response = self
            .send(
                self.client
                    .post(self.url(&["collections", name, "points", "scroll"])?)
                    .json(&body),
                "scroll",
            )
            .await?;
        let page: ScrollPage = decode(response, "scroll").await?;
        Ok(page.points.into_iter().map(RawPoint::into_scored).collect())
    }
}

impl std::fmt::Debug for QdrantStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QdrantStore")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
