//! Core data models.
//!
//! [`Page`] and [`Chunk`] are the two granularities a document is indexed
//! at. Both are plain immutable values; the repository turns them into
//! [`PointPayload`]s when writing to a collection and reads
//! [`SearchHit`]s back out.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Full text of one physical page.
///
/// `index` is the 0-based position produced by the document processor.
/// The stored page number is `index + 1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Page {
    pub index: u32,
    pub text: String,
}

/// An overlapping window of page text.
///
/// `page_link` names the pages collection of the parent document. It is a
/// lookup key, not an ownership pointer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Chunk {
    pub page_index: u32,
    pub text: String,
    pub page_link: Option<String>,
}

impl Chunk {
    /// Return a copy of this chunk linked to `pages_collection`.
    pub fn with_page_link(self, pages_collection: &str) -> Self {
        Self {
            page_link: Some(pages_collection.to_string()),
            ..self
        }
    }
}

/// Output of a document processor: ordered pages and ordered chunks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SplitDocument {
    pub pages: Vec<Page>,
    pub chunks: Vec<Chunk>,
}

/// Granularity tag stored in every point payload under `type`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Page,
    #[default]
    Chunk,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Page => "page",
            RecordKind::Chunk => "chunk",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The shape shared by pages and chunks when handed to the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexRecord {
    pub page_index: u32,
    pub text: String,
    pub page_link: Option<String>,
}

impl From<&Page> for IndexRecord {
    fn from(page: &Page) -> Self {
        Self {
            page_index: page.index,
            text: page.text.clone(),
            page_link: None,
        }
    }
}

impl From<&Chunk> for IndexRecord {
    fn from(chunk: &Chunk) -> Self {
        Self {
            page_index: chunk.page_index,
            text: chunk.text.clone(),
            page_link: chunk.page_link.clone(),
        }
    }
}

/// Payload stored alongside every vector.
///
/// Everything except `text` has a default so points written by other tools
/// into the same store still decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointPayload {
    pub text: String,
    /// 1-based page number.
    #[serde(default)]
    pub page_number: u32,
    /// File name of the source document.
    #[serde(default)]
    pub source: String,
    /// Position among the records written in the same upload.
    #[serde(default)]
    pub index: usize,
    #[serde(rename = "type", default)]
    pub kind: RecordKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_link: Option<String>,
}

/// A single ranked result of a similarity query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub text: String,
    pub score: f32,
    pub source: String,
    pub page_number: u32,
    #[serde(rename = "type")]
    pub kind: RecordKind,
}

impl SearchHit {
    pub fn from_payload(payload: PointPayload, score: f32) -> Self {
        Self {
            text: payload.text,
            score,
            source: payload.source,
            page_number: payload.page_number,
            kind: payload.kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn payload_serializes_kind_as_type() {
        let payload = PointPayload {
            text: "body".to_string(),
            page_number: 2,
            source: "report.pdf".to_string(),
            index: 0,
            kind: RecordKind::Page,
            page_link: None,
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["type"], "page");
        assert_eq!(value["page_number"], 2);
        assert!(value.get("page_link").is_none());
    }

    #[test]
    fn payload_defaults_for_foreign_points() {
        let payload: PointPayload = serde_json::from_value(json!({ "text": "only text" })).unwrap();
        assert_eq!(payload.kind, RecordKind::Chunk);
        assert_eq!(payload.page_number, 0);
        assert_eq!(payload.source, "");
    }

    #[test]
    fn chunk_link_keeps_other_fields() {
        let chunk = Chunk {
            page_index: 4,
            text: "window".to_string(),
            page_link: None,
        };
        let linked = chunk.clone().with_page_link("report_pages");
        assert_eq!(linked.page_index, chunk.page_index);
        assert_eq!(linked.text, chunk.text);
        assert_eq!(linked.page_link.as_deref(), Some("report_pages"));
    }
}
