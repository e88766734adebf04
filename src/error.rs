//! Error types surfaced at the document orchestrator boundary.
//!
//! Internal plumbing (HTTP providers, stores, the repository) returns
//! `anyhow::Result`. [`DocumentVectors`](crate::documents::DocumentVectors)
//! maps those failures into [`DocvecError`] so callers can tell a missing
//! document from bad input from a failing backend.

use thiserror::Error;

use crate::processor::ExtractError;

pub type Result<T> = std::result::Result<T, DocvecError>;

#[derive(Debug, Error)]
pub enum DocvecError {
    /// Source file or managed document does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Rejected before any external call.
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("failed to read document '{file}'")]
    Extract {
        file: String,
        #[source]
        source: ExtractError,
    },

    /// Embedding, vector store or language model failure.
    #[error("{operation} failed")]
    Upstream {
        operation: &'static str,
        #[source]
        source: anyhow::Error,
    },

    /// One collection of a document was written and the other was not.
    #[error("upload of '{document}' is incomplete (written: {written:?})")]
    PartialUpload {
        document: String,
        written: Vec<String>,
        #[source]
        source: anyhow::Error,
    },

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DocvecError {
    pub fn upstream(operation: &'static str, source: anyhow::Error) -> Self {
        Self::Upstream { operation, source }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
