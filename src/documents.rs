//! Per-document orchestration: upload, retrieval, answers and deletion.
//!
//! A source document is identified by its **basename**, the file name up to
//! the first `.`. Each basename owns exactly two collections:
//!
//! | Collection | Contents |
//! |------------|----------|
//! | `<basename>_pages` | one record per physical page, used as answer context |
//! | `<basename>_chunks` | overlapping windows, searched for relevance |
//!
//! Every chunk payload carries the pages collection name as `page_link`.
//! Answering a question ranks chunks, keeps the distinct page numbers of the
//! best hits, and fetches those full pages from the pages collection.
//!
//! Uploaded files are copied into a managed storage directory. Uploading a
//! file with the same basename again overwrites the stored copy, and both
//! collections are dropped and rebuilt once the new file has been
//! extracted. Concurrent uploads of one basename are not coordinated.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use docvec_core::llm::LanguageModel;
use docvec_core::prompt::PromptTemplate;
use docvec_core::retrieval::join_sources;

use crate::config::Config;
use crate::error::{DocvecError, Result};
use crate::processor::DocumentProcessor;
use crate::progress::{NoProgress, UploadProgressEvent, UploadProgressReporter};
use crate::repository::VectorIndexRepository;

pub const PAGES_SUFFIX: &str = "_pages";
pub const CHUNKS_SUFFIX: &str = "_chunks";

/// The collection pair owned by one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentCollections {
    pub basename: String,
    pub pages: String,
    pub chunks: String,
}

impl DocumentCollections {
    /// Derive both names from a file name or path.
    ///
    /// ```
    /// use docvec::documents::DocumentCollections;
    ///
    /// let names = DocumentCollections::for_file("report.v2.pdf").unwrap();
    /// assert_eq!(names.pages, "report_pages");
    /// assert_eq!(names.chunks, "report_chunks");
    /// ```
    pub fn for_file(filename: &str) -> Result<Self> {
        let basename = basename(filename);
        if basename.trim().is_empty() {
            return Err(DocvecError::Validation(format!(
                "'{}' has no usable basename",
                filename
            )));
        }
        Ok(Self {
            basename: basename.to_string(),
            pages: format!("{}{}", basename, PAGES_SUFFIX),
            chunks: format!("{}{}", basename, CHUNKS_SUFFIX),
        })
    }

    pub fn names(&self) -> [&str; 2] {
        [&self.pages, &self.chunks]
    }
}

/// File name portion before the first `.`; directories are ignored.
pub fn basename(filename: &str) -> &str {
    let name = Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("");
    name.split('.').next().unwrap_or("")
}

/// Whether `name` looks like a collection managed by this crate.
pub fn is_document_collection(name: &str) -> bool {
    name.ends_with(PAGES_SUFFIX) || name.ends_with(CHUNKS_SUFFIX)
}

/// Settings for building answers.
#[derive(Debug, Clone)]
pub struct AnswerSettings {
    pub model: String,
    pub temperature: f32,
    /// Distinct pages fetched as context.
    pub max_pages: usize,
    pub prompt: PromptTemplate,
}

impl AnswerSettings {
    pub fn from_config(config: &Config) -> Self {
        let prompt = PromptTemplate::new(config.prompt.template.clone());
        if config.prompt.template.is_some() && !prompt.is_custom() {
            warn!("prompt template must contain {{query}} and {{sources}}; using the default");
        }
        Self {
            model: config.llm.model.clone(),
            temperature: config.llm.temperature,
            max_pages: config.retrieval.max_pages,
            prompt,
        }
    }
}

/// Outcome of a successful upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReport {
    pub document: String,
    pub stored_path: PathBuf,
    pub collections: DocumentCollections,
    pub pages_written: usize,
    pub chunks_written: usize,
}

pub struct DocumentVectors {
    storage_dir: PathBuf,
    repository: VectorIndexRepository,
    processor: Arc<dyn DocumentProcessor>,
    llm: Arc<dyn LanguageModel>,
    answer: AnswerSettings,
    progress: Arc<dyn UploadProgressReporter>,
}

impl DocumentVectors {
    pub fn new(
        storage_dir: impl Into<PathBuf>,
        repository: VectorIndexRepository,
        processor: Arc<dyn DocumentProcessor>,
        llm: Arc<dyn LanguageModel>,
        answer: AnswerSettings,
    ) -> Self {
        Self {
            storage_dir: storage_dir.into(),
            repository,
            processor,
            llm,
            answer,
            progress: Arc::new(NoProgress),
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn UploadProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    /// Copy `path` into managed storage and index it as pages and chunks.
    pub async fn upload_document(&self, path: &Path) -> Result<UploadReport> {
        if !path.is_file() {
            return Err(DocvecError::NotFound(path.display().to_string()));
        }
        let document = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                DocvecError::Validation(format!("'{}' has no usable file name", path.display()))
            })?
            .to_string();
        let collections = DocumentCollections::for_file(&document)?;

        tokio::fs::create_dir_all(&self.storage_dir).await?;
        let stored_path = self.storage_dir.join(&document);
        if !is_same_file(path, &stored_path).await {
            tokio::fs::copy(path, &stored_path).await?;
        }
        info!(document = %document, stored = %stored_path.display(), "document stored");

        self.progress.report(UploadProgressEvent::Processing {
            document: document.clone(),
        });
        let processor = Arc::clone(&self.processor);
        let source_path = stored_path.clone();
        let split = tokio::task::spawn_blocking(move || processor.load_and_split(&source_path))
            .await
            .map_err(|e| DocvecError::upstream("document processing", e.into()))?
            .map_err(|source| DocvecError::Extract {
                file: document.clone(),
                source,
            })?;

        let chunks: Vec<_> = split
            .chunks
            .into_iter()
            .map(|chunk| chunk.with_page_link(&collections.pages))
            .collect();

        for name in collections.names() {
            let replaced = self
                .repository
                .delete_collection(name)
                .await
                .map_err(|e| DocvecError::upstream("delete collection", e))?;
            if replaced {
                info!(collection = name, "replacing previous upload");
            }
        }

        self.report_indexing(&collections.pages, split.pages.len());
        let pages_result = self
            .repository
            .upload_pages(&collections.pages, &split.pages, &document)
            .await;
        if let Ok(written) = &pages_result {
            self.report_indexed(&collections.pages, *written, split.pages.len());
        }

        self.report_indexing(&collections.chunks, chunks.len());
        let chunks_result = self
            .repository
            .upload_chunks(&collections.chunks, &chunks, &document)
            .await;
        if let Ok(written) = &chunks_result {
            self.report_indexed(&collections.chunks, *written, chunks.len());
        }

        let (pages_written, chunks_written) = match (pages_result, chunks_result) {
            (Ok(p), Ok(c)) => (p, c),
            (Err(pages_err), Err(chunks_err)) => {
                warn!(collection = %collections.chunks, error = %chunks_err, "chunk upload failed");
                return Err(DocvecError::upstream("upload", pages_err));
            }
            (Ok(p), Err(e)) => {
                return Err(partial(&document, p, &collections.pages, e));
            }
            (Err(e), Ok(c)) => {
                return Err(partial(&document, c, &collections.chunks, e));
            }
        };

        info!(
            document = %document,
            pages = pages_written,
            chunks = chunks_written,
            "document indexed"
        );
        Ok(UploadReport {
            document,
            stored_path,
            collections,
            pages_written,
            chunks_written,
        })
    }

    fn report_indexing(&self, collection: &str, records: usize) {
        self.progress.report(UploadProgressEvent::Indexing {
            collection: collection.to_string(),
            records: records as u64,
        });
    }

    fn report_indexed(&self, collection: &str, written: usize, records: usize) {
        self.progress.report(UploadProgressEvent::Indexed {
            collection: collection.to_string(),
            written: written as u64,
            records: records as u64,
        });
    }

    /// Texts of the chunks most similar to `query`, best first.
    pub async fn find_chunks(&self, filename: &str, query: &str) -> Result<Vec<String>> {
        let collections = validated(filename, query)?;
        let settings = self.repository.settings();
        let hits = self
            .repository
            .search(
                &collections.chunks,
                query,
                settings.search_limit,
                settings.score_threshold,
            )
            .await
            .map_err(|e| DocvecError::upstream("search", e))?;
        Ok(hits.into_iter().map(|hit| hit.text).collect())
    }

    /// Answer `query` from the most relevant pages of `filename`.
    pub async fn answer_query(&self, filename: &str, query: &str) -> Result<String> {
        let collections = validated(filename, query)?;

        let pages = self
            .repository
            .relevant_pages(&collections.chunks, query, self.answer.max_pages)
            .await
            .map_err(|e| DocvecError::upstream("search", e))?;

        let mut sources = Vec::with_capacity(pages.len());
        for page_number in &pages {
            match self
                .repository
                .fetch_page_text(&collections.pages, *page_number)
                .await
                .map_err(|e| DocvecError::upstream("page lookup", e))?
            {
                Some(text) => sources.push(text),
                None => debug!(page = page_number, "page text missing"),
            }
        }
        debug!(
            document = %collections.basename,
            pages = ?pages,
            found = sources.len(),
            "answer context assembled"
        );

        let prompt = self
            .answer
            .prompt
            .build_prompt(query, &join_sources(sources.as_slice()));
        let answer = self
            .llm
            .generate(&prompt, &self.answer.model, self.answer.temperature)
            .await
            .map_err(|e| DocvecError::upstream("generation", e))?;
        info!(llm = self.llm.name(), model = %self.answer.model, "answer generated");
        Ok(answer)
    }

    /// Remove both collections, then the stored file.
    ///
    /// Returns the collections that existed and were deleted.
    pub async fn delete_document(&self, filename: &str) -> Result<Vec<String>> {
        if filename.trim().is_empty() {
            return Err(DocvecError::Validation("filename must not be empty".into()));
        }
        let collections = DocumentCollections::for_file(filename)?;
        let stored_path = self.stored_path(filename)?;
        if !stored_path.is_file() {
            return Err(DocvecError::NotFound(filename.to_string()));
        }

        let mut deleted = Vec::new();
        for name in collections.names() {
            if self
                .repository
                .delete_collection(name)
                .await
                .map_err(|e| DocvecError::upstream("delete collection", e))?
            {
                deleted.push(name.to_string());
            }
        }

        tokio::fs::remove_file(&stored_path).await?;
        info!(document = filename, collections = ?deleted, "document deleted");
        Ok(deleted)
    }

    /// Delete every document collection and every stored file.
    ///
    /// Collections that fail to delete are logged and left out of the result.
    pub async fn clear_all(&self) -> Result<Vec<String>> {
        let names = self.list_collections().await?;
        let deleted = self.repository.delete_collections(&names).await;

        let mut removed = 0usize;
        if self.storage_dir.is_dir() {
            let mut entries = tokio::fs::read_dir(&self.storage_dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                if entry.file_type().await?.is_file() {
                    tokio::fs::remove_file(entry.path()).await?;
                    removed += 1;
                }
            }
        }
        info!(collections = deleted.len(), files = removed, "storage cleared");
        Ok(deleted)
    }

    /// Names of all document collections in the store, sorted.
    pub async fn list_collections(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self
            .repository
            .list_collections()
            .await
            .map_err(|e| DocvecError::upstream("list collections", e))?
            .into_iter()
            .filter(|name| is_document_collection(name))
            .collect();
        names.sort();
        Ok(names)
    }

    /// File names in managed storage, sorted.
    pub async fn list_documents(&self) -> Result<Vec<String>> {
        if !self.storage_dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut documents = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.storage_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                if let Some(name) = entry.file_name().to_str() {
                    documents.push(name.to_string());
                }
            }
        }
        documents.sort();
        Ok(documents)
    }

    fn stored_path(&self, filename: &str) -> Result<PathBuf> {
        let name = Path::new(filename)
            .file_name()
            .ok_or_else(|| DocvecError::Validation(format!("'{}' is not a file name", filename)))?;
        Ok(self.storage_dir.join(name))
    }
}

fn validated(filename: &str, query: &str) -> Result<DocumentCollections> {
    if filename.trim().is_empty() {
        return Err(DocvecError::Validation("filename must not be empty".into()));
    }
    if query.trim().is_empty() {
        return Err(DocvecError::Validation("query must not be empty".into()));
    }
    DocumentCollections::for_file(filename)
}

fn partial(document: &str, written: usize, collection: &str, source: anyhow::Error) -> DocvecError {
    if written == 0 {
        return DocvecError::upstream("upload", source);
    }
    DocvecError::PartialUpload {
        document: document.to_string(),
        written: vec![collection.to_string()],
        source,
    }
}

/// Uploading a file that already lives in managed storage must not copy it onto itself.
async fn is_same_file(a: &Path, b: &Path) -> bool {
    match (tokio::fs::canonicalize(a).await, tokio::fs::canonicalize(b).await) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basename_stops_at_first_dot() {
        assert_eq!(basename("report.v2.pdf"), "report");
        assert_eq!(basename("notes"), "notes");
        assert_eq!(basename("/tmp/docs/manual.txt"), "manual");
        assert_eq!(basename(".hidden"), "");
    }

    #[test]
    fn collection_names_from_file() {
        let names = DocumentCollections::for_file("report.v2.pdf").unwrap();
        assert_eq!(names.basename, "report");
        assert_eq!(names.names(), ["report_pages", "report_chunks"]);
    }

    #[test]
    fn unusable_basename_is_validation() {
        for bad in ["", ".pdf", "   .txt"] {
            let err = DocumentCollections::for_file(bad).unwrap_err();
            assert!(matches!(err, DocvecError::Validation(_)), "{bad:?}");
        }
    }

    #[test]
    fn document_collection_filter() {
        assert!(is_document_collection("report_pages"));
        assert!(is_document_collection("report_chunks"));
        assert!(!is_document_collection("embeddings"));
        assert!(!is_document_collection("pages_archive"));
    }

    #[test]
    fn empty_query_is_validation() {
        assert!(matches!(
            validated("report.pdf", "  "),
            Err(DocvecError::Validation(_))
        ));
        assert!(matches!(
            validated("", "what?"),
            Err(DocvecError::Validation(_))
        ));
        assert_eq!(validated("report.pdf", "what?").unwrap().chunks, "report_chunks");
    }
}
