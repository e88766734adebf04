//! Document processing: file → ordered pages + ordered chunks.
//!
//! Supported inputs:
//! - **PDF**: one page per physical page, text extracted with `lopdf`. A page
//!   whose text cannot be decoded becomes an empty page (logged) so page
//!   numbering stays aligned with the file.
//! - **Plain text** (`.txt`, `.md`): pages are separated by form feed
//!   (`\x0c`); a file without form feeds is a single page.
//!
//! Chunks are produced page by page with the recursive
//! [`TextSplitter`], so every chunk carries the page it came from.

use std::path::{Path, PathBuf};

use docvec_core::chunk::TextSplitter;
use docvec_core::models::{Chunk, Page, SplitDocument};
use thiserror::Error;
use tracing::{debug, warn};

const FORM_FEED: char = '\u{c}';

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("unsupported file type: {0}")]
    Unsupported(String),
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
    #[error("file is not valid UTF-8 text")]
    Encoding,
    #[error("failed to read file: {0}")]
    Io(#[from] std::io::Error),
}

/// Turns a file into pages and chunks.
///
/// Implementations do blocking I/O; async callers should run them on a
/// blocking thread.
pub trait DocumentProcessor: Send + Sync {
    fn load_and_split(&self, path: &Path) -> Result<SplitDocument, ExtractError>;
}

/// The built-in processor for PDF and plain-text files.
#[derive(Debug, Clone, Default)]
pub struct FileProcessor {
    splitter: TextSplitter,
}

impl FileProcessor {
    pub fn new(splitter: TextSplitter) -> Self {
        Self { splitter }
    }

    /// Extract pages without chunking.
    pub fn load_pages(&self, path: &Path) -> Result<Vec<Page>, ExtractError> {
        if !path.is_file() {
            return Err(ExtractError::NotFound(path.to_path_buf()));
        }

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "pdf" => pdf_pages(&std::fs::read(path)?),
            "txt" | "text" | "md" | "markdown" => {
                let bytes = std::fs::read(path)?;
                let text = String::from_utf8(bytes).map_err(|_| ExtractError::Encoding)?;
                Ok(text_pages(&text))
            }
            "" => Err(ExtractError::Unsupported("(no extension)".to_string())),
            other => Err(ExtractError::Unsupported(other.to_string())),
        }
    }

    /// Split each page into chunks, tagging every chunk with its page.
    pub fn split_pages(&self, pages: &[Page]) -> Vec<Chunk> {
        pages
            .iter()
            .flat_map(|page| {
                self.splitter
                    .split_text(&page.text)
                    .into_iter()
                    .map(move |text| Chunk {
                        page_index: page.index,
                        text,
                        page_link: None,
                    })
            })
            .collect()
    }
}

impl DocumentProcessor for FileProcessor {
    fn load_and_split(&self, path: &Path) -> Result<SplitDocument, ExtractError> {
        let pages = self.load_pages(path)?;
        let chunks = self.split_pages(&pages);
        debug!(
            file = %path.display(),
            pages = pages.len(),
            chunks = chunks.len(),
            "document split"
        );
        Ok(SplitDocument { pages, chunks })
    }
}

fn pdf_pages(bytes: &[u8]) -> Result<Vec<Page>, ExtractError> {
    let doc = lopdf::Document::load_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))?;

    let mut pages = Vec::new();
    // get_pages is keyed by 1-based page number, in order.
    for number in doc.get_pages().keys().copied() {
        let text = match doc.extract_text(&[number]) {
            Ok(text) => text,
            Err(e) => {
                warn!(page = number, error = %e, "could not extract page text");
                String::new()
            }
        };
        pages.push(Page {
            index: number.saturating_sub(1),
            text,
        });
    }
    Ok(pages)
}

fn text_pages(text: &str) -> Vec<Page> {
    let mut segments: Vec<&str> = text.split(FORM_FEED).collect();
    if segments.len() > 1 && segments.last().is_some_and(|s| s.trim().is_empty()) {
        segments.pop();
    }
    segments
        .into_iter()
        .enumerate()
        .map(|(i, segment)| Page {
            index: i as u32,
            text: segment.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Document, Object, Stream};
    use tempfile::TempDir;

    fn two_page_pdf() -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                "F1" => font_id,
            },
        });

        let mut kids: Vec<Object> = Vec::new();
        for phrase in ["first page text", "second page text"] {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 24.into()]),
                    Operation::new("Td", vec![100.into(), 600.into()]),
                    Operation::new("Tj", vec![Object::string_literal(phrase)]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id =
                doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => 2,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn text_file_pages_split_on_form_feed() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("notes.txt");
        std::fs::write(&path, "page one body\u{c}page two body\u{c}").unwrap();

        let doc = FileProcessor::default().load_and_split(&path).unwrap();
        assert_eq!(doc.pages.len(), 2);
        assert_eq!(doc.pages[0].index, 0);
        assert_eq!(doc.pages[1].text, "page two body");
        assert_eq!(doc.chunks.len(), 2);
        assert_eq!(doc.chunks[1].page_index, 1);
        assert!(doc.chunks.iter().all(|c| c.page_link.is_none()));
    }

    #[test]
    fn long_page_yields_several_chunks_on_that_page() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("long.md");
        let body = "A sentence about indexing documents. ".repeat(60);
        std::fs::write(&path, format!("short\u{c}{}", body)).unwrap();

        let processor = FileProcessor::new(TextSplitter::new(200, 50).unwrap());
        let doc = processor.load_and_split(&path).unwrap();
        let page_two: Vec<&Chunk> = doc.chunks.iter().filter(|c| c.page_index == 1).collect();
        assert!(page_two.len() > 5);
        assert!(page_two.iter().all(|c| c.text.chars().count() <= 200));
    }

    #[test]
    fn pdf_pages_follow_physical_pages() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("report.pdf");
        std::fs::write(&path, two_page_pdf()).unwrap();

        let pages = FileProcessor::default().load_pages(&path).unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].index, 0);
        assert_eq!(pages[1].index, 1);
    }

    #[test]
    fn invalid_pdf_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("broken.pdf");
        std::fs::write(&path, b"this is not a pdf").unwrap();

        let err = FileProcessor::default().load_and_split(&path).unwrap_err();
        assert!(matches!(err, ExtractError::Pdf(_)));
    }

    #[test]
    fn missing_and_unsupported_files() {
        let tmp = TempDir::new().unwrap();
        let missing = FileProcessor::default()
            .load_and_split(&tmp.path().join("nope.pdf"))
            .unwrap_err();
        assert!(matches!(missing, ExtractError::NotFound(_)));

        let path = tmp.path().join("sheet.xlsx");
        std::fs::write(&path, b"PK").unwrap();
        let unsupported = FileProcessor::default().load_and_split(&path).unwrap_err();
        assert!(matches!(unsupported, ExtractError::Unsupported(ext) if ext == "xlsx"));
    }
}
