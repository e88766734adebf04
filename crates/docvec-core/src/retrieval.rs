//! Page-level context selection for retrieval-augmented answers.
//!
//! Chunk hits arrive ranked by similarity. Several chunks usually come from
//! the same page, so [`unique_pages`] walks the ranking and keeps the first
//! occurrence of each page number, stopping at a cap. The surviving pages
//! are fetched whole and joined by [`join_sources`].

/// Separator between page texts in the sources block.
pub const SOURCES_SEPARATOR: &str = "\n\n";

/// First-seen-wins dedup of ranked page numbers, bounded by `max_pages`.
///
/// Page number `0` marks a hit without a page and is skipped.
///
/// ```rust
/// use docvec_core::retrieval::unique_pages;
///
/// assert_eq!(unique_pages([3, 1, 3, 2, 1, 5], 3), vec![3, 1, 2]);
/// ```
pub fn unique_pages<I>(ranked: I, max_pages: usize) -> Vec<u32>
where
    I: IntoIterator<Item = u32>,
{
    let mut pages = Vec::new();
    if max_pages == 0 {
        return pages;
    }

    for page in ranked {
        if page == 0 || pages.contains(&page) {
            continue;
        }
        pages.push(page);
        if pages.len() >= max_pages {
            break;
        }
    }
    pages
}

/// Join page texts into the sources block handed to the prompt.
pub fn join_sources<S: AsRef<str>>(texts: &[S]) -> String {
    texts
        .iter()
        .map(|t| t.as_ref())
        .collect::<Vec<_>>()
        .join(SOURCES_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_seen_order_with_cap() {
        assert_eq!(unique_pages(vec![3, 1, 3, 2, 1, 5], 3), vec![3, 1, 2]);
    }

    #[test]
    fn test_fewer_unique_than_cap() {
        assert_eq!(unique_pages(vec![2, 2, 2], 3), vec![2]);
        assert!(unique_pages(Vec::new(), 3).is_empty());
    }

    #[test]
    fn test_zero_cap() {
        assert!(unique_pages(vec![1, 2], 0).is_empty());
    }

    #[test]
    fn test_missing_page_numbers_skipped() {
        assert_eq!(unique_pages(vec![0, 4, 0, 4, 9], 5), vec![4, 9]);
    }

    #[test]
    fn test_join_sources() {
        assert_eq!(join_sources(&["one", "two"]), "one\n\ntwo");
        assert_eq!(join_sources::<&str>(&[]), "");
    }
}
