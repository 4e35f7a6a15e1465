//! Overlapping fixed-size text chunker.
//!
//! Splits each document's text into [`Chunk`]s of at most `chunk_size`
//! characters, where consecutive chunks of the same document share exactly
//! `chunk_overlap` characters.
//!
//! # Algorithm
//!
//! 1. Join the trimmed text of every non-empty page with a blank line,
//!    remembering the character offset where each page starts.
//! 2. Open a window of `chunk_size` characters at the current start.
//! 3. If the window reaches the end of the text, it becomes the last chunk.
//! 4. Otherwise end the window at the last paragraph break (`\n\n`), then
//!    line break, then whitespace, provided the cut still leaves more than
//!    `chunk_overlap` characters in the chunk. With no such boundary the
//!    window is cut hard at `chunk_size`.
//! 5. The next window starts `chunk_overlap` characters before the cut.
//!
//! Lengths and offsets are counted in characters, never bytes, so
//! multi-byte text is never split inside a code point.
//!
//! # Example
//!
//! ```rust
//! use pdfqa_core::chunk::{split_documents, ChunkParams};
//! use pdfqa_core::models::{Document, Page};
//!
//! let doc = Document::new("notes.pdf", vec![Page { number: 1, text: "Hello world.".into() }]);
//! let chunks = split_documents(&[doc], ChunkParams::default());
//! assert_eq!(chunks.len(), 1);
//! assert_eq!(chunks[0].text, "Hello world.");
//! ```

use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Chunk, Document, Page};

/// Separator inserted between consecutive pages of a document.
const PAGE_SEPARATOR: &str = "\n\n";

/// Chunk size and overlap, both in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkParams {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid chunking parameters: {0}")]
pub struct InvalidChunkParams(String);

impl ChunkParams {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, InvalidChunkParams> {
        if chunk_size == 0 {
            return Err(InvalidChunkParams("chunk_size must be > 0".to_string()));
        }
        if chunk_overlap >= chunk_size {
            return Err(InvalidChunkParams(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                chunk_overlap, chunk_size
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }
}

impl Default for ChunkParams {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 100,
        }
    }
}

/// A window of text produced by [`split_text`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextWindow<'a> {
    /// Character offset of the window start.
    pub start: usize,
    pub text: &'a str,
}

/// Split every document into chunks, in document order then position order.
///
/// Documents with no extractable text contribute zero chunks.
pub fn split_documents(documents: &[Document], params: ChunkParams) -> Vec<Chunk> {
    let mut chunks = Vec::new();

    for (document_index, doc) in documents.iter().enumerate() {
        let source = doc.source();
        let (text, page_starts) = join_pages(&doc.pages);

        for (chunk_index, window) in split_text(&text, params).into_iter().enumerate() {
            let page = page_at(&page_starts, window.start);
            chunks.push(make_chunk(
                &source,
                document_index,
                chunk_index,
                window.start,
                page,
                window.text,
            ));
        }
    }

    chunks
}

/// Split a single text into overlapping windows.
///
/// Whitespace-only windows are dropped, so the result never contains an
/// empty chunk. An empty input yields no windows.
pub fn split_text(text: &str, params: ChunkParams) -> Vec<TextWindow<'_>> {
    let chars: Vec<char> = text.chars().collect();
    let bounds: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let n = chars.len();

    let mut windows = Vec::new();
    let mut start = 0usize;

    while start < n {
        let hard_end = (start + params.chunk_size).min(n);
        let end = if hard_end == n {
            n
        } else {
            find_break(&chars, start + params.chunk_overlap + 1, hard_end).unwrap_or(hard_end)
        };

        let slice = &text[bounds[start]..bounds[end]];
        if !slice.trim().is_empty() {
            windows.push(TextWindow { start, text: slice });
        }

        if end == n {
            break;
        }
        start = end - params.chunk_overlap;
    }

    windows
}

/// Find the preferred cut position in `min_end..=max_end`.
///
/// A cut at `end` means the chunk covers `chars[..end]`, so the boundary
/// character is `chars[end - 1]`.
fn find_break(chars: &[char], min_end: usize, max_end: usize) -> Option<usize> {
    if min_end > max_end {
        return None;
    }

    let paragraph = |end: usize| end >= 2 && chars[end - 1] == '\n' && chars[end - 2] == '\n';
    let line = |end: usize| chars[end - 1] == '\n';
    let space = |end: usize| chars[end - 1].is_whitespace();

    let boundaries: [&dyn Fn(usize) -> bool; 3] = [&paragraph, &line, &space];
    for is_boundary in boundaries {
        if let Some(end) = (min_end..=max_end).rev().find(|&end| is_boundary(end)) {
            return Some(end);
        }
    }
    None
}

/// Concatenate trimmed, non-empty pages and record where each one starts.
fn join_pages(pages: &[Page]) -> (String, Vec<(usize, u32)>) {
    let mut text = String::new();
    let mut page_starts = Vec::new();
    let mut offset = 0usize;

    for page in pages {
        let trimmed = page.text.trim();
        if trimmed.is_empty() {
            continue;
        }
        if !text.is_empty() {
            text.push_str(PAGE_SEPARATOR);
            offset += PAGE_SEPARATOR.chars().count();
        }
        page_starts.push((offset, page.number));
        text.push_str(trimmed);
        offset += trimmed.chars().count();
    }

    (text, page_starts)
}

fn page_at(page_starts: &[(usize, u32)], offset: usize) -> u32 {
    page_starts
        .iter()
        .take_while(|(start, _)| *start <= offset)
        .last()
        .map(|(_, number)| *number)
        .unwrap_or(1)
}

fn make_chunk(
    source: &str,
    document_index: usize,
    chunk_index: usize,
    start: usize,
    page: u32,
    text: &str,
) -> Chunk {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let hash = format!("{:x}", hasher.finalize());

    let name = format!("{}#{}#{}", source, document_index, chunk_index);
    let id = Uuid::new_v5(&Uuid::NAMESPACE_URL, name.as_bytes()).to_string();

    Chunk {
        id,
        source: source.to_string(),
        document_index,
        chunk_index,
        start,
        page,
        text: text.to_string(),
        hash,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(size: usize, overlap: usize) -> ChunkParams {
        ChunkParams::new(size, overlap).unwrap()
    }

    fn doc(path: &str, pages: &[&str]) -> Document {
        Document::new(
            path,
            pages
                .iter()
                .enumerate()
                .map(|(i, t)| Page {
                    number: i as u32 + 1,
                    text: t.to_string(),
                })
                .collect(),
        )
    }

    #[test]
    fn test_rejects_overlap_not_smaller_than_size() {
        assert!(ChunkParams::new(10, 10).is_err());
        assert!(ChunkParams::new(0, 0).is_err());
        assert!(ChunkParams::new(10, 9).is_ok());
    }

    #[test]
    fn test_small_text_single_chunk() {
        let chunks = split_documents(&[doc("a.pdf", &["Hello, world!"])], params(100, 10));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].chunk_index, 0);
        assert_eq!(chunks[0].text, "Hello, world!");
        assert_eq!(chunks[0].page, 1);
    }

    #[test]
    fn test_empty_document_yields_no_chunks() {
        let chunks = split_documents(&[doc("a.pdf", &["", "   \n  "])], params(100, 10));
        assert!(chunks.is_empty());
    }

    #[test]
    fn test_chunks_never_exceed_size() {
        let text = (0..200)
            .map(|i| format!("word{}", i))
            .collect::<Vec<_>>()
            .join(" ");
        for w in split_text(&text, params(50, 10)) {
            assert!(w.text.chars().count() <= 50, "too long: {:?}", w.text);
            assert!(!w.text.trim().is_empty());
        }
    }

    #[test]
    fn test_consecutive_chunks_overlap_exactly() {
        let text = "The quick brown fox jumps over the lazy dog. ".repeat(30);
        let windows = split_text(&text, params(80, 15));
        assert!(windows.len() > 2);
        for pair in windows.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            let a_len = a.text.chars().count();
            assert_eq!(b.start, a.start + a_len - 15);
            let a_tail: String = a.text.chars().skip(a_len - 15).collect();
            let b_head: String = b.text.chars().take(15).collect();
            assert_eq!(a_tail, b_head);
        }
    }

    #[test]
    fn test_prefers_paragraph_breaks() {
        let text = format!("{}\n\n{}", "a".repeat(40), "b".repeat(40));
        let windows = split_text(&text, params(60, 5));
        assert_eq!(windows[0].text, format!("{}\n\n", "a".repeat(40)));
    }

    #[test]
    fn test_hard_split_without_whitespace() {
        let text = "x".repeat(25);
        let windows = split_text(&text, params(10, 2));
        assert_eq!(windows[0].text.len(), 10);
        assert_eq!(windows[1].start, 8);
        assert_eq!(windows.last().unwrap().text.chars().last(), Some('x'));
    }

    #[test]
    fn test_multibyte_utf8_chars() {
        let text = "┌──────────────────┐\n│ Héllo wörld      │\n└──────────────────┘";
        let windows = split_text(text, params(7, 2));
        assert!(!windows.is_empty());
        for w in &windows {
            assert!(w.text.chars().count() <= 7);
        }
    }

    #[test]
    fn test_order_follows_documents_then_position() {
        let long = "Sentence number one is here. ".repeat(10);
        let docs = vec![doc("first.pdf", &[&long]), doc("second.pdf", &[&long])];
        let chunks = split_documents(&docs, params(60, 10));

        let first_count = chunks.iter().filter(|c| c.document_index == 0).count();
        assert!(first_count > 1);
        for (i, c) in chunks.iter().enumerate() {
            if i < first_count {
                assert_eq!(c.source, "first.pdf");
                assert_eq!(c.chunk_index, i);
            } else {
                assert_eq!(c.source, "second.pdf");
                assert_eq!(c.chunk_index, i - first_count);
            }
        }
    }

    #[test]
    fn test_page_numbers_follow_chunk_start() {
        let docs = vec![doc("a.pdf", &["Page one text.", "", "Page three text."])];
        let chunks = split_documents(&docs, params(16, 2));
        assert_eq!(chunks.first().unwrap().page, 1);
        assert_eq!(chunks.last().unwrap().page, 3);
    }

    #[test]
    fn test_deterministic() {
        let text = "Alpha\n\nBeta\n\nGamma\n\nDelta ".repeat(20);
        let docs = vec![doc("a.pdf", &[&text])];
        let c1 = split_documents(&docs, params(40, 8));
        let c2 = split_documents(&docs, params(40, 8));
        assert_eq!(c1, c2);
    }
}
