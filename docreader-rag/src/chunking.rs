//! Document chunking strategies.
//!
//! This module provides the [`Chunker`] trait and three implementations:
//!
//! - [`FixedSizeChunker`] — overlapping character windows of a fixed size
//! - [`RecursiveChunker`] — splits hierarchically by paragraphs, sentences, then words
//! - [`MarkdownChunker`] — splits by markdown headers, preserving header context
//!
//! All sizes are counted in characters (Unicode scalar values), so chunk
//! boundaries never split a code point.

use serde_json::Value;

use crate::config::validate_chunking;
use crate::document::{Chunk, Document};
use crate::error::{RagError, Result};

/// A strategy for splitting document text into chunks.
pub trait Chunker: Send + Sync {
    /// Split a document's text into chunks with ascending positions starting at 0.
    ///
    /// Returns an empty `Vec` if the document text is empty.
    fn chunk(&self, document: &Document) -> Vec<Chunk>;
}

/// Resolve the chunks to index for `document`.
///
/// Pre-supplied chunks are returned verbatim (order, ids, and positions
/// untouched) and the chunker is not consulted.
///
/// # Errors
///
/// Returns [`RagError::EmptyInput`] when the document has neither
/// pre-supplied chunks nor non-empty text.
pub fn prepare_chunks(chunker: &dyn Chunker, document: &Document) -> Result<Vec<Chunk>> {
    if let Some(chunks) = document.chunks.as_ref().filter(|c| !c.is_empty()) {
        return Ok(chunks.clone());
    }
    if document.text.is_empty() {
        return Err(RagError::EmptyInput { document_id: document.id.clone() });
    }
    let chunks = chunker.chunk(document);
    if chunks.is_empty() {
        return Err(RagError::ChunkingError(format!(
            "chunker produced no chunks for document '{}'",
            document.id
        )));
    }
    Ok(chunks)
}

fn make_chunk(document: &Document, position: usize, text: String) -> Chunk {
    Chunk {
        id: format!("{}_{position}", document.id),
        text,
        position,
        metadata: document.metadata.clone(),
    }
}

/// Splits text into fixed-size windows with a fixed overlap.
///
/// Windows start every `chunk_size - chunk_overlap` characters. Every window
/// except the last is exactly `chunk_size` long, and the last one ends at the
/// end of the text, so consecutive windows overlap by exactly `chunk_overlap`
/// characters and together cover the whole text.
///
/// Chunk IDs are generated as `{document_id}_{position}`. Each chunk inherits
/// the parent document's metadata.
///
/// # Example
///
/// ```rust,ignore
/// use docreader_rag::FixedSizeChunker;
///
/// let chunker = FixedSizeChunker::new(256, 50)?;
/// let chunks = chunker.chunk(&document);
/// ```
#[derive(Debug, Clone)]
pub struct FixedSizeChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl FixedSizeChunker {
    /// Create a new `FixedSizeChunker`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] unless `chunk_size > chunk_overlap`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        validate_chunking(chunk_size, chunk_overlap)?;
        Ok(Self { chunk_size, chunk_overlap })
    }

    /// Character spans `[start, end)` of each window over a text of `len` characters.
    pub fn spans(&self, len: usize) -> Vec<(usize, usize)> {
        let step = self.chunk_size - self.chunk_overlap;
        let mut spans = Vec::new();
        let mut start = 0;
        while start < len {
            let end = (start + self.chunk_size).min(len);
            spans.push((start, end));
            if end == len {
                break;
            }
            start += step;
        }
        spans
    }
}

impl Chunker for FixedSizeChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        let chars: Vec<char> = document.text.chars().collect();
        self.spans(chars.len())
            .into_iter()
            .enumerate()
            .map(|(position, (start, end))| {
                make_chunk(document, position, chars[start..end].iter().collect())
            })
            .collect()
    }
}

/// Splits text hierarchically: paragraphs → sentences → words.
///
/// First splits by paragraph separators (`\n\n`). If a paragraph exceeds
/// `chunk_size`, splits by sentence boundaries (`. `, `! `, `? `). If a
/// sentence still exceeds `chunk_size`, splits by word boundaries, and
/// finally falls back to overlapping character windows.
///
/// # Example
///
/// ```rust,ignore
/// use docreader_rag::RecursiveChunker;
///
/// let chunker = RecursiveChunker::new(512, 100)?;
/// let chunks = chunker.chunk(&document);
/// ```
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl RecursiveChunker {
    /// Create a new `RecursiveChunker`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] unless `chunk_size > chunk_overlap`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        validate_chunking(chunk_size, chunk_overlap)?;
        Ok(Self { chunk_size, chunk_overlap })
    }
}

const SEPARATORS: [&str; 5] = ["\n\n", ". ", "! ", "? ", " "];

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Split text by a separator, then merge segments into pieces no longer than
/// `chunk_size`. Segments that are still too long are split with the next
/// separator.
fn split_and_merge(
    text: &str,
    chunk_size: usize,
    chunk_overlap: usize,
    separators: &[&str],
) -> Vec<String> {
    let Some((separator, remaining)) = separators.split_first() else {
        return split_by_size(text, chunk_size, chunk_overlap);
    };
    if char_len(text) <= chunk_size {
        return vec![text.to_string()];
    }

    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    let flush = |current: String, current_len: usize, pieces: &mut Vec<String>| {
        if current_len > chunk_size {
            pieces.extend(split_and_merge(&current, chunk_size, chunk_overlap, remaining));
        } else if !current.is_empty() {
            pieces.push(current);
        }
    };

    for segment in text.split_inclusive(separator) {
        let segment_len = char_len(segment);
        if !current.is_empty() && current_len + segment_len > chunk_size {
            flush(std::mem::take(&mut current), current_len, &mut pieces);
            current_len = 0;
        }
        current.push_str(segment);
        current_len += segment_len;
    }
    flush(current, current_len, &mut pieces);

    pieces
}

/// Overlapping character windows, the last resort for unbreakable text.
fn split_by_size(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    FixedSizeChunker { chunk_size, chunk_overlap }
        .spans(chars.len())
        .into_iter()
        .map(|(start, end)| chars[start..end].iter().collect())
        .collect()
}

impl Chunker for RecursiveChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        if document.text.is_empty() {
            return Vec::new();
        }

        split_and_merge(&document.text, self.chunk_size, self.chunk_overlap, &SEPARATORS)
            .into_iter()
            .enumerate()
            .map(|(position, text)| make_chunk(document, position, text))
            .collect()
    }
}

/// Splits text by markdown headers, keeping each section as a chunk.
///
/// Each section is prefixed with its header hierarchy. Sections exceeding
/// `chunk_size` are further split using [`RecursiveChunker`] logic.
/// The `header_path` metadata field records the header hierarchy for each chunk.
#[derive(Debug, Clone)]
pub struct MarkdownChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl MarkdownChunker {
    /// Create a new `MarkdownChunker`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] unless `chunk_size > chunk_overlap`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        validate_chunking(chunk_size, chunk_overlap)?;
        Ok(Self { chunk_size, chunk_overlap })
    }
}

/// A markdown section with its header hierarchy and body text.
struct MarkdownSection {
    header_path: String,
    body: String,
}

impl MarkdownSection {
    fn rendered(&self) -> String {
        match (self.header_path.is_empty(), self.body.is_empty()) {
            (true, _) => self.body.clone(),
            (false, true) => self.header_path.clone(),
            (false, false) => format!("{}\n{}", self.header_path, self.body),
        }
    }
}

fn parse_markdown_sections(text: &str) -> Vec<MarkdownSection> {
    let mut sections = Vec::new();
    let mut headers: Vec<String> = Vec::new();
    let mut header_path = String::new();
    let mut body = String::new();

    for line in text.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with('#') {
            if !body.trim().is_empty() || !header_path.is_empty() {
                sections.push(MarkdownSection {
                    header_path: header_path.clone(),
                    body: body.trim().to_string(),
                });
            }
            body.clear();

            let level = trimmed.chars().take_while(|c| *c == '#').count();
            headers.truncate(level.saturating_sub(1));
            headers.push(trimmed[level..].trim().to_string());
            header_path = headers.join(" > ");
        } else {
            if !body.is_empty() {
                body.push('\n');
            }
            body.push_str(line);
        }
    }

    if !body.trim().is_empty() || !header_path.is_empty() {
        sections.push(MarkdownSection { header_path, body: body.trim().to_string() });
    }

    sections
}

impl Chunker for MarkdownChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        if document.text.is_empty() {
            return Vec::new();
        }

        let mut chunks = Vec::new();
        for section in parse_markdown_sections(&document.text) {
            let text = section.rendered();
            if text.is_empty() {
                continue;
            }

            for piece in split_and_merge(&text, self.chunk_size, self.chunk_overlap, &SEPARATORS) {
                let mut chunk = make_chunk(document, chunks.len(), piece);
                chunk
                    .metadata
                    .insert("header_path".to_string(), Value::from(section.header_path.as_str()));
                chunks.push(chunk);
            }
        }

        chunks
    }
}
