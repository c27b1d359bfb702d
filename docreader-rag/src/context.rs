//! Retrieved context and token-budget packing.

use serde::{Deserialize, Serialize};

use crate::document::{DOCUMENT_ID_KEY, Metadata, SearchResult, metadata_value_to_string};

/// Characters per token used by [`estimate_tokens`].
pub const CHARS_PER_TOKEN: usize = 4;

/// One chunk of retrieved context.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContextChunk {
    pub text: String,
    pub score: f32,
    #[serde(default)]
    pub metadata: Metadata,
}

impl ContextChunk {
    /// The parent document id recorded in the metadata, if any.
    pub fn document_id(&self) -> Option<String> {
        self.metadata.get(DOCUMENT_ID_KEY).map(metadata_value_to_string)
    }
}

impl From<SearchResult> for ContextChunk {
    fn from(result: SearchResult) -> Self {
        Self { text: result.text, score: result.score, metadata: result.metadata.unwrap_or_default() }
    }
}

/// The ordered context selected for a query.
///
/// `document_ids` lists each distinct parent document once, in order of first
/// appearance, and `total_chunks` always equals `chunks.len()`. Build through
/// [`RagContext::from_chunks`] to keep both in step.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RagContext {
    pub chunks: Vec<ContextChunk>,
    pub document_ids: Vec<String>,
    pub total_chunks: usize,
}

impl RagContext {
    pub fn from_chunks(chunks: Vec<ContextChunk>) -> Self {
        let mut document_ids: Vec<String> = Vec::new();
        for id in chunks.iter().filter_map(ContextChunk::document_id) {
            if !document_ids.contains(&id) {
                document_ids.push(id);
            }
        }
        Self { total_chunks: chunks.len(), document_ids, chunks }
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

/// Approximate token count of `text`: one token per four characters, rounded up.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(CHARS_PER_TOKEN)
}

/// Pack `chunks` into `token_budget`, keeping their order.
///
/// `chunks` are expected in descending relevance order. Each chunk is taken
/// whole if it fits in what is left of the budget and skipped otherwise, so a
/// smaller, less relevant chunk can still fill space a large one could not.
/// The result is a subsequence of the input whose estimated tokens never
/// exceed the budget.
pub fn assemble_context_within_budget(
    chunks: &[ContextChunk],
    token_budget: usize,
) -> Vec<ContextChunk> {
    let mut remaining = token_budget;
    let mut accepted = Vec::new();
    for chunk in chunks {
        let cost = estimate_tokens(&chunk.text);
        if cost <= remaining {
            remaining -= cost;
            accepted.push(chunk.clone());
        }
    }
    accepted
}
