//! Data types for documents, chunks, embedding records, and search results.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Free-form metadata attached to documents, chunks, and records.
pub type Metadata = HashMap<String, Value>;

/// Metadata key carrying the parent document id on every stored record.
pub const DOCUMENT_ID_KEY: &str = "documentId";

/// Metadata key carrying the chunk ordinal on every stored record.
pub const POSITION_KEY: &str = "position";

/// A source document supplied by the caller.
///
/// `text` may be empty only when `chunks` is supplied; pre-built chunks are
/// indexed verbatim and bypass chunking.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Unique identifier for the document.
    pub id: String,
    /// The text content of the document.
    pub text: String,
    /// Key-value metadata associated with the document.
    #[serde(default)]
    pub metadata: Metadata,
    /// Pre-built chunks, used instead of chunking `text` when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunks: Option<Vec<Chunk>>,
}

impl Document {
    /// Create a document with the given id and text and no metadata.
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self { id: id.into(), text: text.into(), ..Default::default() }
    }

    /// Attach a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Supply pre-built chunks.
    pub fn with_chunks(mut self, chunks: Vec<Chunk>) -> Self {
        self.chunks = Some(chunks);
        self
    }
}

/// A bounded slice of a [`Document`], the unit of embedding and retrieval.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Unique identifier for the chunk.
    pub id: String,
    /// The text content of the chunk.
    pub text: String,
    /// Ordinal of the chunk within its parent document.
    pub position: usize,
    /// Metadata inherited from the parent document plus chunk-specific fields.
    #[serde(default)]
    pub metadata: Metadata,
}

/// The unit persisted to a vector store.
///
/// `metadata` always carries [`DOCUMENT_ID_KEY`] and [`POSITION_KEY`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingRecord {
    pub id: String,
    pub vector: Vec<f32>,
    pub text: String,
    pub metadata: Metadata,
}

impl EmbeddingRecord {
    /// Build a record for `chunk` of `document_id`, stamping the document id
    /// and position into the metadata.
    pub fn from_chunk(document_id: &str, chunk: &Chunk, vector: Vec<f32>) -> Self {
        let mut metadata = chunk.metadata.clone();
        metadata.insert(DOCUMENT_ID_KEY.to_string(), Value::from(document_id));
        metadata.insert(POSITION_KEY.to_string(), Value::from(chunk.position));
        Self { id: chunk.id.clone(), vector, text: chunk.text.clone(), metadata }
    }
}

/// A single hit returned by a vector store search.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    /// Id of the stored record.
    pub id: String,
    /// The chunk text.
    pub text: String,
    /// Relevance in `[0, 1]`, higher is more relevant.
    pub score: f32,
    /// Record metadata, if the store returned it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl SearchResult {
    /// The parent document id recorded in the metadata, if any.
    pub fn document_id(&self) -> Option<String> {
        self.metadata.as_ref().and_then(|m| m.get(DOCUMENT_ID_KEY)).map(metadata_value_to_string)
    }
}

/// Render a metadata value as plain text: strings without quotes, everything
/// else as JSON.
pub fn metadata_value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Acknowledgement returned by [`VectorStore::upsert`](crate::vectorstore::VectorStore::upsert).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpsertAck {
    pub upserted_count: usize,
    pub ids: Vec<String>,
}
