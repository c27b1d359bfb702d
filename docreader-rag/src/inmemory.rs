//! In-memory vector store using cosine similarity.
//!
//! [`InMemoryVectorStore`] keeps records in a `HashMap` behind a
//! `tokio::sync::RwLock`. It is suitable for development, tests, and small
//! single-process deployments.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::document::{EmbeddingRecord, SearchResult, UpsertAck};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::vectorstore::{SearchOptions, VectorStore};

const BACKEND: &str = "InMemory";

#[derive(Debug, Clone)]
struct StoredRecord {
    seq: u64,
    record: EmbeddingRecord,
}

#[derive(Debug, Default)]
struct Records {
    next_seq: u64,
    by_id: HashMap<String, StoredRecord>,
}

/// An in-memory vector store using cosine similarity for search.
///
/// Query text is embedded with the injected [`EmbeddingProvider`]. Scores are
/// cosine similarities clamped to `[0, 1]`; equal scores keep insertion order.
/// An empty query returns the filter-matching records in insertion order with
/// score `0.0`.
///
/// # Example
///
/// ```rust,ignore
/// use docreader_rag::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new(Arc::new(my_embedder));
/// store.upsert(&records).await?;
/// ```
pub struct InMemoryVectorStore {
    embedder: Arc<dyn EmbeddingProvider>,
    records: RwLock<Records>,
}

impl InMemoryVectorStore {
    /// Create a new empty store that embeds queries with `embedder`.
    pub fn new(embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { embedder, records: RwLock::new(Records::default()) }
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.records.read().await.by_id.len()
    }

    /// Whether the store holds no records.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude or the lengths differ.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn upsert(&self, records: &[EmbeddingRecord]) -> Result<UpsertAck> {
        let mut store = self.records.write().await;
        let mut ids = Vec::with_capacity(records.len());
        for record in records {
            let seq = match store.by_id.get(&record.id) {
                Some(existing) => existing.seq,
                None => {
                    store.next_seq += 1;
                    store.next_seq
                }
            };
            store.by_id.insert(record.id.clone(), StoredRecord { seq, record: record.clone() });
            ids.push(record.id.clone());
        }
        debug!(backend = BACKEND, count = ids.len(), "upserted records");
        Ok(UpsertAck { upserted_count: ids.len(), ids })
    }

    async fn search(&self, query: &str, options: &SearchOptions) -> Result<Vec<SearchResult>> {
        let query_vector = if query.is_empty() {
            None
        } else {
            Some(self.embedder.embed(query).await.map_err(|e| RagError::VectorStoreError {
                backend: BACKEND.to_string(),
                message: format!("query embedding failed: {e}"),
            })?)
        };

        let store = self.records.read().await;
        let mut scored: Vec<(u64, SearchResult)> = store
            .by_id
            .values()
            .filter(|stored| {
                options.filter.as_ref().is_none_or(|f| f.matches(Some(&stored.record.metadata)))
            })
            .filter_map(|stored| {
                let score = match &query_vector {
                    Some(q) => cosine_similarity(&stored.record.vector, q).clamp(0.0, 1.0),
                    None => 0.0,
                };
                if query_vector.is_some() && options.min_relevance.is_some_and(|min| score < min) {
                    return None;
                }
                let record = &stored.record;
                Some((
                    stored.seq,
                    SearchResult {
                        id: record.id.clone(),
                        text: record.text.clone(),
                        score,
                        metadata: Some(record.metadata.clone()),
                    },
                ))
            })
            .collect();

        scored.sort_by(|(seq_a, a), (seq_b, b)| {
            b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal).then(seq_a.cmp(seq_b))
        });
        scored.truncate(options.top_k);
        debug!(backend = BACKEND, result_count = scored.len(), "search completed");
        Ok(scored.into_iter().map(|(_, result)| result).collect())
    }

    async fn delete(&self, ids: &[String]) -> Result<()> {
        let mut store = self.records.write().await;
        for id in ids {
            store.by_id.remove(id);
        }
        debug!(backend = BACKEND, count = ids.len(), "deleted records");
        Ok(())
    }
}
