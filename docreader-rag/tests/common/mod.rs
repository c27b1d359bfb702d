//! Hand-written gateway doubles shared by the integration tests.

#![allow(dead_code)]

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use docreader_rag::{
    DOCUMENT_ID_KEY, EmbeddingProvider, EmbeddingRecord, Metadata, POSITION_KEY, RagError,
    RerankScore, Reranker, Result, SearchOptions, SearchResult, UpsertAck, VectorStore,
};
use serde_json::json;

pub const DIM: usize = 3;

/// Deterministic embedder: `[chars, vowels, 1.0]`. Texts containing the
/// poison marker fail.
#[derive(Default)]
pub struct MockEmbedder {
    pub poison: Option<String>,
    pub calls: Mutex<Vec<Vec<String>>>,
}

impl MockEmbedder {
    pub fn failing_on(marker: &str) -> Self {
        Self { poison: Some(marker.to_string()), ..Default::default() }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_batch(&[text]).await?.remove(0))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        self.calls.lock().unwrap().push(texts.iter().map(|t| t.to_string()).collect());
        if let Some(marker) = &self.poison {
            if texts.iter().any(|t| t.contains(marker.as_str())) {
                return Err(RagError::EmbeddingError {
                    provider: "mock".into(),
                    message: "model unavailable".into(),
                });
            }
        }
        Ok(texts
            .iter()
            .map(|t| {
                let vowels = t.chars().filter(|c| "aeiou".contains(*c)).count();
                vec![t.chars().count() as f32, vowels as f32, 1.0]
            })
            .collect())
    }

    fn dimensions(&self) -> usize {
        DIM
    }
}

/// Scripted store that records every call.
#[derive(Default)]
pub struct MockStore {
    pub results: Mutex<Vec<SearchResult>>,
    pub fail_search: bool,
    pub fail_upsert_for: Option<String>,
    pub search_delay: Option<Duration>,
    pub searches: Mutex<Vec<(String, SearchOptions)>>,
    pub upserts: Mutex<Vec<Vec<EmbeddingRecord>>>,
    pub deletes: Mutex<Vec<Vec<String>>>,
}

impl MockStore {
    pub fn with_results(results: Vec<SearchResult>) -> Self {
        Self { results: Mutex::new(results), ..Default::default() }
    }

    pub fn failing_search() -> Self {
        Self { fail_search: true, ..Default::default() }
    }

    pub fn searches(&self) -> Vec<(String, SearchOptions)> {
        self.searches.lock().unwrap().clone()
    }

    pub fn upserts(&self) -> Vec<Vec<EmbeddingRecord>> {
        self.upserts.lock().unwrap().clone()
    }

    pub fn deletes(&self) -> Vec<Vec<String>> {
        self.deletes.lock().unwrap().clone()
    }
}

#[async_trait]
impl VectorStore for MockStore {
    async fn upsert(&self, records: &[EmbeddingRecord]) -> Result<UpsertAck> {
        if let Some(bad) = &self.fail_upsert_for {
            if records.iter().any(|r| r.metadata[DOCUMENT_ID_KEY] == json!(bad)) {
                return Err(RagError::VectorStoreError {
                    backend: "mock".into(),
                    message: "write rejected".into(),
                });
            }
        }
        self.upserts.lock().unwrap().push(records.to_vec());
        let ids: Vec<String> = records.iter().map(|r| r.id.clone()).collect();
        Ok(UpsertAck { upserted_count: ids.len(), ids })
    }

    async fn search(&self, query: &str, options: &SearchOptions) -> Result<Vec<SearchResult>> {
        if let Some(delay) = self.search_delay {
            tokio::time::sleep(delay).await;
        }
        self.searches.lock().unwrap().push((query.to_string(), options.clone()));
        if self.fail_search {
            return Err(RagError::VectorStoreError {
                backend: "mock".into(),
                message: "connection refused".into(),
            });
        }
        let mut results = self.results.lock().unwrap().clone();
        results.truncate(options.top_k);
        Ok(results)
    }

    async fn delete(&self, ids: &[String]) -> Result<()> {
        self.deletes.lock().unwrap().push(ids.to_vec());
        Ok(())
    }
}

/// Reranker returning a fixed answer, or failing.
pub struct ScriptedReranker {
    pub answer: Option<Vec<RerankScore>>,
    pub seen: Mutex<Vec<usize>>,
}

impl ScriptedReranker {
    pub fn answering(answer: Vec<RerankScore>) -> Self {
        Self { answer: Some(answer), seen: Mutex::new(Vec::new()) }
    }

    pub fn failing() -> Self {
        Self { answer: None, seen: Mutex::new(Vec::new()) }
    }

    /// Candidate counts of every call.
    pub fn seen(&self) -> Vec<usize> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Reranker for ScriptedReranker {
    async fn rerank(&self, _query: &str, candidates: &[SearchResult]) -> Result<Vec<RerankScore>> {
        self.seen.lock().unwrap().push(candidates.len());
        self.answer.clone().ok_or_else(|| RagError::RerankerError {
            reranker: "scripted".into(),
            message: "timed out".into(),
        })
    }
}

pub fn result(id: &str, document_id: &str, position: usize, score: f32) -> SearchResult {
    let mut metadata = Metadata::new();
    metadata.insert(DOCUMENT_ID_KEY.to_string(), json!(document_id));
    metadata.insert(POSITION_KEY.to_string(), json!(position));
    SearchResult { id: id.to_string(), text: format!("text of {id}"), score, metadata: Some(metadata) }
}
