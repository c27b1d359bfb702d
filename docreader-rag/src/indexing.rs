//! Indexing pipeline: chunk → embed → upsert, plus document removal.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::chunking::{Chunker, FixedSizeChunker, prepare_chunks};
use crate::config::RagConfig;
use crate::document::{DOCUMENT_ID_KEY, Document, EmbeddingRecord, UpsertAck};
use crate::embedding::{EmbeddingProvider, check_batch};
use crate::error::{RagError, Result};
use crate::vectorstore::{MetadataFilter, SearchOptions, VectorStore};

/// Per-call overrides for [`IndexingPipeline::index_document`].
///
/// Setting either field chunks the document with a one-off
/// [`FixedSizeChunker`]; the unset field falls back to the configured value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexOptions {
    pub chunk_size: Option<usize>,
    pub chunk_overlap: Option<usize>,
}

/// A failed document in a batch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexingFailure {
    pub document_id: String,
    pub message: String,
}

/// Aggregate outcome of [`IndexingPipeline::index_documents`].
///
/// `succeeded + failed == total`; `errors` has one entry per failed document,
/// in input order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexingResult {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub errors: Vec<IndexingFailure>,
}

/// Orchestrates the chunker, embedding gateway, and vector store gateway.
pub struct IndexingPipeline {
    config: RagConfig,
    chunker: Arc<dyn Chunker>,
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
}

impl IndexingPipeline {
    pub fn new(
        config: RagConfig,
        chunker: Arc<dyn Chunker>,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
    ) -> Self {
        Self { config, chunker, embedder, store }
    }

    /// Index a single document: chunk (or reuse its chunks) → embed all chunk
    /// texts in one call → upsert records stamped with `documentId` and
    /// `position`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmptyInput`] if the document has no text and no
    /// chunks, and [`RagError::Indexing`] wrapping the first chunking,
    /// embedding, or upsert failure.
    pub async fn index_document(
        &self,
        document: &Document,
        options: &IndexOptions,
    ) -> Result<UpsertAck> {
        let chunks = match self.chunker_for(options) {
            Ok(Some(chunker)) => prepare_chunks(&chunker, document),
            Ok(None) => prepare_chunks(self.chunker.as_ref(), document),
            Err(e) => Err(e),
        }
        .map_err(|e| match e {
            RagError::EmptyInput { .. } => e,
            other => RagError::indexing(&document.id, other),
        })?;

        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let vectors = self
            .embedder
            .embed_batch(&texts)
            .await
            .and_then(|vectors| {
                check_batch(self.embedder.as_ref(), texts.len(), &vectors)?;
                Ok(vectors)
            })
            .map_err(|e| {
                error!(document.id = %document.id, error = %e, "embedding failed during indexing");
                RagError::indexing(&document.id, e)
            })?;

        let records: Vec<EmbeddingRecord> = chunks
            .iter()
            .zip(vectors)
            .map(|(chunk, vector)| EmbeddingRecord::from_chunk(&document.id, chunk, vector))
            .collect();

        let ack = self.store.upsert(&records).await.map_err(|e| {
            error!(document.id = %document.id, error = %e, "upsert failed during indexing");
            RagError::indexing(&document.id, e)
        })?;

        info!(document.id = %document.id, chunk_count = records.len(), "indexed document");
        Ok(ack)
    }

    fn chunker_for(&self, options: &IndexOptions) -> Result<Option<FixedSizeChunker>> {
        if options.chunk_size.is_none() && options.chunk_overlap.is_none() {
            return Ok(None);
        }
        FixedSizeChunker::new(
            options.chunk_size.unwrap_or(self.config.chunk_size),
            options.chunk_overlap.unwrap_or(self.config.chunk_overlap),
        )
        .map(Some)
    }

    /// Index each document independently. A failing document is recorded in
    /// the result and never stops its siblings.
    pub async fn index_documents(&self, documents: &[Document]) -> IndexingResult {
        let mut result = IndexingResult { total: documents.len(), ..Default::default() };

        for document in documents {
            match self.index_document(document, &IndexOptions::default()).await {
                Ok(_) => result.succeeded += 1,
                Err(e) => {
                    warn!(document.id = %document.id, error = %e, "document failed in batch");
                    result.failed += 1;
                    result.errors.push(IndexingFailure {
                        document_id: document.id.clone(),
                        message: e.detailed_message(),
                    });
                }
            }
        }

        info!(
            total = result.total,
            succeeded = result.succeeded,
            failed = result.failed,
            "batch indexing completed"
        );
        result
    }

    /// Delete every stored chunk of `document_id` found by a filtered scan,
    /// returning the number of ids deleted.
    ///
    /// This is a best-effort bulk delete: the scan is bounded by
    /// `removal_scan_limit` (1000 by default) and chunks beyond that bound are
    /// left in the store.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Removal`] if the scan or the delete fails.
    pub async fn remove_document(&self, document_id: &str) -> Result<usize> {
        let options = SearchOptions::new(self.config.removal_scan_limit)
            .with_filter(MetadataFilter::eq(DOCUMENT_ID_KEY, document_id));

        let hits = self.store.search("", &options).await.map_err(|e| {
            error!(document.id = document_id, error = %e, "chunk scan failed during removal");
            RagError::removal(document_id, e)
        })?;

        if hits.is_empty() {
            info!(document.id = document_id, "no chunks to remove");
            return Ok(0);
        }
        if hits.len() >= self.config.removal_scan_limit {
            warn!(
                document.id = document_id,
                limit = self.config.removal_scan_limit,
                "removal scan hit its limit, some chunks may remain"
            );
        }

        let ids: Vec<String> = hits.into_iter().map(|hit| hit.id).collect();
        self.store.delete(&ids).await.map_err(|e| {
            error!(document.id = document_id, error = %e, "delete failed during removal");
            RagError::removal(document_id, e)
        })?;

        info!(document.id = document_id, chunk_count = ids.len(), "removed document");
        Ok(ids.len())
    }
}
