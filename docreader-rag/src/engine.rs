//! The RAG engine facade.
//!
//! [`RagEngine`] wires the indexing pipeline, context retriever, prompt
//! composer, and health monitor over one set of injected gateways: an
//! [`EmbeddingProvider`], a [`VectorStore`], a [`Chunker`], and an optional
//! [`Reranker`].
//!
//! # Example
//!
//! ```rust,ignore
//! use docreader_rag::{Document, InMemoryVectorStore, RagConfig, RagEngine};
//!
//! let embedder = Arc::new(my_embedder);
//! let engine = RagEngine::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(embedder.clone())
//!     .vector_store(Arc::new(InMemoryVectorStore::new(embedder)))
//!     .build()?;
//!
//! engine.index_document(&Document::new("doc-1", text), &Default::default()).await?;
//! let prompt = engine.prepare_prompt("What does chapter 2 argue?", &Default::default()).await?;
//! ```

use std::sync::Arc;

use tracing::debug;

use crate::chunking::{Chunker, FixedSizeChunker};
use crate::config::RagConfig;
use crate::context::{RagContext, assemble_context_within_budget};
use crate::document::{Document, UpsertAck};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::health::{HealthMonitor, HealthStatus, IndexStats};
use crate::indexing::{IndexOptions, IndexingPipeline, IndexingResult};
use crate::prompt::{PreparedPrompt, PromptOptions, compose_user_prompt, system_prompt};
use crate::reranker::Reranker;
use crate::retrieval::{ContextRetriever, RetrievalOptions};
use crate::vectorstore::VectorStore;

/// The RAG context engine.
///
/// Construct one via [`RagEngine::builder()`]. The engine holds no state of
/// its own beyond its collaborators; every call goes to the store afresh.
pub struct RagEngine {
    config: RagConfig,
    indexing: IndexingPipeline,
    retriever: ContextRetriever,
    health: HealthMonitor,
}

impl RagEngine {
    /// Create a new [`RagEngineBuilder`].
    pub fn builder() -> RagEngineBuilder {
        RagEngineBuilder::default()
    }

    /// Return a reference to the engine configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Chunk, embed, and store one document. See [`IndexingPipeline::index_document`].
    pub async fn index_document(
        &self,
        document: &Document,
        options: &IndexOptions,
    ) -> Result<UpsertAck> {
        self.indexing.index_document(document, options).await
    }

    /// Index documents with per-document failure isolation.
    pub async fn index_documents(&self, documents: &[Document]) -> IndexingResult {
        self.indexing.index_documents(documents).await
    }

    /// Best-effort removal of a document's chunks. See [`IndexingPipeline::remove_document`].
    pub async fn remove_document(&self, document_id: &str) -> Result<usize> {
        self.indexing.remove_document(document_id).await
    }

    /// Retrieve ranked context for a query.
    pub async fn retrieve_context(
        &self,
        query: &str,
        options: &RetrievalOptions,
    ) -> Result<RagContext> {
        self.retriever.retrieve_context(query, options).await
    }

    /// Retrieve context for a question over the given documents.
    pub async fn retrieve_context_for_question(
        &self,
        question: &str,
        document_ids: &[String],
    ) -> Result<RagContext> {
        self.retriever.retrieve_context_for_question(question, document_ids).await
    }

    /// Retrieve context for `query` and render the system and user prompts.
    ///
    /// When `options.token_budget` (or the configured `context_token_budget`)
    /// is set, the context is packed into that budget before rendering.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Retrieval`] if the vector search fails.
    pub async fn prepare_prompt(
        &self,
        query: &str,
        options: &PromptOptions,
    ) -> Result<PreparedPrompt> {
        let mut context = self.retriever.retrieve_context(query, &options.retrieval).await?;

        if let Some(budget) = options.token_budget.or(self.config.context_token_budget) {
            let packed = assemble_context_within_budget(&context.chunks, budget);
            debug!(budget, before = context.total_chunks, after = packed.len(), "packed context");
            context = RagContext::from_chunks(packed);
        }

        Ok(PreparedPrompt {
            system_prompt: system_prompt(options.system_prompt.as_deref()),
            user_prompt: compose_user_prompt(query, &context),
            context,
        })
    }

    /// Probe the vector store for liveness.
    pub async fn health_check(&self) -> HealthStatus {
        self.health.health_check().await
    }

    /// Sample-based index statistics.
    pub async fn index_stats(&self) -> IndexStats {
        self.health.index_stats().await
    }
}

/// Builder for constructing a [`RagEngine`].
///
/// `embedding_provider` and `vector_store` are required. The chunker defaults
/// to a [`FixedSizeChunker`] sized by the config, the config to
/// [`RagConfig::default()`], and the reranker to none.
#[derive(Default)]
pub struct RagEngineBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    vector_store: Option<Arc<dyn VectorStore>>,
    chunker: Option<Arc<dyn Chunker>>,
    reranker: Option<Arc<dyn Reranker>>,
}

impl RagEngineBuilder {
    /// Set the engine configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the vector store backend.
    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    /// Set the document chunker.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Set the reranker used when retrieval asks for reranking.
    pub fn reranker(mut self, reranker: Arc<dyn Reranker>) -> Self {
        self.reranker = Some(reranker);
        self
    }

    /// Build the [`RagEngine`].
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if a required collaborator is missing
    /// or the config does not validate.
    pub fn build(self) -> Result<RagEngine> {
        let config = self.config.unwrap_or_default();
        config.validate()?;
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::ConfigError("embedding_provider is required".to_string()))?;
        let vector_store = self
            .vector_store
            .ok_or_else(|| RagError::ConfigError("vector_store is required".to_string()))?;
        let chunker: Arc<dyn Chunker> = match self.chunker {
            Some(chunker) => chunker,
            None => Arc::new(FixedSizeChunker::new(config.chunk_size, config.chunk_overlap)?),
        };

        Ok(RagEngine {
            indexing: IndexingPipeline::new(
                config.clone(),
                chunker,
                embedding_provider,
                vector_store.clone(),
            ),
            retriever: ContextRetriever::new(config.clone(), vector_store.clone(), self.reranker),
            health: HealthMonitor::new(vector_store, config.stats_sample_size),
            config,
        })
    }
}
