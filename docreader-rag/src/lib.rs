//! # docreader-rag
//!
//! The retrieval-augmented context engine behind the document reader.
//!
//! Documents are split into overlapping chunks, embedded, and stored in a
//! vector store. A query is answered with a ranked, optionally reranked
//! [`RagContext`], which can be packed into a token budget and rendered as a
//! citation-annotated prompt for a downstream language model.
//!
//! The embedding model, vector store, and reranking model are external
//! collaborators behind the [`EmbeddingProvider`], [`VectorStore`], and
//! [`Reranker`] traits, injected into a [`RagEngine`] at construction.
//!
//! ## Features
//!
//! - `openai` – [`openai::OpenAIEmbeddingProvider`]
//! - `cohere` – [`cohere::CohereReranker`]
//! - `full` – both of the above

pub mod chunking;
pub mod config;
pub mod context;
pub mod document;
pub mod embedding;
pub mod engine;
pub mod error;
pub mod health;
pub mod indexing;
pub mod inmemory;
pub mod prompt;
pub mod reranker;
pub mod retrieval;
pub mod vectorstore;

#[cfg(feature = "cohere")]
pub mod cohere;
#[cfg(feature = "openai")]
pub mod openai;

pub use chunking::{Chunker, FixedSizeChunker, MarkdownChunker, RecursiveChunker, prepare_chunks};
pub use config::{RagConfig, RagConfigBuilder};
pub use context::{ContextChunk, RagContext, assemble_context_within_budget, estimate_tokens};
pub use document::{
    Chunk, DOCUMENT_ID_KEY, Document, EmbeddingRecord, Metadata, POSITION_KEY, SearchResult,
    UpsertAck,
};
pub use embedding::EmbeddingProvider;
pub use engine::{RagEngine, RagEngineBuilder};
pub use error::{RagError, Result};
pub use health::{HealthMonitor, HealthState, HealthStatus, IndexStats};
pub use indexing::{IndexOptions, IndexingFailure, IndexingPipeline, IndexingResult};
pub use inmemory::InMemoryVectorStore;
pub use prompt::{
    DEFAULT_SYSTEM_PROMPT, PreparedPrompt, PromptOptions, format_context_for_claude,
    optimal_context_window,
};
pub use reranker::{
    FallbackReason, NoOpReranker, RerankOutcome, RerankScore, Reranker, rerank_results,
};
pub use retrieval::{ContextRetriever, RetrievalOptions};
pub use vectorstore::{FilterCondition, MetadataFilter, SearchOptions, VectorStore};

#[cfg(feature = "cohere")]
pub use cohere::CohereReranker;
#[cfg(feature = "openai")]
pub use openai::OpenAIEmbeddingProvider;
