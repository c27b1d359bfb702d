//! Error types for the `docreader-rag` crate.

use std::error::Error as _;

use thiserror::Error;

/// Errors that can occur in RAG operations.
///
/// Reranking failures never surface through this type at the engine level;
/// they are converted into a [`RerankOutcome::Fallback`](crate::reranker::RerankOutcome).
#[derive(Debug, Error)]
pub enum RagError {
    /// A document has neither non-empty text nor pre-supplied chunks.
    #[error("Document '{document_id}' has no text and no chunks to index")]
    EmptyInput {
        /// The offending document.
        document_id: String,
    },

    /// Chunking, embedding, or upsert failed while indexing a single document.
    #[error("Failed to index document")]
    Indexing {
        /// The document that could not be indexed.
        document_id: String,
        /// The stage failure.
        #[source]
        source: Box<RagError>,
    },

    /// The vector search behind context retrieval failed.
    #[error("Failed to retrieve context")]
    Retrieval {
        /// The underlying search failure.
        #[source]
        source: Box<RagError>,
    },

    /// The chunk scan or delete behind document removal failed.
    #[error("Failed to remove document")]
    Removal {
        /// The document whose chunks could not be removed.
        document_id: String,
        /// The underlying store failure.
        #[source]
        source: Box<RagError>,
    },

    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred in the vector store backend.
    #[error("Vector store error ({backend}): {message}")]
    VectorStoreError {
        /// The vector store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred during document chunking.
    #[error("Chunking error: {0}")]
    ChunkingError(String),

    /// An error occurred during result reranking.
    #[error("Reranker error ({reranker}): {message}")]
    RerankerError {
        /// The reranker that produced the error.
        reranker: String,
        /// A description of the failure.
        message: String,
    },

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl RagError {
    pub(crate) fn indexing(document_id: impl Into<String>, source: RagError) -> Self {
        Self::Indexing { document_id: document_id.into(), source: Box::new(source) }
    }

    pub(crate) fn retrieval(source: RagError) -> Self {
        Self::Retrieval { source: Box::new(source) }
    }

    pub(crate) fn removal(document_id: impl Into<String>, source: RagError) -> Self {
        Self::Removal { document_id: document_id.into(), source: Box::new(source) }
    }

    /// Render this error together with its whole cause chain,
    /// e.g. `Failed to index document: Embedding error (OpenAI): request failed`.
    pub fn detailed_message(&self) -> String {
        let mut message = self.to_string();
        let mut cause = self.source();
        while let Some(err) = cause {
            message.push_str(": ");
            message.push_str(&err.to_string());
            cause = err.source();
        }
        message
    }
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
