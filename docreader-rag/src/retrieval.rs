//! Context retrieval: filtered similarity search with optional reranking.

use std::sync::Arc;

use tracing::{debug, error, info};

use crate::config::RagConfig;
use crate::context::{ContextChunk, RagContext};
use crate::document::{DOCUMENT_ID_KEY, SearchResult};
use crate::error::{RagError, Result};
use crate::reranker::{Reranker, rerank_results};
use crate::vectorstore::{MetadataFilter, SearchOptions, VectorStore};

/// Per-call retrieval options. Unset fields take the configured defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetrievalOptions {
    pub top_k: Option<usize>,
    pub min_relevance: Option<f32>,
    pub rerank: Option<bool>,
    /// Restrict results to these documents.
    pub document_ids: Option<Vec<String>>,
}

impl RetrievalOptions {
    pub fn top_k(mut self, top_k: usize) -> Self {
        self.top_k = Some(top_k);
        self
    }

    pub fn min_relevance(mut self, min_relevance: f32) -> Self {
        self.min_relevance = Some(min_relevance);
        self
    }

    pub fn rerank(mut self, rerank: bool) -> Self {
        self.rerank = Some(rerank);
        self
    }

    pub fn document_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.document_ids = Some(ids.into_iter().map(Into::into).collect());
        self
    }
}

/// Turns a query into a ranked [`RagContext`].
pub struct ContextRetriever {
    config: RagConfig,
    store: Arc<dyn VectorStore>,
    reranker: Option<Arc<dyn Reranker>>,
}

impl ContextRetriever {
    pub fn new(
        config: RagConfig,
        store: Arc<dyn VectorStore>,
        reranker: Option<Arc<dyn Reranker>>,
    ) -> Self {
        Self { config, store, reranker }
    }

    /// Retrieve context for `query`.
    ///
    /// With reranking on (and a reranker configured) the search over-fetches
    /// [`RagConfig::rerank_candidates`] results, the reranker reorders them,
    /// and the list is cut to `top_k`. A failing reranker leaves the vector
    /// order in place. Results under `min_relevance` are dropped before
    /// reranking, and results outside `document_ids` are always dropped.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Retrieval`] only when the vector search fails.
    pub async fn retrieve_context(
        &self,
        query: &str,
        options: &RetrievalOptions,
    ) -> Result<RagContext> {
        let top_k = options.top_k.unwrap_or(self.config.top_k);
        let min_relevance = options.min_relevance.or(self.config.min_relevance);
        let reranker = if options.rerank.unwrap_or(self.config.rerank) {
            self.reranker.as_deref()
        } else {
            None
        };

        if top_k == 0 || options.document_ids.as_ref().is_some_and(Vec::is_empty) {
            debug!(top_k, "nothing to retrieve");
            return Ok(RagContext::default());
        }

        let fetch_k = match reranker {
            Some(_) => self.config.rerank_candidates(top_k),
            None => top_k,
        };
        let mut search = SearchOptions::new(fetch_k);
        if let Some(min) = min_relevance {
            search = search.with_min_relevance(min);
        }
        if let Some(ids) = &options.document_ids {
            search = search.with_filter(MetadataFilter::is_in(DOCUMENT_ID_KEY, ids.iter().cloned()));
        }

        let results = self.store.search(query, &search).await.map_err(|e| {
            error!(error = %e, "vector search failed during retrieval");
            RagError::retrieval(e)
        })?;
        let fetched = results.len();

        let candidates: Vec<SearchResult> = results
            .into_iter()
            .filter(|r| min_relevance.is_none_or(|min| r.score >= min))
            .filter(|r| match &options.document_ids {
                Some(ids) => r.document_id().is_some_and(|id| ids.contains(&id)),
                None => true,
            })
            .collect();

        let mut ranked = match reranker {
            Some(reranker) => {
                let outcome = rerank_results(reranker, query, candidates).await;
                let fallback = outcome.is_fallback();
                let ranked = outcome.into_results();
                debug!(fallback, candidate_count = ranked.len(), "rerank step finished");
                ranked
            }
            None => candidates,
        };
        ranked.truncate(top_k);

        let context = RagContext::from_chunks(ranked.into_iter().map(ContextChunk::from).collect());
        info!(
            fetched,
            total_chunks = context.total_chunks,
            document_count = context.document_ids.len(),
            "retrieved context"
        );
        Ok(context)
    }

    /// Retrieve context for a question scoped to `document_ids`, with the
    /// configured `top_k`.
    pub async fn retrieve_context_for_question(
        &self,
        question: &str,
        document_ids: &[String],
    ) -> Result<RagContext> {
        let options = RetrievalOptions::default().document_ids(document_ids.iter().cloned());
        self.retrieve_context(question, &options).await
    }
}
