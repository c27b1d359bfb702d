//! Reranking gateway and the fallback-to-original-order policy.
//!
//! [`Reranker`] is the boundary to an external reranking model. Engine code
//! never calls it directly; it goes through [`rerank_results`], which turns
//! every failure into a [`RerankOutcome::Fallback`] carrying the candidates in
//! their original order.

use std::collections::HashSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::document::SearchResult;
use crate::error::Result;

/// A reranker's verdict on one candidate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RerankScore {
    /// Index into the candidate list passed to [`Reranker::rerank`].
    pub index: usize,
    /// Replacement relevance score.
    pub score: f32,
}

/// A model that re-scores a candidate shortlist for a query.
///
/// Implementations return scores in their preferred output order (descending
/// by score by convention). They may return fewer entries than candidates.
#[async_trait]
pub trait Reranker: Send + Sync {
    /// Score `candidates` against `query`.
    async fn rerank(&self, query: &str, candidates: &[SearchResult]) -> Result<Vec<RerankScore>>;
}

/// A reranker that keeps the original order and scores.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpReranker;

#[async_trait]
impl Reranker for NoOpReranker {
    async fn rerank(&self, _query: &str, candidates: &[SearchResult]) -> Result<Vec<RerankScore>> {
        Ok(candidates
            .iter()
            .enumerate()
            .map(|(index, c)| RerankScore { index, score: c.score })
            .collect())
    }
}

/// Why reranked results were not used.
#[derive(Debug, Clone, PartialEq)]
pub enum FallbackReason {
    /// The reranking call itself failed.
    GatewayError(String),
    /// The reranker answered with indices that do not map onto the candidates.
    InvalidResponse(String),
}

/// The result of [`rerank_results`].
#[derive(Debug, Clone, PartialEq)]
pub enum RerankOutcome {
    /// Candidates in reranker order, carrying the reranker's scores.
    Reranked(Vec<SearchResult>),
    /// The original candidates, unchanged.
    Fallback { results: Vec<SearchResult>, reason: FallbackReason },
}

impl RerankOutcome {
    /// The results to use, whichever way reranking went.
    pub fn into_results(self) -> Vec<SearchResult> {
        match self {
            Self::Reranked(results) | Self::Fallback { results, .. } => results,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }
}

/// Rerank `candidates` for `query`, falling back to the original order on any
/// failure. Never fails.
pub async fn rerank_results(
    reranker: &dyn Reranker,
    query: &str,
    candidates: Vec<SearchResult>,
) -> RerankOutcome {
    if candidates.is_empty() {
        return RerankOutcome::Reranked(candidates);
    }

    let scores = match reranker.rerank(query, &candidates).await {
        Ok(scores) => scores,
        Err(e) => {
            warn!(
                error = %e,
                candidate_count = candidates.len(),
                "reranking failed, using vector order"
            );
            return RerankOutcome::Fallback {
                results: candidates,
                reason: FallbackReason::GatewayError(e.to_string()),
            };
        }
    };

    match apply_scores(&candidates, &scores) {
        Ok(reranked) => {
            debug!(candidate_count = candidates.len(), reranked_count = reranked.len(), "reranked");
            RerankOutcome::Reranked(reranked)
        }
        Err(message) => {
            warn!(%message, "reranker returned an invalid response, using vector order");
            RerankOutcome::Fallback {
                results: candidates,
                reason: FallbackReason::InvalidResponse(message),
            }
        }
    }
}

fn apply_scores(
    candidates: &[SearchResult],
    scores: &[RerankScore],
) -> std::result::Result<Vec<SearchResult>, String> {
    let mut seen = HashSet::with_capacity(scores.len());
    scores
        .iter()
        .map(|s| {
            let candidate = candidates.get(s.index).ok_or_else(|| {
                format!("index {} out of range for {} candidates", s.index, candidates.len())
            })?;
            if !seen.insert(s.index) {
                return Err(format!("index {} returned more than once", s.index));
            }
            if !s.score.is_finite() {
                return Err(format!("non-finite score for index {}", s.index));
            }
            Ok(SearchResult { score: s.score, ..candidate.clone() })
        })
        .collect()
}
