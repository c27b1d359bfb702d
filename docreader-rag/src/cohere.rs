//! Cohere-compatible reranking gateway.
//!
//! This module is only available when the `cohere` feature is enabled.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::document::SearchResult;
use crate::error::{RagError, Result};
use crate::reranker::{RerankScore, Reranker};

const RERANKER: &str = "Cohere";

/// The default Cohere API base URL.
const DEFAULT_BASE_URL: &str = "https://api.cohere.com/v1";

/// The default reranking model.
const DEFAULT_MODEL: &str = "rerank-english-v3.0";

/// A [`Reranker`] backed by the `/rerank` endpoint of the Cohere API or any
/// server that speaks the same protocol.
///
/// # Example
///
/// ```rust,ignore
/// use docreader_rag::cohere::CohereReranker;
///
/// let reranker = CohereReranker::from_env()?.with_model("rerank-multilingual-v3.0");
/// ```
pub struct CohereReranker {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl CohereReranker {
    /// Create a new reranker with the given API key.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::RerankerError`] if the key is empty.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(gateway_error("API key must not be empty"));
        }
        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: DEFAULT_BASE_URL.into(),
            model: DEFAULT_MODEL.into(),
        })
    }

    /// Create a new reranker using the `COHERE_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("COHERE_API_KEY")
            .map_err(|_| gateway_error("COHERE_API_KEY environment variable not set"))?;
        Self::new(api_key)
    }

    /// Set the reranking model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Point the reranker at a compatible server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

fn gateway_error(message: impl Into<String>) -> RagError {
    RagError::RerankerError { reranker: RERANKER.into(), message: message.into() }
}

#[derive(Serialize)]
struct RerankRequest<'a> {
    model: &'a str,
    query: &'a str,
    documents: Vec<&'a str>,
    top_n: usize,
}

#[derive(Deserialize)]
struct RerankResponse {
    results: Vec<RerankItem>,
}

#[derive(Deserialize)]
struct RerankItem {
    index: usize,
    relevance_score: f32,
}

/// Decode a rerank response body, checking every index against the
/// candidate count. Output keeps the response order.
fn decode_rerank(body: &str, candidate_count: usize) -> Result<Vec<RerankScore>> {
    let response: RerankResponse = serde_json::from_str(body)
        .map_err(|e| gateway_error(format!("failed to parse response: {e}")))?;

    response
        .results
        .into_iter()
        .map(|item| {
            if item.index >= candidate_count {
                return Err(gateway_error(format!(
                    "index {} out of range for {candidate_count} candidates",
                    item.index
                )));
            }
            Ok(RerankScore { index: item.index, score: item.relevance_score })
        })
        .collect()
}

#[async_trait]
impl Reranker for CohereReranker {
    async fn rerank(&self, query: &str, candidates: &[SearchResult]) -> Result<Vec<RerankScore>> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        debug!(reranker = RERANKER, candidate_count = candidates.len(), model = %self.model, "reranking");

        let request = RerankRequest {
            model: &self.model,
            query,
            documents: candidates.iter().map(|c| c.text.as_str()).collect(),
            top_n: candidates.len(),
        };

        let response = self
            .client
            .post(format!("{}/rerank", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!(reranker = RERANKER, error = %e, "request failed");
                gateway_error(format!("request failed: {e}"))
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| gateway_error(format!("failed to read response body: {e}")))?;
        if !status.is_success() {
            error!(reranker = RERANKER, %status, "API error");
            return Err(gateway_error(format!("API returned {status}: {body}")));
        }

        decode_rerank(&body, candidates.len())
    }
}
