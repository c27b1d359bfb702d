//! Configuration for the RAG engine.

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Configuration parameters for indexing, retrieval, and probing.
///
/// Construct through [`RagConfig::builder()`] for validation, or deserialize
/// with [`RagConfig::from_json`] which applies the same checks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RagConfig {
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Number of overlapping characters between consecutive chunks.
    pub chunk_overlap: usize,
    /// Number of chunks a retrieval returns by default.
    pub top_k: usize,
    /// Default minimum relevance score; results below it are dropped.
    pub min_relevance: Option<f32>,
    /// Whether retrieval reranks by default.
    pub rerank: bool,
    /// Over-fetch factor applied to `top_k` when reranking.
    pub rerank_candidate_multiplier: usize,
    /// Upper bound on candidates fetched for reranking.
    pub max_rerank_candidates: usize,
    /// `top_k` of the scan that discovers a document's chunks on removal.
    /// Chunks beyond this bound are not deleted.
    pub removal_scan_limit: usize,
    /// `top_k` of the probe behind index statistics.
    pub stats_sample_size: usize,
    /// Default token budget applied to prompt context, if any.
    pub context_token_budget: Option<usize>,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            top_k: 5,
            min_relevance: None,
            rerank: false,
            rerank_candidate_multiplier: 3,
            max_rerank_candidates: 50,
            removal_scan_limit: 1000,
            stats_sample_size: 10_000,
            context_token_budget: None,
        }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }

    /// Parse a JSON document into a validated config. Missing fields take
    /// their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] on malformed JSON or invalid values.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| RagError::ConfigError(format!("invalid config JSON: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Number of candidates to fetch before reranking down to `top_k`.
    ///
    /// Validation keeps this above the configured `top_k`. A per-call `top_k`
    /// at or beyond `max_rerank_candidates` gets no over-fetch.
    pub fn rerank_candidates(&self, top_k: usize) -> usize {
        top_k
            .saturating_mul(self.rerank_candidate_multiplier)
            .min(self.max_rerank_candidates)
            .max(top_k)
    }

    /// Check that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if:
    /// - `chunk_overlap >= chunk_size`
    /// - `top_k == 0`
    /// - `min_relevance` lies outside `[0, 1]`
    /// - `rerank_candidate_multiplier < 2` or `max_rerank_candidates <= top_k`,
    ///   either of which would leave reranking without a shortlist
    /// - `removal_scan_limit` or `stats_sample_size` is zero
    pub fn validate(&self) -> Result<()> {
        validate_chunking(self.chunk_size, self.chunk_overlap)?;
        if self.top_k == 0 {
            return Err(RagError::ConfigError("top_k must be greater than zero".to_string()));
        }
        if let Some(min) = self.min_relevance {
            if !(0.0..=1.0).contains(&min) {
                return Err(RagError::ConfigError(format!(
                    "min_relevance ({min}) must be within [0, 1]"
                )));
            }
        }
        if self.rerank_candidate_multiplier < 2 {
            return Err(RagError::ConfigError(
                "rerank_candidate_multiplier must be at least 2".to_string(),
            ));
        }
        if self.max_rerank_candidates <= self.top_k {
            return Err(RagError::ConfigError(format!(
                "max_rerank_candidates ({}) must be greater than top_k ({})",
                self.max_rerank_candidates, self.top_k
            )));
        }
        if self.removal_scan_limit == 0 || self.stats_sample_size == 0 {
            return Err(RagError::ConfigError(
                "removal_scan_limit and stats_sample_size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Validate a `(chunk_size, chunk_overlap)` pair.
pub(crate) fn validate_chunking(chunk_size: usize, chunk_overlap: usize) -> Result<()> {
    if chunk_size == 0 {
        return Err(RagError::ConfigError("chunk_size must be greater than zero".to_string()));
    }
    if chunk_overlap >= chunk_size {
        return Err(RagError::ConfigError(format!(
            "chunk_overlap ({chunk_overlap}) must be less than chunk_size ({chunk_size})"
        )));
    }
    Ok(())
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the maximum chunk size in characters.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the overlap between consecutive chunks in characters.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    /// Set the default number of chunks returned by retrieval.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set the default minimum relevance score.
    pub fn min_relevance(mut self, threshold: f32) -> Self {
        self.config.min_relevance = Some(threshold);
        self
    }

    /// Enable or disable reranking by default.
    pub fn rerank(mut self, enabled: bool) -> Self {
        self.config.rerank = enabled;
        self
    }

    /// Set the over-fetch factor used when reranking.
    pub fn rerank_candidate_multiplier(mut self, multiplier: usize) -> Self {
        self.config.rerank_candidate_multiplier = multiplier;
        self
    }

    /// Set the cap on candidates fetched for reranking.
    pub fn max_rerank_candidates(mut self, max: usize) -> Self {
        self.config.max_rerank_candidates = max;
        self
    }

    /// Set the scan size used to discover chunks on document removal.
    pub fn removal_scan_limit(mut self, limit: usize) -> Self {
        self.config.removal_scan_limit = limit;
        self
    }

    /// Set the probe size used for index statistics.
    pub fn stats_sample_size(mut self, size: usize) -> Self {
        self.config.stats_sample_size = size;
        self
    }

    /// Set a default token budget for prompt context.
    pub fn context_token_budget(mut self, budget: usize) -> Self {
        self.config.context_token_budget = Some(budget);
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// See [`RagConfig::validate`].
    pub fn build(self) -> Result<RagConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(RagConfig::default().validate().is_ok());
    }

    #[test]
    fn overlap_must_be_smaller_than_size() {
        let err = RagConfig::builder().chunk_size(100).chunk_overlap(100).build().unwrap_err();
        assert!(matches!(err, RagError::ConfigError(_)));
    }

    #[test]
    fn rerank_candidates_respects_multiplier_and_cap() {
        let config = RagConfig::default();
        assert_eq!(config.rerank_candidates(5), 15);
        assert_eq!(config.rerank_candidates(40), 50);
        let config = RagConfig::builder().top_k(5).max_rerank_candidates(6).build().unwrap();
        assert_eq!(config.rerank_candidates(5), 6);
        assert_eq!(config.rerank_candidates(10), 10);
    }

    #[test]
    fn rerank_must_over_fetch_beyond_top_k() {
        let err = RagConfig::builder().top_k(5).max_rerank_candidates(5).build().unwrap_err();
        assert!(matches!(err, RagError::ConfigError(_)));
        let err = RagConfig::builder().rerank_candidate_multiplier(1).build().unwrap_err();
        assert!(matches!(err, RagError::ConfigError(_)));
        assert!(RagConfig::from_json(r#"{"top_k": 50}"#).is_err());
    }

    #[test]
    fn from_json_fills_defaults_and_validates() {
        let config = RagConfig::from_json(r#"{"top_k": 8, "rerank": true}"#).unwrap();
        assert_eq!(config.top_k, 8);
        assert!(config.rerank);
        assert_eq!(config.chunk_size, 1000);

        assert!(RagConfig::from_json(r#"{"min_relevance": 1.5}"#).is_err());
        assert!(RagConfig::from_json("not json").is_err());
    }
}
