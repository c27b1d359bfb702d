//! Liveness and index statistics derived from vector store probes.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::vectorstore::{SearchOptions, VectorStore};

/// Liveness verdict.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    Healthy,
    Unhealthy,
}

/// Outcome of [`HealthMonitor::health_check`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthStatus {
    pub status: HealthState,
    /// Wall-clock probe latency in milliseconds.
    pub latency: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status == HealthState::Healthy
    }
}

/// Index statistics estimated from a bounded sample.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct IndexStats {
    pub total_documents: usize,
    pub total_chunks: usize,
    pub avg_chunks_per_document: f64,
}

impl IndexStats {
    /// Stats over the given chunk-to-document attribution.
    fn from_document_ids<'a>(ids: impl Iterator<Item = Option<&'a str>>) -> Self {
        let mut documents = HashSet::new();
        let mut total_chunks = 0;
        for id in ids {
            total_chunks += 1;
            if let Some(id) = id {
                documents.insert(id);
            }
        }
        let total_documents = documents.len();
        let avg_chunks_per_document =
            if total_documents == 0 { 0.0 } else { total_chunks as f64 / total_documents as f64 };
        Self { total_documents, total_chunks, avg_chunks_per_document }
    }
}

/// Probes the vector store for liveness and statistics. Never fails.
pub struct HealthMonitor {
    store: Arc<dyn VectorStore>,
    sample_size: usize,
}

impl HealthMonitor {
    pub fn new(store: Arc<dyn VectorStore>, sample_size: usize) -> Self {
        Self { store, sample_size }
    }

    /// Issue a minimal search and time it.
    pub async fn health_check(&self) -> HealthStatus {
        let started = Instant::now();
        let outcome = self.store.search("", &SearchOptions::new(1)).await;
        let latency = started.elapsed().as_secs_f64() * 1000.0;

        match outcome {
            Ok(_) => {
                debug!(latency_ms = latency, "vector store healthy");
                HealthStatus { status: HealthState::Healthy, latency, error: None }
            }
            Err(e) => {
                warn!(latency_ms = latency, error = %e, "vector store unhealthy");
                HealthStatus {
                    status: HealthState::Unhealthy,
                    latency,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    /// Estimate index statistics from a broad scan.
    ///
    /// The scan returns at most `sample_size` chunks, so on larger indexes
    /// these numbers describe the sample, not the whole catalog. A failed
    /// probe yields zeroed stats.
    pub async fn index_stats(&self) -> IndexStats {
        match self.store.search("", &SearchOptions::new(self.sample_size)).await {
            Ok(results) => {
                let ids: Vec<Option<String>> = results.iter().map(|r| r.document_id()).collect();
                let stats = IndexStats::from_document_ids(ids.iter().map(Option::as_deref));
                if stats.total_chunks >= self.sample_size {
                    debug!(sample_size = self.sample_size, "stats probe saturated its sample");
                }
                stats
            }
            Err(e) => {
                warn!(error = %e, "stats probe failed");
                IndexStats::default()
            }
        }
    }
}
