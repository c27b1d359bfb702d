//! Embedding gateway: the boundary to the external embedding model.

use async_trait::async_trait;

use crate::error::{RagError, Result};

/// A provider that turns text into fixed-length vectors.
///
/// `embed_batch` must return exactly one vector per input, in input order,
/// and fail as a whole if any input fails. The default implementation calls
/// [`embed`](EmbeddingProvider::embed) sequentially; backends with native
/// batching should override it.
///
/// # Example
///
/// ```rust,ignore
/// use docreader_rag::EmbeddingProvider;
///
/// let vectors = provider.embed_batch(&["first chunk", "second chunk"]).await?;
/// assert_eq!(vectors.len(), 2);
/// ```
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding vector for a single text input.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embedding vectors for a batch of text inputs.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// Return the dimensionality of embeddings produced by this provider.
    fn dimensions(&self) -> usize;
}

/// Check a batch response against the request: one vector per input, all of
/// the provider's dimensionality.
pub(crate) fn check_batch(
    provider: &dyn EmbeddingProvider,
    expected: usize,
    vectors: &[Vec<f32>],
) -> Result<()> {
    if vectors.len() != expected {
        return Err(RagError::EmbeddingError {
            provider: "gateway".to_string(),
            message: format!("expected {expected} embeddings, got {}", vectors.len()),
        });
    }
    let dimensions = provider.dimensions();
    if let Some(bad) = vectors.iter().position(|v| v.len() != dimensions) {
        return Err(RagError::EmbeddingError {
            provider: "gateway".to_string(),
            message: format!(
                "embedding {bad} has {} dimensions, expected {dimensions}",
                vectors[bad].len()
            ),
        });
    }
    Ok(())
}
