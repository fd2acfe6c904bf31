//! Embedding service trait for turning text into vectors.

use async_trait::async_trait;

use crate::error::Result;

/// A service that maps text to a fixed-length embedding vector.
///
/// Implementations wrap a specific model backend behind a unified async
/// interface and are shared across concurrent requests, so they must be
/// `Send + Sync`. Failures surface as
/// [`RagError::EmbeddingProviderError`](crate::RagError::EmbeddingProviderError).
///
/// # Example
///
/// ```rust,ignore
/// use replykit_rag::EmbeddingService;
///
/// let embedding = service.embed("my package is late").await?;
/// assert_eq!(embedding.len(), service.dimensions());
/// ```
#[async_trait]
pub trait EmbeddingService: Send + Sync {
    /// Generate an embedding vector for a single text input.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Return the dimensionality of embeddings produced by this service.
    fn dimensions(&self) -> usize;

    /// A short name used in logs and error messages.
    fn name(&self) -> &str;
}
