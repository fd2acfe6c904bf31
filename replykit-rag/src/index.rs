//! Vector index trait for storing exchanges and searching them by similarity.

use async_trait::async_trait;

use crate::document::{Document, ScoredDocument};
use crate::error::Result;

/// A keyed store of [`Document`]s with k-nearest-neighbour search by cosine distance.
///
/// The dimensionality is fixed when the index is created; every upserted
/// document and every query vector must match it. Queries never mutate the
/// index, and an upsert is atomic per document: concurrent readers observe
/// either the old state or the fully written new document.
///
/// # Example
///
/// ```rust,ignore
/// use replykit_rag::{InMemoryVectorIndex, VectorIndex};
///
/// let index = InMemoryVectorIndex::new(1536);
/// index.upsert(&document).await?;
/// let nearest = index.query(&query_embedding, 1).await?;
/// ```
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// The embedding dimensionality this index was created with.
    fn dimensions(&self) -> usize;

    /// Number of documents currently held.
    async fn len(&self) -> usize;

    /// Whether the index holds no documents.
    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Insert a document, or replace the one with the same `id`.
    ///
    /// # Errors
    ///
    /// - [`RagError::DimensionMismatch`](crate::RagError::DimensionMismatch)
    ///   if the embedding length is wrong.
    /// - [`RagError::InvalidDocument`](crate::RagError::InvalidDocument) if
    ///   the paired response is missing or empty.
    ///
    /// A failed upsert leaves the index unchanged.
    async fn upsert(&self, document: &Document) -> Result<()>;

    /// Return up to `k` documents closest to `embedding`, closest first.
    ///
    /// Exact ties keep insertion order. An empty index yields an empty
    /// vector, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::DimensionMismatch`](crate::RagError::DimensionMismatch)
    /// if `embedding` has the wrong length.
    async fn query(&self, embedding: &[f32], k: usize) -> Result<Vec<ScoredDocument>>;

    /// Fetch a document by id.
    async fn get(&self, id: &str) -> Option<Document>;
}
