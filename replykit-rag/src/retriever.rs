//! Nearest-exchange retrieval.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error};

use crate::document::{RetrievalResult, RetrievedPair};
use crate::embedding::EmbeddingService;
use crate::error::{RagError, Result, Stage};
use crate::index::VectorIndex;
use crate::timeout::bounded;

/// Finds the historical exchanges closest to an input message.
///
/// The input is embedded with the configured [`EmbeddingService`] and the
/// [`VectorIndex`] is queried for the `k` nearest customer messages; each hit
/// is mapped to its `(customer_text, paired_response)` pair.
#[derive(Clone)]
pub struct Retriever {
    embedder: Arc<dyn EmbeddingService>,
    index: Arc<dyn VectorIndex>,
    embed_timeout: Option<Duration>,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn EmbeddingService>, index: Arc<dyn VectorIndex>) -> Self {
        Self { embedder, index, embed_timeout: None }
    }

    /// Bound every embedding call by `limit`.
    pub fn with_embed_timeout(mut self, limit: Option<Duration>) -> Self {
        self.embed_timeout = limit;
        self
    }

    pub fn index(&self) -> &Arc<dyn VectorIndex> {
        &self.index
    }

    pub fn embedder(&self) -> &Arc<dyn EmbeddingService> {
        &self.embedder
    }

    /// Retrieve up to `k` exchanges, closest first.
    ///
    /// # Errors
    ///
    /// - [`RagError::NoResultsAvailable`] if the index is empty.
    /// - [`RagError::DimensionMismatch`] if the embedding length does not match the index.
    /// - [`RagError::EmbeddingProviderError`] / [`RagError::Timeout`] from the embedding call,
    ///   or if the embedding has NaN or infinite components.
    /// - [`RagError::InvalidDocument`] if a stored document lacks its paired response.
    pub async fn retrieve(&self, input_text: &str, k: usize) -> Result<RetrievalResult> {
        let started = Instant::now();
        let embedding =
            bounded(Stage::Embedding, self.embed_timeout, self.embedder.embed(input_text))
                .await
                .inspect_err(|e| {
                    error!(provider = self.embedder.name(), error = %e, "embedding failed during retrieval");
                })?;
        if embedding.iter().any(|v| !v.is_finite()) {
            error!(provider = self.embedder.name(), "embedding contains non-finite values");
            return Err(RagError::EmbeddingProviderError {
                provider: self.embedder.name().to_string(),
                message: "embedding contains NaN or infinite values".to_string(),
            });
        }

        let hits = self.index.query(&embedding, k).await.inspect_err(|e| {
            error!(error = %e, "vector index query failed");
        })?;
        if hits.is_empty() {
            return Err(RagError::NoResultsAvailable);
        }

        let pairs = hits
            .into_iter()
            .map(|hit| {
                let company_text = hit
                    .document
                    .paired_response()
                    .ok_or_else(|| RagError::InvalidDocument {
                        id: hit.document.id.clone(),
                        reason: "stored document has no paired response".to_string(),
                    })?
                    .to_string();
                Ok(RetrievedPair {
                    document_id: hit.document.id,
                    customer_text: hit.document.text,
                    company_text,
                    distance: hit.distance,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(
            k,
            result_count = pairs.len(),
            closest_distance = pairs[0].distance,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "retrieval completed"
        );

        Ok(RetrievalResult::new(pairs))
    }
}
