//! In-memory vector index using brute-force cosine distance.
//!
//! This module provides [`InMemoryVectorIndex`], a vector index backed by a
//! `Vec` in insertion order plus an id lookup table, protected by a
//! `tokio::sync::RwLock`. It is suitable for development, testing, and small
//! corpora. [`FileVectorIndex`](crate::FileVectorIndex) reuses the same
//! storage and adds persistence.

use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::document::{Document, ScoredDocument};
use crate::error::{RagError, Result};
use crate::index::VectorIndex;
use crate::similarity::cosine_distance;

/// Documents in insertion order with an id → position table.
///
/// Replacing a document keeps its original position, so its tie-breaking
/// rank does not change.
#[derive(Debug, Default)]
pub(crate) struct Entries {
    documents: Vec<Document>,
    positions: HashMap<String, usize>,
}

impl Entries {
    pub(crate) fn len(&self) -> usize {
        self.documents.len()
    }

    pub(crate) fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub(crate) fn get(&self, id: &str) -> Option<&Document> {
        self.positions.get(id).map(|&pos| &self.documents[pos])
    }

    /// Insert or replace. Returns `true` if an existing document was replaced.
    pub(crate) fn upsert(&mut self, document: Document) -> bool {
        match self.positions.get(&document.id) {
            Some(&pos) => {
                self.documents[pos] = document;
                true
            }
            None => {
                self.positions.insert(document.id.clone(), self.documents.len());
                self.documents.push(document);
                false
            }
        }
    }

    pub(crate) fn nearest(&self, embedding: &[f32], k: usize) -> Vec<ScoredDocument> {
        if k == 0 || self.documents.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<(f32, usize)> = self
            .documents
            .iter()
            .enumerate()
            .map(|(pos, doc)| (cosine_distance(&doc.embedding, embedding), pos))
            .collect();

        // Distance first, then insertion position for exact ties.
        let by_rank = |a: &(f32, usize), b: &(f32, usize)| -> Ordering {
            a.0.total_cmp(&b.0).then(a.1.cmp(&b.1))
        };
        if k < scored.len() {
            scored.select_nth_unstable_by(k - 1, by_rank);
            scored.truncate(k);
        }
        scored.sort_unstable_by(by_rank);

        scored
            .into_iter()
            .map(|(distance, pos)| ScoredDocument {
                document: self.documents[pos].clone(),
                distance,
            })
            .collect()
    }
}

/// Reject query vectors of the wrong length or with NaN/infinite components.
pub(crate) fn check_query(expected: usize, embedding: &[f32]) -> Result<()> {
    if embedding.len() != expected {
        return Err(RagError::DimensionMismatch { expected, actual: embedding.len() });
    }
    if let Some(pos) = embedding.iter().position(|v| !v.is_finite()) {
        return Err(RagError::InvalidInput(format!(
            "query embedding has a non-finite value at position {pos}"
        )));
    }
    Ok(())
}

/// An in-memory vector index using cosine distance for search.
///
/// # Example
///
/// ```rust,ignore
/// use replykit_rag::{InMemoryVectorIndex, VectorIndex};
///
/// let index = InMemoryVectorIndex::new(384);
/// index.upsert(&document).await?;
/// ```
#[derive(Debug)]
pub struct InMemoryVectorIndex {
    dimensions: usize,
    entries: RwLock<Entries>,
}

impl InMemoryVectorIndex {
    /// Create a new empty index for embeddings of the given dimensionality.
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions, entries: RwLock::new(Entries::default()) }
    }
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    async fn upsert(&self, document: &Document) -> Result<()> {
        document.validate(self.dimensions)?;
        self.entries.write().await.upsert(document.clone());
        Ok(())
    }

    async fn query(&self, embedding: &[f32], k: usize) -> Result<Vec<ScoredDocument>> {
        check_query(self.dimensions, embedding)?;
        Ok(self.entries.read().await.nearest(embedding, k))
    }

    async fn get(&self, id: &str) -> Option<Document> {
        self.entries.read().await.get(id).cloned()
    }
}
