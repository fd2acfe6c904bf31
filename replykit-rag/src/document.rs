//! Data types for indexed exchanges, retrieval results, and answers.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Metadata key holding the agent's reply to a document's customer message.
pub const PAIRED_RESPONSE_KEY: &str = "paired_response";

/// A historical customer message together with its embedding.
///
/// The agent's reply lives in `metadata[PAIRED_RESPONSE_KEY]`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Unique identifier for the document.
    pub id: String,
    /// The original customer message.
    pub text: String,
    /// The vector embedding of `text`.
    pub embedding: Vec<f32>,
    /// Key-value metadata. Must contain [`PAIRED_RESPONSE_KEY`].
    pub metadata: HashMap<String, String>,
}

impl Document {
    /// Build a document from a customer message, its embedding, and the agent's reply.
    pub fn exchange(
        id: impl Into<String>,
        customer_text: impl Into<String>,
        embedding: Vec<f32>,
        paired_response: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            text: customer_text.into(),
            embedding,
            metadata: HashMap::from([(PAIRED_RESPONSE_KEY.to_string(), paired_response.into())]),
        }
    }

    /// The agent's reply, if present and non-empty.
    pub fn paired_response(&self) -> Option<&str> {
        self.metadata.get(PAIRED_RESPONSE_KEY).map(String::as_str).filter(|s| !s.is_empty())
    }

    /// Check the document against an index of the given dimensionality.
    ///
    /// # Errors
    ///
    /// - [`RagError::DimensionMismatch`] if the embedding has the wrong length.
    /// - [`RagError::InvalidDocument`] if the id is empty, the embedding holds
    ///   non-finite values, or the paired response is missing or empty.
    pub fn validate(&self, dimensions: usize) -> Result<()> {
        if self.embedding.len() != dimensions {
            return Err(RagError::DimensionMismatch {
                expected: dimensions,
                actual: self.embedding.len(),
            });
        }
        if self.id.is_empty() {
            return Err(self.invalid("id must not be empty"));
        }
        if self.embedding.iter().any(|v| !v.is_finite()) {
            return Err(self.invalid("embedding contains non-finite values"));
        }
        if self.paired_response().is_none() {
            return Err(self.invalid(format!("missing or empty '{PAIRED_RESPONSE_KEY}' metadata")));
        }
        Ok(())
    }

    fn invalid(&self, reason: impl Into<String>) -> RagError {
        RagError::InvalidDocument { id: self.id.clone(), reason: reason.into() }
    }
}

/// A [`Document`] returned from a nearest-neighbour query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredDocument {
    /// The matched document.
    pub document: Document,
    /// Cosine distance to the query vector (lower is closer).
    pub distance: f32,
}

/// A retrieved (customer message, agent reply) exchange.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievedPair {
    /// ID of the indexed document the pair came from.
    pub document_id: String,
    /// The historical customer message.
    pub customer_text: String,
    /// The agent's reply to `customer_text`.
    pub company_text: String,
    /// Cosine distance between the input and `customer_text`.
    pub distance: f32,
}

impl RetrievedPair {
    /// Borrow the pair as `(customer_text, company_text)`.
    pub fn as_pair(&self) -> (&str, &str) {
        (&self.customer_text, &self.company_text)
    }
}

/// Retrieved exchanges ordered by increasing distance (closest first).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RetrievalResult {
    pairs: Vec<RetrievedPair>,
}

impl RetrievalResult {
    /// Wrap pairs that are already ordered closest first.
    pub fn new(pairs: Vec<RetrievedPair>) -> Self {
        Self { pairs }
    }

    /// The closest exchange, if any.
    pub fn closest(&self) -> Option<&RetrievedPair> {
        self.pairs.first()
    }

    /// All exchanges, closest first.
    pub fn pairs(&self) -> &[RetrievedPair] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// The customer messages, closest first.
    pub fn customer_texts(&self) -> Vec<&str> {
        self.pairs.iter().map(|p| p.customer_text.as_str()).collect()
    }

    /// The agent replies, closest first.
    pub fn company_texts(&self) -> Vec<&str> {
        self.pairs.iter().map(|p| p.company_text.as_str()).collect()
    }
}

impl IntoIterator for RetrievalResult {
    type Item = RetrievedPair;
    type IntoIter = std::vec::IntoIter<RetrievedPair>;

    fn into_iter(self) -> Self::IntoIter {
        self.pairs.into_iter()
    }
}

/// A generated reply and the exchange it was grounded on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationResult {
    /// The generated reply text.
    pub text: String,
    /// The closest retrieved exchange that was placed in the prompt.
    pub retrieval: RetrievedPair,
}
