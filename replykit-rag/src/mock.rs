//! Deterministic test doubles for the provider traits.
//!
//! Both doubles count their calls so tests can assert that a request was
//! rejected before reaching a provider.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::embedding::EmbeddingService;
use crate::error::{RagError, Result};
use crate::generation::{ChatMessage, GenerationService};

/// Hash-based embeddings with optional fixed vectors for chosen texts.
///
/// Unknown texts map to a normalised vector whose direction depends on the
/// text bytes, so equal texts always embed identically.
#[derive(Debug)]
pub struct MockEmbeddingService {
    dimensions: usize,
    overrides: HashMap<String, Vec<f32>>,
    failure: Option<String>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl MockEmbeddingService {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            overrides: HashMap::new(),
            failure: None,
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Return `vector` whenever exactly `text` is embedded.
    pub fn with_vector(mut self, text: impl Into<String>, vector: Vec<f32>) -> Self {
        self.overrides.insert(text.into(), vector);
        self
    }

    /// Fail every call with an embedding provider error.
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    /// Sleep before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of `embed` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The hash-derived embedding for `text`, ignoring overrides.
    pub fn hashed(&self, text: &str) -> Vec<f32> {
        let hash = text.bytes().fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
        let mut emb = vec![0.0f32; self.dimensions];
        for (i, v) in emb.iter_mut().enumerate() {
            *v = ((hash.wrapping_add(i as u64)) as f32).sin();
        }
        let norm: f32 = emb.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            emb.iter_mut().for_each(|x| *x /= norm);
        }
        emb
    }
}

#[async_trait]
impl EmbeddingService for MockEmbeddingService {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = &self.failure {
            return Err(RagError::EmbeddingProviderError {
                provider: self.name().to_string(),
                message: message.clone(),
            });
        }
        Ok(self.overrides.get(text).cloned().unwrap_or_else(|| self.hashed(text)))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "mock-embedding"
    }
}

/// A chat model that returns a canned reply and records what it was sent.
#[derive(Debug)]
pub struct MockGenerationService {
    reply: String,
    failure: Option<String>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    received: Mutex<Vec<Vec<ChatMessage>>>,
}

impl MockGenerationService {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            failure: None,
            delay: None,
            calls: AtomicUsize::new(0),
            received: Mutex::new(Vec::new()),
        }
    }

    /// Fail every call with a generation provider error.
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    /// Sleep before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of `complete` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every message list passed to `complete`, oldest first.
    pub fn received(&self) -> Vec<Vec<ChatMessage>> {
        self.received.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// The content of the last message of the most recent call.
    pub fn last_prompt(&self) -> Option<String> {
        self.received().last().and_then(|m| m.last()).map(|m| m.content.clone())
    }
}

#[async_trait]
impl GenerationService for MockGenerationService {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut received) = self.received.lock() {
            received.push(messages.to_vec());
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.failure {
            Some(message) => Err(RagError::GenerationProviderError {
                provider: self.name().to_string(),
                message: message.clone(),
            }),
            None => Ok(self.reply.clone()),
        }
    }

    fn name(&self) -> &str {
        "mock-generation"
    }
}
