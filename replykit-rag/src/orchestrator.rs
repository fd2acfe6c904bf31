//! Answer orchestrator.
//!
//! The [`RagOrchestrator`] answers one customer message per call by running
//! three strictly sequential stages: retrieve the closest historical exchange,
//! build a grounded prompt, and complete it with the generation service.
//!
//! # Example
//!
//! ```rust,ignore
//! use replykit_rag::{RagOrchestrator, RagConfig, InMemoryVectorIndex};
//!
//! let orchestrator = RagOrchestrator::builder()
//!     .config(RagConfig::default())
//!     .embedding_service(Arc::new(my_embedder))
//!     .vector_index(Arc::new(InMemoryVectorIndex::new(1536)))
//!     .generation_service(Arc::new(my_chat_model))
//!     .build()?;
//!
//! let answer = orchestrator.answer("Where is my order?").await?;
//! println!("{} (grounded on: {})", answer.text, answer.retrieval.customer_text);
//! ```

use std::sync::Arc;
use std::time::Instant;

use tracing::{Instrument, error, info, info_span};

use crate::config::RagConfig;
use crate::document::GenerationResult;
use crate::embedding::EmbeddingService;
use crate::error::{RagError, Result, Stage};
use crate::generation::GenerationService;
use crate::index::VectorIndex;
use crate::prompt::PromptBuilder;
use crate::retriever::Retriever;
use crate::timeout::bounded;

/// The retrieval-augmented answer pipeline.
///
/// Holds only shared, read-only collaborators, so one instance can serve any
/// number of concurrent requests. Construct one via [`RagOrchestrator::builder()`].
pub struct RagOrchestrator {
    config: RagConfig,
    retriever: Retriever,
    prompt_builder: PromptBuilder,
    generator: Arc<dyn GenerationService>,
}

impl RagOrchestrator {
    /// Create a new [`RagOrchestratorBuilder`].
    pub fn builder() -> RagOrchestratorBuilder {
        RagOrchestratorBuilder::default()
    }

    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    pub fn prompt_builder(&self) -> &PromptBuilder {
        &self.prompt_builder
    }

    /// Answer a customer message: retrieve → build prompt → generate.
    ///
    /// Returns the generated reply together with the closest exchange used to
    /// ground it. Nothing is retained between calls.
    ///
    /// # Errors
    ///
    /// - [`RagError::InvalidInput`] if `input_text` is empty or whitespace; no
    ///   provider is called in that case.
    /// - [`RagError::NoResultsAvailable`] if the index is empty.
    /// - Provider, timeout and index errors are propagated unchanged. A failure
    ///   in any stage fails the whole call; no partial answer is returned.
    pub async fn answer(&self, input_text: &str) -> Result<GenerationResult> {
        if input_text.trim().is_empty() {
            return Err(RagError::InvalidInput("input text must not be empty".to_string()));
        }

        let span = info_span!("rag.answer", input_len = input_text.len(), top_k = self.config.top_k);
        self.answer_inner(input_text).instrument(span).await
    }

    async fn answer_inner(&self, input_text: &str) -> Result<GenerationResult> {
        let started = Instant::now();

        // 1. Retrieve the nearest exchanges
        let retrieval = self
            .retriever
            .retrieve(input_text, self.config.top_k)
            .instrument(info_span!("rag.retrieve"))
            .await?;

        // 2. Build the grounded prompt
        let prompt = self.prompt_builder.build(input_text, &retrieval)?;

        // 3. Generate the reply
        let generation_started = Instant::now();
        let messages = prompt.to_messages();
        let text = bounded(
            Stage::Generation,
            self.config.generation_timeout,
            self.generator.complete(&messages),
        )
        .instrument(info_span!("rag.generate", provider = self.generator.name()))
        .await
        .inspect_err(|e| {
            error!(provider = self.generator.name(), error = %e, "generation failed");
        })?;

        let Some(closest) = retrieval.into_iter().next() else {
            return Err(RagError::NoResultsAvailable);
        };

        info!(
            document.id = %closest.document_id,
            distance = closest.distance,
            prompt_len = prompt.text().len(),
            reply_len = text.len(),
            generation_ms = generation_started.elapsed().as_millis() as u64,
            total_ms = started.elapsed().as_millis() as u64,
            "answer completed"
        );

        Ok(GenerationResult { text, retrieval: closest })
    }
}

/// Builder for constructing a [`RagOrchestrator`].
///
/// The embedding service, vector index and generation service are required;
/// the config and prompt builder fall back to their defaults. Call
/// [`build()`](RagOrchestratorBuilder::build) to validate and produce the orchestrator.
#[derive(Default)]
pub struct RagOrchestratorBuilder {
    config: Option<RagConfig>,
    embedding_service: Option<Arc<dyn EmbeddingService>>,
    vector_index: Option<Arc<dyn VectorIndex>>,
    generation_service: Option<Arc<dyn GenerationService>>,
    prompt_builder: Option<PromptBuilder>,
}

impl RagOrchestratorBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding service.
    pub fn embedding_service(mut self, service: Arc<dyn EmbeddingService>) -> Self {
        self.embedding_service = Some(service);
        self
    }

    /// Set the vector index.
    pub fn vector_index(mut self, index: Arc<dyn VectorIndex>) -> Self {
        self.vector_index = Some(index);
        self
    }

    /// Set the generation service.
    pub fn generation_service(mut self, service: Arc<dyn GenerationService>) -> Self {
        self.generation_service = Some(service);
        self
    }

    /// Set the prompt builder.
    ///
    /// Its selection policy is replaced by the one in the config.
    pub fn prompt_builder(mut self, builder: PromptBuilder) -> Self {
        self.prompt_builder = Some(builder);
        self
    }

    /// Build the [`RagOrchestrator`].
    ///
    /// # Errors
    ///
    /// - [`RagError::ConfigError`] if a required collaborator is missing or the
    ///   config fails [`RagConfig::validate`].
    /// - [`RagError::DimensionMismatch`] if the embedding service and the
    ///   index disagree on dimensionality.
    pub fn build(self) -> Result<RagOrchestrator> {
        let config = self.config.unwrap_or_default();
        config.validate()?;
        let embedding_service = self
            .embedding_service
            .ok_or_else(|| RagError::ConfigError("embedding_service is required".to_string()))?;
        let vector_index = self
            .vector_index
            .ok_or_else(|| RagError::ConfigError("vector_index is required".to_string()))?;
        let generator = self
            .generation_service
            .ok_or_else(|| RagError::ConfigError("generation_service is required".to_string()))?;

        if embedding_service.dimensions() != vector_index.dimensions() {
            return Err(RagError::DimensionMismatch {
                expected: vector_index.dimensions(),
                actual: embedding_service.dimensions(),
            });
        }

        let prompt_builder =
            self.prompt_builder.unwrap_or_default().with_selection(config.selection);
        let retriever = Retriever::new(embedding_service, vector_index)
            .with_embed_timeout(config.embed_timeout);

        Ok(RagOrchestrator { config, retriever, prompt_builder, generator })
    }
}
