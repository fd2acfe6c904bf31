//! # replykit-rag
//!
//! Retrieval-augmented replies to customer-service messages.
//!
//! Given a customer's message, the [`RagOrchestrator`] finds the most similar
//! historical customer/agent exchange in a [`VectorIndex`], places it in a
//! grounded prompt built by the [`PromptBuilder`], and asks a
//! [`GenerationService`] to write the reply. The result carries the exchange
//! that was used, for transparency.
//!
//! ## Components
//!
//! - [`EmbeddingService`] / [`GenerationService`] – provider capabilities.
//!   OpenAI implementations live in [`openai`] (feature `openai`); test
//!   doubles live in [`mock`].
//! - [`VectorIndex`] – k-nearest-neighbour search by cosine distance, with an
//!   in-memory ([`InMemoryVectorIndex`]) and a persistent
//!   ([`FileVectorIndex`]) implementation.
//! - [`Retriever`] – embeds input text and maps index hits to exchange pairs.
//! - [`PromptBuilder`] – deterministic prompt template with a configurable
//!   [`SelectionPolicy`].
//! - [`RagOrchestrator`] – validates input and sequences the stages.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use replykit_rag::{FileVectorIndex, RagConfig, RagOrchestrator};
//! use replykit_rag::openai::{OpenAIChatService, OpenAIEmbeddingService};
//!
//! let index = FileVectorIndex::open("index", "tweet_amazon_collection", 1536).await?;
//! let orchestrator = RagOrchestrator::builder()
//!     .config(RagConfig::default())
//!     .embedding_service(Arc::new(OpenAIEmbeddingService::from_env()?))
//!     .vector_index(Arc::new(index))
//!     .generation_service(Arc::new(OpenAIChatService::from_env()?))
//!     .build()?;
//!
//! let answer = orchestrator.answer("Where is my order?").await?;
//! ```

pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod index;
pub mod inmemory;
pub mod mock;
#[cfg(feature = "openai")]
pub mod openai;
pub mod orchestrator;
pub mod persistent;
pub mod prompt;
pub mod retriever;
pub mod similarity;
mod timeout;

pub use config::{DEFAULT_TOP_K, RagConfig, RagConfigBuilder};
pub use document::{
    Document, GenerationResult, PAIRED_RESPONSE_KEY, RetrievalResult, RetrievedPair,
    ScoredDocument,
};
pub use embedding::EmbeddingService;
pub use error::{ErrorKind, RagError, Result, Stage};
pub use generation::{ChatMessage, DEFAULT_TEMPERATURE, GenerationConfig, GenerationService, Role};
pub use index::VectorIndex;
pub use inmemory::InMemoryVectorIndex;
pub use orchestrator::{RagOrchestrator, RagOrchestratorBuilder};
pub use persistent::FileVectorIndex;
pub use prompt::{Prompt, PromptBuilder, SelectionPolicy};
pub use retriever::Retriever;
pub use similarity::{MAX_COSINE_DISTANCE, cosine_distance};
