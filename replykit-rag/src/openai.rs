//! OpenAI embedding and chat-completion services.
//!
//! This module is only available when the `openai` feature is enabled.
//! Both services call the REST API directly with `reqwest` and work against
//! any OpenAI-compatible endpoint via `with_base_url`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::embedding::EmbeddingService;
use crate::error::{RagError, Result};
use crate::generation::{ChatMessage, GenerationConfig, GenerationService};

/// The default OpenAI API base URL.
pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// The default model for OpenAI embeddings.
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// The default dimensionality for `text-embedding-3-small`.
pub const DEFAULT_DIMENSIONS: usize = 1536;

/// The default chat model.
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";

const PROVIDER: &str = "OpenAI";

fn api_key_from_env() -> std::result::Result<String, String> {
    std::env::var("OPENAI_API_KEY")
        .map_err(|_| "OPENAI_API_KEY environment variable not set".to_string())
}

fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}/{path}", base_url.trim_end_matches('/'))
}

// ── Shared API types ───────────────────────────────────────────────

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Turn a non-success response into a readable message.
async fn error_detail(response: reqwest::Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let detail =
        serde_json::from_str::<ErrorResponse>(&body).map(|e| e.error.message).unwrap_or(body);
    format!("API returned {status}: {detail}")
}

// ── Embeddings ─────────────────────────────────────────────────────

/// An [`EmbeddingService`] backed by the OpenAI embeddings API.
///
/// # Configuration
///
/// - `model` – defaults to `text-embedding-3-small`.
/// - `dimensions` – optional Matryoshka dimension override.
/// - `api_key` – from the constructor or the `OPENAI_API_KEY` environment variable.
///
/// # Example
///
/// ```rust,ignore
/// use replykit_rag::openai::OpenAIEmbeddingService;
///
/// let service = OpenAIEmbeddingService::new("sk-...")?;
/// let embedding = service.embed("my package is late").await?;
/// ```
pub struct OpenAIEmbeddingService {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    dimensions: usize,
    /// If set, passed to the API for Matryoshka dimension truncation.
    request_dimensions: Option<usize>,
}

impl OpenAIEmbeddingService {
    /// Create a new service with the given API key.
    ///
    /// Uses the default model (`text-embedding-3-small`) and dimensions (1536).
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(RagError::EmbeddingProviderError {
                provider: PROVIDER.into(),
                message: "API key must not be empty".into(),
            });
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: OPENAI_API_BASE.into(),
            model: DEFAULT_EMBEDDING_MODEL.into(),
            dimensions: DEFAULT_DIMENSIONS,
            request_dimensions: None,
        })
    }

    /// Create a new service using the `OPENAI_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        let api_key = api_key_from_env().map_err(|message| RagError::EmbeddingProviderError {
            provider: PROVIDER.into(),
            message,
        })?;
        Self::new(api_key)
    }

    /// Point the service at an OpenAI-compatible API.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the model name (e.g. `text-embedding-3-large`).
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the output dimensions (Matryoshka support).
    ///
    /// When set, the API returns embeddings truncated to this size.
    /// This also updates the value returned by [`dimensions()`](EmbeddingService::dimensions).
    pub fn with_dimensions(mut self, dims: usize) -> Self {
        self.dimensions = dims;
        self.request_dimensions = Some(dims);
        self
    }

    fn provider_error(message: impl Into<String>) -> RagError {
        RagError::EmbeddingProviderError { provider: PROVIDER.into(), message: message.into() }
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingService for OpenAIEmbeddingService {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(provider = PROVIDER, text_len = text.len(), model = %self.model, "embedding text");

        let request_body = EmbeddingRequest {
            model: &self.model,
            input: vec![text],
            dimensions: self.request_dimensions,
        };

        let response = self
            .client
            .post(endpoint(&self.base_url, "embeddings"))
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = PROVIDER, error = %e, "embedding request failed");
                Self::provider_error(format!("request failed: {e}"))
            })?;

        if !response.status().is_success() {
            let message = error_detail(response).await;
            error!(provider = PROVIDER, %message, "embedding API error");
            return Err(Self::provider_error(message));
        }

        let embedding_response: EmbeddingResponse = response.json().await.map_err(|e| {
            error!(provider = PROVIDER, error = %e, "failed to parse embedding response");
            Self::provider_error(format!("failed to parse response: {e}"))
        })?;

        let embedding = embedding_response
            .data
            .into_iter()
            .next()
            .ok_or_else(|| Self::provider_error("API returned empty response"))?
            .embedding;

        if embedding.len() != self.dimensions {
            return Err(Self::provider_error(format!(
                "expected {} dimensions, API returned {}",
                self.dimensions,
                embedding.len()
            )));
        }
        Ok(embedding)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        &self.model
    }
}

// ── Chat completions ───────────────────────────────────────────────

/// A [`GenerationService`] backed by the OpenAI chat completions API.
///
/// # Example
///
/// ```rust,ignore
/// use replykit_rag::openai::OpenAIChatService;
/// use replykit_rag::GenerationConfig;
///
/// let chat = OpenAIChatService::new("sk-...", GenerationConfig::new("gpt-4o-mini"))?;
/// let reply = chat.complete(&[ChatMessage::user("Hello")]).await?;
/// ```
pub struct OpenAIChatService {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    config: GenerationConfig,
}

impl OpenAIChatService {
    /// Create a new chat service with the given API key and sampling settings.
    pub fn new(api_key: impl Into<String>, config: GenerationConfig) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(Self::provider_error("API key must not be empty"));
        }
        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: OPENAI_API_BASE.into(),
            config,
        })
    }

    /// Create a chat service for `gpt-4o-mini` using `OPENAI_API_KEY`.
    pub fn from_env() -> Result<Self> {
        let api_key = api_key_from_env().map_err(Self::provider_error)?;
        Self::new(api_key, GenerationConfig::new(DEFAULT_CHAT_MODEL))
    }

    /// Point the service at an OpenAI-compatible API.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    fn provider_error(message: impl Into<String>) -> RagError {
        RagError::GenerationProviderError { provider: PROVIDER.into(), message: message.into() }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl GenerationService for OpenAIChatService {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        debug!(
            provider = PROVIDER,
            model = %self.config.model,
            message_count = messages.len(),
            temperature = self.config.temperature,
            "requesting chat completion"
        );

        let request_body = ChatRequest {
            model: &self.config.model,
            messages,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let response = self
            .client
            .post(endpoint(&self.base_url, "chat/completions"))
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = PROVIDER, error = %e, "chat request failed");
                Self::provider_error(format!("request failed: {e}"))
            })?;

        if !response.status().is_success() {
            let message = error_detail(response).await;
            error!(provider = PROVIDER, %message, "chat API error");
            return Err(Self::provider_error(message));
        }

        let chat_response: ChatResponse = response.json().await.map_err(|e| {
            error!(provider = PROVIDER, error = %e, "failed to parse chat response");
            Self::provider_error(format!("failed to parse response: {e}"))
        })?;

        chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| Self::provider_error("API returned no completion"))
    }

    fn name(&self) -> &str {
        &self.config.model
    }
}
