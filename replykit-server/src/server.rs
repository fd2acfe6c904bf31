use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::{HeaderName, HeaderValue, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use replykit_rag::openai::{OpenAIChatService, OpenAIEmbeddingService};
use replykit_rag::{
    FileVectorIndex, GenerationConfig, PromptBuilder, RagOrchestrator, VectorIndex,
};
use replykit_telemetry::RequestTraceStore;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{Instrument, error, info, info_span};
use uuid::Uuid;

use crate::{config::AppConfig, error::ApiError};

pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<RagOrchestrator>,
    /// Present when request spans are being recorded.
    pub traces: Option<Arc<RequestTraceStore>>,
}

impl AppState {
    pub fn new(orchestrator: RagOrchestrator) -> Self {
        Self { orchestrator: Arc::new(orchestrator), traces: None }
    }

    pub fn with_traces(mut self, traces: Arc<RequestTraceStore>) -> Self {
        self.traces = Some(traces);
        self
    }

    /// Open the persisted index and connect the OpenAI providers.
    pub async fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let index = FileVectorIndex::open(
            &config.index.path,
            &config.index.collection,
            config.index.dimensions,
        )
        .await
        .with_context(|| format!("failed to open index at {}", config.index.path.display()))?;
        info!(
            collection = %config.index.collection,
            documents = index.len().await,
            "opened vector index"
        );

        let openai = &config.openai;
        let mut embedder = OpenAIEmbeddingService::new(openai.api_key.clone())?
            .with_model(openai.embedding_model.clone())
            .with_dimensions(config.index.dimensions);
        let mut generation = GenerationConfig::new(openai.chat_model.clone())
            .with_temperature(openai.temperature);
        if let Some(max_tokens) = openai.max_tokens {
            generation = generation.with_max_tokens(max_tokens);
        }
        let mut chat = OpenAIChatService::new(openai.api_key.clone(), generation)?;
        if let Some(base_url) = &openai.base_url {
            embedder = embedder.with_base_url(base_url.clone());
            chat = chat.with_base_url(base_url.clone());
        }

        let orchestrator = RagOrchestrator::builder()
            .config(config.rag_config()?)
            .embedding_service(Arc::new(embedder))
            .vector_index(Arc::new(index))
            .generation_service(Arc::new(chat))
            .prompt_builder(PromptBuilder::new(&config.prompt.brand, &config.prompt.channel))
            .build()
            .context("failed to assemble the answer pipeline")?;

        Ok(Self::new(orchestrator))
    }
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".to_string(), port: 5000 }
    }
}

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    #[serde(default)]
    pub input_text: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub response: String,
    pub similar_customer_tweet: String,
    pub similar_company_tweet: String,
}

pub fn app_router(state: AppState) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/", get(index))
        .route("/static/js/script.js", get(script))
        .route("/health", get(health))
        .route("/generate", post(generate))
        .route("/api/trace/{request_id}", get(get_trace))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

pub async fn run_server(config: ServerConfig, state: AppState) -> anyhow::Result<()> {
    let app = app_router(state);
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| "invalid host/port for replykit server")?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("replykit listening on http://{}", addr);
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
    info!("server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("received Ctrl+C, shutting down"),
        Err(e) => {
            error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    }
}

async fn index() -> impl IntoResponse {
    Html(include_str!("../ui/index.html"))
}

async fn script() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/javascript; charset=utf-8")], include_str!("../ui/script.js"))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let documents = state.orchestrator.retriever().index().len().await;
    Json(json!({ "status": "ok", "service": "replykit", "documents": documents }))
}

async fn generate(
    State(state): State<AppState>,
    body: Result<Json<GenerateRequest>, JsonRejection>,
) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let span = info_span!("http.generate", request.id = %request_id);

    let result = async move {
        let input_text = match body {
            Ok(Json(GenerateRequest { input_text: Some(text) })) if !text.trim().is_empty() => text,
            Ok(_) => return Err(ApiError::bad_request("input_text is required")),
            Err(rejection) => {
                info!(error = %rejection, "rejected request body");
                return Err(ApiError::bad_request("input_text is required"));
            }
        };

        let result = state.orchestrator.answer(&input_text).await.inspect_err(|e| {
            error!(error = %e, kind = e.kind().as_str(), "generation request failed");
        })?;
        let (customer, company) = result.retrieval.as_pair();
        Ok::<_, ApiError>(GenerateResponse {
            similar_customer_tweet: customer.to_string(),
            similar_company_tweet: company.to_string(),
            response: result.text,
        })
    }
    .instrument(span)
    .await;

    let mut response = match result {
        Ok(body) => Json(body).into_response(),
        Err(err) => err.into_response(),
    };
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

async fn get_trace(
    Path(request_id): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let spans = state
        .traces
        .as_ref()
        .and_then(|store| store.get_trace(&request_id))
        .ok_or_else(|| ApiError::not_found(format!("no trace recorded for '{request_id}'")))?;
    Ok(Json(json!({ "request_id": request_id, "spans": spans })))
}
