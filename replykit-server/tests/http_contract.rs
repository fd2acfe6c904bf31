use std::sync::{Arc, OnceLock};

use replykit_rag::mock::{MockEmbeddingService, MockGenerationService};
use replykit_rag::{Document, InMemoryVectorIndex, RagOrchestrator, VectorIndex};
use replykit_server::{AppState, GenerateResponse, app_router};
use replykit_telemetry::{LogFormat, RequestTraceStore, init_with_recorder};
use serde_json::{Value, json};

const DIM: usize = 4;
const CUSTOMER: &str = "My package is late";
const AGENT: &str = "We're sorry, please DM your order number.";

fn traces() -> Arc<RequestTraceStore> {
    static TRACES: OnceLock<Arc<RequestTraceStore>> = OnceLock::new();
    TRACES
        .get_or_init(|| {
            let store = Arc::new(RequestTraceStore::new(64));
            let _ = init_with_recorder(LogFormat::Pretty, store.clone());
            store
        })
        .clone()
}

async fn spawn_server(
    generator: Arc<MockGenerationService>,
    seed: bool,
) -> (String, tokio::task::JoinHandle<()>) {
    let index = Arc::new(InMemoryVectorIndex::new(DIM));
    if seed {
        index
            .upsert(&Document::exchange("d1", CUSTOMER, vec![0.9, 0.1, 0.0, 0.0], AGENT))
            .await
            .expect("seed index");
    }
    let embedder = MockEmbeddingService::new(DIM)
        .with_vector("Where is my order?", vec![0.85, 0.15, 0.05, 0.0]);

    let orchestrator = RagOrchestrator::builder()
        .embedding_service(Arc::new(embedder))
        .vector_index(index)
        .generation_service(generator)
        .build()
        .expect("orchestrator");
    let app = app_router(AppState::new(orchestrator).with_traces(traces()));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("listener addr");

    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server run");
    });

    (format!("http://{}", addr), handle)
}

#[tokio::test]
async fn health_reports_the_index_size() {
    let (base, handle) = spawn_server(Arc::new(MockGenerationService::new("ok")), true).await;

    let response = reqwest::get(format!("{base}/health")).await.expect("health response");
    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("health json");
    assert_eq!(body, json!({ "status": "ok", "service": "replykit", "documents": 1 }));

    handle.abort();
}

#[tokio::test]
async fn index_page_and_script_are_served() {
    let (base, handle) = spawn_server(Arc::new(MockGenerationService::new("ok")), true).await;

    let page = reqwest::get(format!("{base}/")).await.expect("index response");
    assert_eq!(page.status(), reqwest::StatusCode::OK);
    let content_type = page
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.starts_with("text/html"), "unexpected content type: {content_type}");
    let html = page.text().await.expect("index body");
    assert!(html.contains("customer-tweet"));
    assert!(html.contains("/static/js/script.js"));

    let script = reqwest::get(format!("{base}/static/js/script.js")).await.expect("script");
    assert_eq!(script.status(), reqwest::StatusCode::OK);
    assert!(script.text().await.expect("script body").contains("/generate"));

    handle.abort();
}

#[tokio::test]
async fn generate_returns_the_reply_and_its_grounding() {
    let generator = Arc::new(MockGenerationService::new("Hi! Please DM us your order number."));
    let (base, handle) = spawn_server(generator.clone(), true).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/generate"))
        .json(&json!({ "input_text": "Where is my order?" }))
        .send()
        .await
        .expect("generate response");

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    let body: GenerateResponse = response.json().await.expect("generate json");
    assert_eq!(body.response, "Hi! Please DM us your order number.");
    assert_eq!(body.similar_customer_tweet, CUSTOMER);
    assert_eq!(body.similar_company_tweet, AGENT);
    assert_eq!(generator.calls(), 1);

    handle.abort();
}

#[tokio::test]
async fn missing_or_empty_input_is_a_bad_request() {
    let generator = Arc::new(MockGenerationService::new("ok"));
    let (base, handle) = spawn_server(generator.clone(), true).await;
    let client = reqwest::Client::new();

    for body in [json!({}), json!({ "input_text": "" }), json!({ "input_text": "  " })] {
        let response = client
            .post(format!("{base}/generate"))
            .json(&body)
            .send()
            .await
            .expect("generate response");
        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST, "{body}");
        let error: Value = response.json().await.expect("error json");
        assert_eq!(error["error"], "input_text is required");
        assert_eq!(error["kind"], "invalid_input");
    }

    let response = client
        .post(format!("{base}/generate"))
        .header(reqwest::header::CONTENT_TYPE, "application/json")
        .body("{not json")
        .send()
        .await
        .expect("generate response");
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);

    assert_eq!(generator.calls(), 0);
    handle.abort();
}

#[tokio::test]
async fn empty_index_is_service_unavailable() {
    let (base, handle) = spawn_server(Arc::new(MockGenerationService::new("ok")), false).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/generate"))
        .json(&json!({ "input_text": "Where is my order?" }))
        .send()
        .await
        .expect("generate response");

    assert_eq!(response.status(), reqwest::StatusCode::SERVICE_UNAVAILABLE);
    let error: Value = response.json().await.expect("error json");
    assert_eq!(error["kind"], "no_results_available");

    handle.abort();
}

#[tokio::test]
async fn provider_failure_is_a_bad_gateway() {
    let generator = Arc::new(MockGenerationService::new("unused").failing("upstream 500"));
    let (base, handle) = spawn_server(generator, true).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/generate"))
        .json(&json!({ "input_text": "Where is my order?" }))
        .send()
        .await
        .expect("generate response");

    assert_eq!(response.status(), reqwest::StatusCode::BAD_GATEWAY);
    let error: Value = response.json().await.expect("error json");
    assert_eq!(error["kind"], "generation_provider_error");

    handle.abort();
}

#[tokio::test]
async fn request_spans_are_served_by_id() {
    let (base, handle) = spawn_server(Arc::new(MockGenerationService::new("ok")), true).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{base}/generate"))
        .json(&json!({ "input_text": "Where is my order?" }))
        .send()
        .await
        .expect("generate response");
    let request_id = response
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .expect("request id header")
        .to_string();

    let unknown = client.get(format!("{base}/api/trace/unknown")).send().await.expect("trace");
    assert_eq!(unknown.status(), reqwest::StatusCode::NOT_FOUND);

    // Only meaningful when this test binary owns the global subscriber.
    if traces().get_trace(&request_id).is_none() {
        handle.abort();
        return;
    }
    let trace: Value = client
        .get(format!("{base}/api/trace/{request_id}"))
        .send()
        .await
        .expect("trace response")
        .json()
        .await
        .expect("trace json");
    assert_eq!(trace["request_id"], request_id);
    let names: Vec<&str> = trace["spans"]
        .as_array()
        .expect("spans array")
        .iter()
        .filter_map(|s| s["name"].as_str())
        .collect();
    assert!(names.contains(&"rag.answer"), "{names:?}");
    assert!(names.contains(&"http.generate"), "{names:?}");

    handle.abort();
}
