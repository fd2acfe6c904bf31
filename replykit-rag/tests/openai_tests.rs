//! HTTP-level tests for the OpenAI services against a mock server.
#![cfg(feature = "openai")]

use replykit_rag::openai::{OpenAIChatService, OpenAIEmbeddingService};
use replykit_rag::{ChatMessage, EmbeddingService, GenerationConfig, GenerationService, RagError};
use serde_json::json;
use wiremock::matchers::{bearer_token, body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn embedding_request_and_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .and(bearer_token("sk-test"))
        .and(body_partial_json(json!({
            "model": "text-embedding-3-small",
            "input": ["my package is late"],
            "dimensions": 3,
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "list",
            "data": [{ "object": "embedding", "index": 0, "embedding": [0.1, 0.2, 0.3] }],
            "model": "text-embedding-3-small",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let service = OpenAIEmbeddingService::new("sk-test")
        .unwrap()
        .with_base_url(format!("{}/v1", server.uri()))
        .with_dimensions(3);

    let embedding = service.embed("my package is late").await.unwrap();
    assert_eq!(embedding, vec![0.1, 0.2, 0.3]);
}

#[tokio::test]
async fn embedding_api_errors_carry_the_detail() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": { "message": "Rate limit reached", "type": "requests" }
        })))
        .mount(&server)
        .await;

    let service =
        OpenAIEmbeddingService::new("sk-test").unwrap().with_base_url(format!("{}/v1", server.uri()));

    let err = service.embed("hello").await.unwrap_err();
    match err {
        RagError::EmbeddingProviderError { message, .. } => {
            assert!(message.contains("429"), "{message}");
            assert!(message.contains("Rate limit reached"), "{message}");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn embedding_of_unexpected_length_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "data": [{ "embedding": [1.0, 2.0] }] })),
        )
        .mount(&server)
        .await;

    let service = OpenAIEmbeddingService::new("sk-test")
        .unwrap()
        .with_base_url(format!("{}/v1", server.uri()))
        .with_dimensions(3);

    let err = service.embed("hello").await.unwrap_err();
    assert!(matches!(err, RagError::EmbeddingProviderError { .. }));
}

#[tokio::test]
async fn chat_completion_sends_messages_and_temperature() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(bearer_token("sk-test"))
        .and(body_partial_json(json!({
            "model": "gpt-4o-mini",
            "temperature": 0.7,
            "messages": [{ "role": "user", "content": "Where is my order?" }],
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "choices": [{
                "index": 0,
                "message": { "role": "assistant", "content": "Please DM us your order number." },
                "finish_reason": "stop"
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let chat = OpenAIChatService::new("sk-test", GenerationConfig::new("gpt-4o-mini"))
        .unwrap()
        .with_base_url(format!("{}/v1/", server.uri()));

    let reply = chat.complete(&[ChatMessage::user("Where is my order?")]).await.unwrap();
    assert_eq!(reply, "Please DM us your order number.");
}

#[tokio::test]
async fn chat_without_choices_is_a_provider_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
        .mount(&server)
        .await;

    let chat = OpenAIChatService::new("sk-test", GenerationConfig::new("gpt-4o-mini"))
        .unwrap()
        .with_base_url(format!("{}/v1", server.uri()));

    let err = chat.complete(&[ChatMessage::user("hi")]).await.unwrap_err();
    assert!(matches!(err, RagError::GenerationProviderError { .. }));
    assert!(err.is_retryable());
}

#[test]
fn empty_api_keys_are_rejected() {
    assert!(OpenAIEmbeddingService::new("").is_err());
    assert!(OpenAIChatService::new("", GenerationConfig::new("gpt-4o-mini")).is_err());
}
