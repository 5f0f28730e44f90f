//! HTTP-level tests for the OpenAI-compatible backend against a wiremock server.
//!
//! ```bash
//! cargo test --package paperscope-inference --features openai --test openai_wiremock_test
//! ```

#![cfg(feature = "openai")]

use paperscope_core::{EmbeddingBackend, Error, GenerationBackend};
use paperscope_inference::openai::{OpenAIBackend, OpenAIConfig};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn backend_for(server: &MockServer) -> OpenAIBackend {
    OpenAIBackend::new(OpenAIConfig {
        base_url: server.uri(),
        api_key: Some("gsk_test".to_string()),
        ..Default::default()
    })
    .unwrap()
}

#[tokio::test]
async fn test_chat_completion_uses_bearer_auth() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("Authorization", "Bearer gsk_test"))
        .and(body_partial_json(json!({"temperature": 0.0})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "answer"}, "finish_reason": "stop"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let out = backend_for(&server)
        .generate_with_system("system", "question")
        .await
        .unwrap();
    assert_eq!(out, "answer");
}

#[tokio::test]
async fn test_json_mode_sets_response_format() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({"response_format": {"type": "json_object"}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "{}"}, "finish_reason": "stop"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let out = backend_for(&server)
        .generate_json_with_system("system", "question")
        .await
        .unwrap();
    assert_eq!(out, "{}");
}

#[tokio::test]
async fn test_error_body_message_is_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"message": "Invalid API Key", "type": "invalid_request_error"}
        })))
        .mount(&server)
        .await;

    let err = backend_for(&server).generate("q").await.unwrap_err();
    assert!(matches!(err, Error::Inference(_)));
    assert!(err.to_string().contains("Invalid API Key"));
}

#[tokio::test]
async fn test_embeddings_sorted_by_index() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"embedding": [0.0, 1.0], "index": 1},
                {"embedding": [1.0, 0.0], "index": 0}
            ]
        })))
        .mount(&server)
        .await;

    let vectors = backend_for(&server)
        .embed_texts(&["first".to_string(), "second".to_string()])
        .await
        .unwrap();
    assert_eq!(vectors[0].as_slice(), &[1.0, 0.0]);
    assert_eq!(vectors[1].as_slice(), &[0.0, 1.0]);
}
