//! HTTP-level tests for the Ollama embedding, generation and vision backends
//! against a wiremock server.

use paperscope_core::{EmbeddingBackend, Error, GenerationBackend};
use paperscope_inference::{OllamaBackend, OllamaVisionBackend, VisionBackend};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn backend_for(server: &MockServer) -> OllamaBackend {
    OllamaBackend::with_config(
        server.uri(),
        "all-minilm".to_string(),
        "llama3".to_string(),
        3,
    )
}

#[tokio::test]
async fn test_embed_texts_posts_batch() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .and(body_partial_json(json!({"model": "all-minilm", "input": ["a", "b"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "embeddings": [[0.1, 0.2, 0.3], [0.4, 0.5, 0.6]]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let vectors = backend_for(&server)
        .embed_texts(&["a".to_string(), "b".to_string()])
        .await
        .unwrap();
    assert_eq!(vectors.len(), 2);
    assert_eq!(vectors[1].as_slice(), &[0.4, 0.5, 0.6]);
}

#[tokio::test]
async fn test_embed_empty_input_skips_request() {
    let server = MockServer::start().await;
    let vectors = backend_for(&server).embed_texts(&[]).await.unwrap();
    assert!(vectors.is_empty());
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_embed_count_mismatch_is_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"embeddings": [[0.1, 0.2, 0.3]]})),
        )
        .mount(&server)
        .await;

    let result = backend_for(&server)
        .embed_texts(&["a".to_string(), "b".to_string()])
        .await;
    assert!(matches!(result, Err(Error::Embedding(_))));
}

#[tokio::test]
async fn test_generate_json_requests_json_format() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(json!({
            "format": "json",
            "think": false,
            "options": {"temperature": 0.0}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": {"role": "assistant", "content": "{\"query_content\": \"gnn\"}"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let out = backend_for(&server)
        .generate_json_with_system("Extract intent", "recent gnn papers")
        .await
        .unwrap();
    assert_eq!(out, "{\"query_content\": \"gnn\"}");
}

#[tokio::test]
async fn test_generate_server_error_is_inference_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(500).set_body_string("model not loaded"))
        .mount(&server)
        .await;

    let err = backend_for(&server).generate("hello").await.unwrap_err();
    assert!(matches!(err, Error::Inference(_)));
    assert!(err.to_string().contains("model not loaded"));
}

#[tokio::test]
async fn test_vision_sends_base64_image() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(json!({"model": "llava", "images": ["AQID"]})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"response": "A line chart"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let backend = OllamaVisionBackend::new(server.uri(), "llava".to_string());
    let out = backend
        .describe_image(&[1, 2, 3], "image/png", Some("Describe"))
        .await
        .unwrap();
    assert_eq!(out, "A line chart");
}

#[tokio::test]
async fn test_vision_error_status_is_vision_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let backend = OllamaVisionBackend::new(server.uri(), "llava".to_string());
    let result = backend.describe_image(&[1], "image/png", None).await;
    assert!(matches!(result, Err(Error::Vision(_))));
}
