mod common;
use serde_json::json;
use sift_common::{Result, SiftError};
use sift_llm::gemini::GeminiClient;
use sift_llm::traits::{LlmClient, ResponseFormat};
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MODEL: &str = "gemini-2.0-flash";

fn client_for(server: &MockServer) -> GeminiClient {
    GeminiClient::new("test-key".to_string(), MODEL.to_string())
        .expect("client builds")
        .with_base_url(server.uri())
}

#[tokio::test]
async fn gemini_generate_returns_first_candidate_text() -> Result<()> {
    common::init_test_tracing();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("/models/{MODEL}:generateContent")))
        .and(query_param("key", "test-key"))
        .and(body_partial_json(json!({
            "generationConfig": { "responseMimeType": "application/json", "maxOutputTokens": 2048 },
            "systemInstruction": { "parts": [{ "text": "be terse" }] }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": { "parts": [{ "text": "{\"ok\":" }, { "text": "true}" }] },
                "finishReason": "STOP"
            }],
            "usageMetadata": { "totalTokenCount": 12 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = client_for(&server)
        .generate("hello", Some("be terse"), ResponseFormat::Json)
        .await?;

    assert_eq!(response.text, "{\"ok\":true}");
    assert_eq!(response.tokens_used, Some(12));
    assert_eq!(response.model.as_deref(), Some(MODEL));
    Ok(())
}

#[tokio::test]
async fn gemini_maps_rate_limit() {
    common::init_test_tracing();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .generate("hello", None, ResponseFormat::Text)
        .await
        .unwrap_err();

    match err {
        SiftError::Llm(msg) => assert!(msg.contains("Rate limit"), "unexpected message: {msg}"),
        other => panic!("expected LLM error, got {other:?}"),
    }
}

#[tokio::test]
async fn gemini_reports_safety_blocks() {
    common::init_test_tracing();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{ "finishReason": "SAFETY" }]
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client
        .generate("hello", None, ResponseFormat::Text)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("safety"));
    assert!(!client.health_check().await.unwrap());
}
