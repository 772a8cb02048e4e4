//! Token counting tests against a mock server.

use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use unillm::providers::anthropic::AnthropicClient;
use unillm::providers::gemini::GeminiService;
use unillm::types::{ChatMessage, ChatRequest};

#[tokio::test]
async fn anthropic_count_tokens_posts_the_conversation() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/messages/count_tokens"))
        .and(body_partial_json(json!({
            "model": "claude-sonnet-4-20250514",
            "messages": [{"role": "user", "content": "hello world"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"input_tokens": 2095})))
        .expect(1)
        .mount(&server)
        .await;

    let client = AnthropicClient::new("test-key").with_base_url(server.uri());
    let request = ChatRequest::new(
        "claude-sonnet-4-20250514",
        vec![ChatMessage::user("hello world")],
    );
    let tokens = client.count_tokens(&request).await.unwrap();
    assert_eq!(tokens, 2095);
}

#[tokio::test]
async fn gemini_count_tokens_targets_the_model_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/models/gemini-2.5-flash:countTokens"))
        .and(body_partial_json(json!({
            "contents": [{"role": "user", "parts": [{"text": "hello world"}]}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"totalTokens": 31})))
        .expect(1)
        .mount(&server)
        .await;

    let service = GeminiService::new("test-key").with_base_url(server.uri());
    let request = ChatRequest::new("gemini-2.5-flash", vec![ChatMessage::user("hello world")]);
    let tokens = service.count_tokens(&request).await.unwrap();
    assert_eq!(tokens, 31);
}

#[tokio::test]
async fn count_tokens_rejects_empty_conversations() {
    let client = AnthropicClient::new("test-key");
    let request = ChatRequest::new("claude-sonnet-4-20250514", Vec::new());
    assert!(client.count_tokens(&request).await.is_err());
}
