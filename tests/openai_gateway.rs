use serde_json::{json, Value};
use url::Url;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use lecture_simplifier::gateway::{CompletionGateway, OpenAIGateway, UpstreamError, DEFAULT_MODEL, DEFAULT_SYSTEM_PROMPT};

fn completion(content: Value) -> Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "created": 1700000000,
        "model": "gpt-3.5-turbo",
        "choices": [
            {"index": 0, "message": {"role": "assistant", "content": content}, "finish_reason": "stop"}
        ],
        "usage": {"prompt_tokens": 20, "completion_tokens": 10, "total_tokens": 30}
    })
}

fn gateway_for(server: &MockServer) -> OpenAIGateway {
    let base = Url::parse(&server.uri()).unwrap();
    OpenAIGateway::new("sk-test", &base, DEFAULT_MODEL, DEFAULT_SYSTEM_PROMPT)
}

#[tokio::test]
async fn test_sends_persona_and_prompt_then_trims() {
    let server = MockServer::start().await;
    let prompt = "Summarize the main point of this academic text: Cats are mammals.";
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "model": "gpt-3.5-turbo",
            "messages": [
                {"role": "system", "content": "You are a helpful assistant that processes academic text."},
                {"role": "user", "content": prompt}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(json!("\n  Cats are mammals.  \n"))))
        .expect(1)
        .mount(&server)
        .await;

    let output = gateway_for(&server).complete(prompt).await.unwrap();
    assert_eq!("Cats are mammals.", output);
}

#[tokio::test]
async fn test_rate_limit_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": {"message": "Rate limit reached", "type": "requests", "param": null, "code": null}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let error = gateway_for(&server).complete("hello").await.expect_err("429 is a failure");
    assert!(matches!(error, UpstreamError::Api(_)));
}

#[tokio::test]
async fn test_auth_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"message": "Incorrect API key provided", "type": "invalid_request_error", "param": null, "code": "invalid_api_key"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let error = gateway_for(&server).complete("hello").await.expect_err("401 is a failure");
    assert!(error.to_string().contains("Incorrect API key provided"));
}

#[tokio::test]
async fn test_malformed_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&server)
        .await;

    let error = gateway_for(&server).complete("hello").await.expect_err("body is not a completion");
    assert!(matches!(error, UpstreamError::Api(_)));
}

#[tokio::test]
async fn test_null_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(Value::Null)))
        .mount(&server)
        .await;

    let error = gateway_for(&server).complete("hello").await.expect_err("no text to return");
    assert!(matches!(error, UpstreamError::EmptyContent));
}

#[tokio::test]
async fn test_transport_error() {
    // nothing listens on the discard port
    let base = Url::parse("http://127.0.0.1:9").unwrap();
    let gateway = OpenAIGateway::new("sk-test", &base, DEFAULT_MODEL, DEFAULT_SYSTEM_PROMPT);
    let error = gateway.complete("hello").await.expect_err("connection refused");
    assert!(matches!(error, UpstreamError::Api(_)));
}
