// ============================================
// WORLDSMITH - HTTP Transport Tests
// ============================================

#[cfg(test)]
mod transport_tests {
    use std::sync::Arc;
    use std::time::Duration;

    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use worldsmith::llm::{
        BackoffSchedule, ErrorKind, GenerationParams, HttpTransport, InvocationEngine,
        InvocationRequest, Message,
    };

    fn completion(content: &str) -> serde_json::Value {
        json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": content},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 42, "completion_tokens": 7, "total_tokens": 49}
        })
    }

    fn engine() -> InvocationEngine {
        InvocationEngine::new(Arc::new(HttpTransport::new())).with_backoff(BackoffSchedule::quick())
    }

    fn request(server: &MockServer, max_retries: u32) -> InvocationRequest {
        InvocationRequest::new(
            format!("{}/v1/chat/completions", server.uri()),
            "gpt-4o-mini",
            "sk-live-abcdef",
        )
        .message(Message::system("Respond only with JSON."))
        .message(Message::user("Create a coastal city."))
        .params(GenerationParams {
            temperature: 0.9,
            max_tokens: 1024,
            json_mode: true,
        })
        .max_retries(max_retries)
    }

    #[tokio::test]
    async fn test_success_sends_expected_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-live-abcdef"))
            .and(body_partial_json(json!({
                "model": "gpt-4o-mini",
                "max_tokens": 1024,
                "response_format": {"type": "json_object"},
                "messages": [
                    {"role": "system", "content": "Respond only with JSON."},
                    {"role": "user", "content": "Create a coastal city."}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("{\"city\":\"Saltmere\"}")))
            .expect(1)
            .mount(&server)
            .await;

        let output = engine().invoke(&request(&server, 2)).await.unwrap();
        assert_eq!(output.text, "{\"city\":\"Saltmere\"}");
        assert_eq!(output.usage.prompt_tokens, 42);
        assert_eq!(output.usage.completion_tokens, 7);
    }

    #[tokio::test]
    async fn test_shared_client_settings_are_used() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("user-agent", "worldsmith-test/1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("{}")))
            .expect(1)
            .mount(&server)
            .await;

        let client = reqwest::Client::builder()
            .user_agent("worldsmith-test/1")
            .build()
            .unwrap();
        let engine = InvocationEngine::new(Arc::new(HttpTransport::with_client(client)))
            .with_backoff(BackoffSchedule::quick());

        let output = engine.invoke(&request(&server, 0)).await.unwrap();
        assert_eq!(output.text, "{}");
    }

    #[tokio::test]
    async fn test_missing_usage_defaults_to_zero() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": "{}"}}]
            })))
            .mount(&server)
            .await;

        let output = engine().invoke(&request(&server, 0)).await.unwrap();
        assert_eq!(output.usage.prompt_tokens, 0);
        assert_eq!(output.usage.completion_tokens, 0);
    }

    #[tokio::test]
    async fn test_unauthorized_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let err = engine().invoke(&request(&server, 3)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
        assert_eq!(err.status(), Some(401));
        assert!(err.to_string().contains("Incorrect API key provided"));
    }

    #[tokio::test]
    async fn test_server_errors_retried_until_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("upstream overloaded"))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("{\"ok\":true}")))
            .expect(1)
            .mount(&server)
            .await;

        let output = engine().invoke(&request(&server, 3)).await.unwrap();
        assert_eq!(output.text, "{\"ok\":true}");
    }

    #[tokio::test]
    async fn test_rate_limit_surfaces_after_budget() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({
                "error": {"message": "Rate limit reached"}
            })))
            .expect(3)
            .mount(&server)
            .await;

        let err = engine().invoke(&request(&server, 2)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RateLimited);
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_slow_endpoint_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(completion("{}"))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let req = request(&server, 1).timeout(Duration::from_millis(100));
        let err = engine().invoke(&req).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TimedOut);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_network_fault() {
        // Nothing listens on the discard port
        let req = InvocationRequest::new("http://127.0.0.1:9/v1/chat/completions", "m", "sk-x")
            .message(Message::user("hello"))
            .max_retries(1)
            .timeout(Duration::from_secs(5));

        let err = engine().invoke(&req).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NetworkFault);
    }
}
