use async_trait::async_trait;
use thiserror::Error;

use super::request::InvocationRequest;

/// Status and body of whatever the endpoint answered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Low-level failure before a complete response was read
/// (DNS, refused or reset connection, truncated body).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct TransportError(pub String);

/// One network round trip. Implementations must not retry on their own;
/// retry and timeout policy belongs to the engine.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &InvocationRequest)
        -> Result<TransportResponse, TransportError>;

    fn name(&self) -> &str;
}

// ============================================================================
// OPENAI-COMPATIBLE HTTP TRANSPORT
// ============================================================================

#[derive(Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reuse an existing client (and its connection pool).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

/// JSON body for a chat-completions POST.
pub fn request_body(request: &InvocationRequest) -> serde_json::Value {
    let messages: Vec<serde_json::Value> = request
        .messages
        .iter()
        .map(|m| {
            serde_json::json!({
                "role": m.role,
                "content": m.content
            })
        })
        .collect();

    let mut body = serde_json::json!({
        "model": request.model,
        "messages": messages,
        "max_tokens": request.params.max_tokens,
        "temperature": request.params.temperature
    });

    if request.params.json_mode {
        body["response_format"] = serde_json::json!({ "type": "json_object" });
    }

    body
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        request: &InvocationRequest,
    ) -> Result<TransportResponse, TransportError> {
        let response = self
            .client
            .post(&request.endpoint)
            .header("Authorization", format!("Bearer {}", request.api_key))
            .header("Content-Type", "application/json")
            .json(&request_body(request))
            .send()
            .await
            .map_err(|e| TransportError(describe(&e)))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError(format!("failed to read response body: {}", describe(&e))))?;

        Ok(TransportResponse { status, body })
    }

    fn name(&self) -> &str {
        "http"
    }
}

fn describe(error: &reqwest::Error) -> String {
    if error.is_connect() {
        format!("connection failed: {}", error)
    } else if error.is_builder() {
        format!("invalid request: {}", error)
    } else {
        error.to_string()
    }
}
