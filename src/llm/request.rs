use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::ClassifiedError;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_MAX_RETRIES: u32 = 3;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Sampling knobs forwarded to the endpoint
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_tokens: u32,
    /// Ask the endpoint for a strict JSON object response
    pub json_mode: bool,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 4096,
            json_mode: true,
        }
    }
}

/// One logical request against a chat-completions endpoint.
///
/// The engine only ever borrows a request, so it is effectively immutable
/// for the lifetime of an invocation.
#[derive(Clone)]
pub struct InvocationRequest {
    pub endpoint: String,
    pub model: String,
    pub api_key: String,
    pub messages: Vec<Message>,
    pub params: GenerationParams,
    /// Budget for each attempt; every retry gets the full amount
    pub timeout: Duration,
    pub max_retries: u32,
}

impl InvocationRequest {
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            model: model.into(),
            api_key: api_key.into(),
            messages: Vec::new(),
            params: GenerationParams::default(),
            timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    pub fn message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }

    pub fn messages(mut self, messages: impl IntoIterator<Item = Message>) -> Self {
        self.messages.extend(messages);
        self
    }

    pub fn params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Check the preconditions that make a network attempt meaningful.
    pub fn validate(&self) -> Result<(), ClassifiedError> {
        if self.api_key.trim().is_empty() {
            return Err(ClassifiedError::malformed("credential is empty"));
        }
        if self.endpoint.trim().is_empty() {
            return Err(ClassifiedError::malformed("endpoint is empty"));
        }
        if self.model.trim().is_empty() {
            return Err(ClassifiedError::malformed("model is empty"));
        }
        if self.messages.is_empty() {
            return Err(ClassifiedError::malformed("message list is empty"));
        }
        if let Some(index) = self
            .messages
            .iter()
            .position(|m| m.content.trim().is_empty())
        {
            return Err(ClassifiedError::malformed(format!(
                "message {} has empty content",
                index
            )));
        }
        if self.timeout.is_zero() {
            return Err(ClassifiedError::malformed("timeout must be greater than zero"));
        }
        Ok(())
    }
}

impl fmt::Debug for InvocationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvocationRequest")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("api_key", &redact(&self.api_key))
            .field("messages", &self.messages.len())
            .field("params", &self.params)
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

/// Keep only enough of a credential to recognise it.
pub fn redact(secret: &str) -> String {
    let len = secret.chars().count();
    match len {
        0 => "<empty>".to_string(),
        1..=8 => "****".to_string(),
        _ => {
            let tail: String = secret.chars().skip(len - 4).collect();
            format!("****{}", tail)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> InvocationRequest {
        InvocationRequest::new("https://example.test/v1/chat/completions", "gpt-4o-mini", "sk-test-123456")
            .message(Message::system("You are a world builder."))
            .message(Message::user("Describe a desert kingdom."))
    }

    #[test]
    fn test_valid_request_passes() {
        assert!(request().validate().is_ok());
    }

    #[test]
    fn test_empty_credential_rejected() {
        let mut req = request();
        req.api_key = "   ".to_string();
        let err = req.validate().unwrap_err();
        assert!(err.to_string().contains("credential"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_empty_messages_rejected() {
        let req = InvocationRequest::new("https://example.test", "m", "key");
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_blank_message_content_rejected() {
        let req = request().message(Message::user("\n  "));
        let err = req.validate().unwrap_err();
        assert!(err.to_string().contains("message 2"));
    }

    #[test]
    fn test_debug_redacts_key() {
        let rendered = format!("{:?}", request());
        assert!(!rendered.contains("sk-test-123456"));
        assert!(rendered.contains("****3456"));
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_value(Message::assistant("hi")).unwrap();
        assert_eq!(json["role"], "assistant");
    }
}
