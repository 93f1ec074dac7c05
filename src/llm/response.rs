use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Longest slice of a non-JSON error body that ends up in an error message
const ERROR_BODY_PREVIEW: usize = 200;

/// Token counters reported by the endpoint. Zero when omitted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

impl Usage {
    pub fn total(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }
}

/// Raw text produced by one successful attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelOutput {
    pub text: String,
    pub usage: Usage,
}

/// Decode a 2xx chat-completions body.
///
/// Returns `None` when the body is not JSON or lacks
/// `choices[0].message.content`.
pub fn parse_success(body: &str) -> Option<ModelOutput> {
    let json: Value = serde_json::from_str(body).ok()?;
    let text = json["choices"][0]["message"]["content"].as_str()?.to_string();

    let usage = Usage {
        prompt_tokens: json["usage"]["prompt_tokens"].as_u64().unwrap_or(0),
        completion_tokens: json["usage"]["completion_tokens"].as_u64().unwrap_or(0),
    };

    Some(ModelOutput { text, usage })
}

/// Human-readable message for a non-2xx body: `error.message` if present,
/// otherwise a truncated copy of the body, otherwise the reason phrase.
pub fn error_message(status: u16, body: &str) -> String {
    if let Ok(json) = serde_json::from_str::<Value>(body) {
        if let Some(message) = json["error"]["message"].as_str() {
            return message.to_string();
        }
        if let Some(message) = json["error"].as_str() {
            return message.to_string();
        }
    }

    let trimmed = body.trim();
    if !trimmed.is_empty() {
        return trimmed.chars().take(ERROR_BODY_PREVIEW).collect();
    }

    reqwest::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("no response body")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_success_with_usage() {
        let body = json!({
            "choices": [{"message": {"role": "assistant", "content": "{\"a\":1}"}}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 34}
        })
        .to_string();

        let output = parse_success(&body).unwrap();
        assert_eq!(output.text, "{\"a\":1}");
        assert_eq!(output.usage.prompt_tokens, 12);
        assert_eq!(output.usage.completion_tokens, 34);
        assert_eq!(output.usage.total(), 46);
    }

    #[test]
    fn test_missing_usage_defaults_to_zero() {
        let body = json!({"choices": [{"message": {"content": "hello"}}]}).to_string();
        let output = parse_success(&body).unwrap();
        assert_eq!(output.usage, Usage::default());
    }

    #[test]
    fn test_parse_success_rejects_unexpected_shape() {
        assert!(parse_success("not json").is_none());
        assert!(parse_success(r#"{"choices": []}"#).is_none());
    }

    #[test]
    fn test_error_message_prefers_error_field() {
        let body = json!({"error": {"message": "Incorrect API key provided"}}).to_string();
        assert_eq!(error_message(401, &body), "Incorrect API key provided");
    }

    #[test]
    fn test_error_message_falls_back_to_body_then_reason() {
        assert_eq!(error_message(502, "upstream exploded"), "upstream exploded");
        assert_eq!(error_message(503, ""), "Service Unavailable");

        let long = "x".repeat(1000);
        assert_eq!(error_message(500, &long).len(), 200);
    }
}
