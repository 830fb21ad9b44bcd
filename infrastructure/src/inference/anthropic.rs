//! Anthropic Messages API gateway.
//!
//! One `POST /v1/messages` per request. Transport failures are reported as
//! [`GatewayError`]s and never retried here: the pipeline owns the retry
//! policy and the timeout.

use crate::config::FileAnthropicConfig;
use async_trait::async_trait;
use gapwise_application::ports::inference_gateway::{GatewayError, InferenceGateway};
use gapwise_domain::InferenceRequest;
use reqwest::StatusCode;
use serde_json::{Value, json};
use tracing::debug;

pub struct AnthropicGateway {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    api_version: String,
    model: String,
    max_tokens: u32,
}

impl AnthropicGateway {
    pub fn new(
        config: &FileAnthropicConfig,
        model: impl Into<String>,
    ) -> Result<Self, GatewayError> {
        let api_key = config.resolve_api_key().ok_or_else(|| {
            GatewayError::ModelNotAvailable(format!(
                "Anthropic API key not found (set ${})",
                config.api_key_env
            ))
        })?;
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| GatewayError::Other(e.to_string()))?;
        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_version: config.api_version.clone(),
            model: model.into(),
            max_tokens: config.max_tokens,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/messages", self.base_url)
    }

    pub(crate) fn build_request_body(&self, request: &InferenceRequest) -> Value {
        json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "system": request.system_instruction,
            "messages": [
                {"role": "user", "content": request.render_user_message()}
            ],
        })
    }
}

/// Concatenates the text blocks of a Messages API response.
pub(crate) fn parse_response(response: &Value) -> Result<String, GatewayError> {
    if response.get("type").and_then(Value::as_str) == Some("error") {
        let message = response
            .pointer("/error/message")
            .and_then(Value::as_str)
            .unwrap_or("unknown Anthropic API error");
        return Err(GatewayError::RequestFailed(message.to_string()));
    }

    let content = response
        .get("content")
        .and_then(Value::as_array)
        .ok_or_else(|| GatewayError::InvalidResponse("no content array".to_string()))?;

    let text: String = content
        .iter()
        .filter(|block| block.get("type").and_then(Value::as_str) == Some("text"))
        .filter_map(|block| block.get("text").and_then(Value::as_str))
        .collect();

    if text.trim().is_empty() {
        return Err(GatewayError::InvalidResponse(
            "response contained no text".to_string(),
        ));
    }
    Ok(text)
}

fn status_error(status: StatusCode, body: &str) -> GatewayError {
    let snippet: String = body.chars().take(500).collect();
    match status.as_u16() {
        401 | 403 => GatewayError::ModelNotAvailable(format!("authentication failed ({})", status)),
        404 => GatewayError::ModelNotAvailable(format!("model not found ({}): {}", status, snippet)),
        429 | 529 => GatewayError::RequestFailed(format!("Anthropic API busy ({})", status)),
        _ => GatewayError::RequestFailed(format!("Anthropic API error ({}): {}", status, snippet)),
    }
}

fn transport_error(e: reqwest::Error) -> GatewayError {
    if e.is_timeout() {
        GatewayError::Timeout
    } else if e.is_connect() {
        GatewayError::ConnectionError(e.to_string())
    } else {
        GatewayError::RequestFailed(e.to_string())
    }
}

#[async_trait]
impl InferenceGateway for AnthropicGateway {
    async fn complete(&self, request: &InferenceRequest) -> Result<String, GatewayError> {
        let body = self.build_request_body(request);
        debug!(schema = %request.schema, model = %self.model, "Sending Anthropic request");

        let response = self
            .client
            .post(self.endpoint())
            .header("content-type", "application/json")
            .header("x-api-key", self.api_key.as_str())
            .header("anthropic-version", self.api_version.as_str())
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let text = response.text().await.map_err(transport_error)?;
        if !status.is_success() {
            return Err(status_error(status, &text));
        }

        let json: Value = serde_json::from_str(&text)
            .map_err(|e| GatewayError::InvalidResponse(format!("body is not JSON: {}", e)))?;
        parse_response(&json)
    }

    fn name(&self) -> &str {
        "anthropic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gapwise_domain::OutputSchema;

    fn gateway() -> AnthropicGateway {
        let config = FileAnthropicConfig {
            api_key: Some("sk-test".to_string()),
            base_url: "https://example.test/".to_string(),
            ..FileAnthropicConfig::default()
        };
        AnthropicGateway::new(&config, "claude-sonnet-4-5").unwrap()
    }

    #[test]
    fn test_request_body() {
        let gateway = gateway();
        assert_eq!(gateway.endpoint(), "https://example.test/v1/messages");

        let request = InferenceRequest::new("be terse", OutputSchema::Gaps, json!({"x": 1}));
        let body = gateway.build_request_body(&request);
        assert_eq!(body["model"], "claude-sonnet-4-5");
        assert_eq!(body["system"], "be terse");
        assert_eq!(body["messages"][0]["role"], "user");
        assert!(
            body["messages"][0]["content"]
                .as_str()
                .unwrap()
                .contains("\"x\": 1")
        );
    }

    #[test]
    fn test_parse_text_blocks() {
        let response = json!({
            "content": [
                {"type": "text", "text": "[{\"description\": "},
                {"type": "tool_use", "id": "t1"},
                {"type": "text", "text": "\"gap\"}]"}
            ]
        });
        assert_eq!(
            parse_response(&response).unwrap(),
            "[{\"description\": \"gap\"}]"
        );
    }

    #[test]
    fn test_parse_api_error() {
        let response = json!({"type": "error", "error": {"message": "overloaded"}});
        assert_eq!(
            parse_response(&response),
            Err(GatewayError::RequestFailed("overloaded".to_string()))
        );
        assert!(matches!(
            parse_response(&json!({"content": []})),
            Err(GatewayError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            status_error(StatusCode::UNAUTHORIZED, ""),
            GatewayError::ModelNotAvailable(_)
        ));
        assert!(matches!(
            status_error(StatusCode::TOO_MANY_REQUESTS, ""),
            GatewayError::RequestFailed(_)
        ));
    }

    #[test]
    fn test_missing_key() {
        let config = FileAnthropicConfig {
            api_key_env: "GAPWISE_TEST_UNSET_KEY_VAR".to_string(),
            ..FileAnthropicConfig::default()
        };
        assert!(AnthropicGateway::new(&config, "m").is_err());
    }
}
