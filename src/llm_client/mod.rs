use crate::config::ApiConfig;
use crate::error::ApiError;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

#[derive(Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub tools: Vec<Tool>,
    pub tool_choice: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Message {
    pub role: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    fn text(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::text("system", content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::text("user", content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::text("assistant", content)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Tool {
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: ToolFunction,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ToolFunction {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ToolCall {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default = "default_call_type")]
    pub call_type: String,
    pub function: ToolCallFunction,
}

fn default_call_type() -> String {
    "function".to_string()
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ToolCallFunction {
    pub name: String,
    pub arguments: String,
}

#[derive(Deserialize, Debug)]
pub struct ChatResponse {
    pub choices: Vec<Choice>,
}

#[derive(Deserialize, Debug)]
pub struct Choice {
    pub message: Message,
}

impl ChatResponse {
    /// The first choice's message, which is the only one ever requested.
    pub fn into_message(self) -> Result<Message, ApiError> {
        self.choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .ok_or_else(|| ApiError::InvalidResponse("response contained no choices".to_string()))
    }
}

/// Client for an OpenAI-compatible chat-completions endpoint.
///
/// Built once at startup and owned by the interpreter; the underlying
/// connection pool is released when it is dropped.
pub struct ModelClient {
    client: reqwest::Client,
    config: ApiConfig,
}

impl ModelClient {
    pub fn new(mut config: ApiConfig) -> Result<Self, Box<dyn std::error::Error>> {
        // reqwest treats a zero timeout as "fail immediately"; keep the stored
        // value equal to the one actually applied so errors report it.
        config.timeout_secs = config.timeout_secs.max(1);

        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or("API key not configured")?;

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::AUTHORIZATION,
            format!("Bearer {}", api_key).parse()?,
        );
        headers.insert("X-Title", "filebot".parse()?);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        log::debug!("model client ready: {} at {}", config.model, config.base_url);

        Ok(Self { client, config })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    /// Send one chat-completion request. Timeouts and rate limits are retried
    /// at most `max_retries` times with a linear backoff.
    pub async fn chat_completion(
        &self,
        messages: Vec<Message>,
        tools: Vec<Tool>,
    ) -> Result<ChatResponse, ApiError> {
        let request = ChatRequest {
            model: self.config.model.clone(),
            messages,
            tools,
            tool_choice: "auto".to_string(),
        };

        let mut attempt: u32 = 0;
        loop {
            match self.send_once(&request).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    attempt += 1;
                    let wait = self.backoff(attempt);
                    log::warn!(
                        "{}; retry {}/{} in {:?}",
                        e,
                        attempt,
                        self.config.max_retries,
                        wait
                    );
                    tokio::time::sleep(wait).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Linear backoff, saturating so a huge configured value cannot overflow.
    fn backoff(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.config.retry_backoff_ms.saturating_mul(u64::from(attempt)))
    }

    async fn send_once(&self, request: &ChatRequest) -> Result<ChatResponse, ApiError> {
        let endpoint = self.endpoint();
        log::debug!(
            "POST {} ({} messages, {} tools)",
            endpoint,
            request.messages.len(),
            request.tools.len()
        );

        let raw_response = self
            .client
            .post(&endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = raw_response.status();
        let response_text = raw_response
            .text()
            .await
            .map_err(|e| self.transport_error(e))?;

        log::trace!("raw API response ({}): {}", status, response_text);

        if !status.is_success() {
            return Err(status_error(status, &response_text));
        }

        serde_json::from_str(&response_text)
            .map_err(|e| ApiError::InvalidResponse(format!("{} in {}", e, snippet(&response_text))))
    }

    fn transport_error(&self, error: reqwest::Error) -> ApiError {
        if error.is_timeout() {
            ApiError::Timeout(self.config.timeout_secs)
        } else {
            ApiError::Network(error.to_string())
        }
    }
}

fn status_error(status: StatusCode, body: &str) -> ApiError {
    let message = error_message(body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("no details")
            .to_string()
    });

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ApiError::Authentication(message),
        StatusCode::TOO_MANY_REQUESTS => ApiError::RateLimited(message),
        _ => ApiError::Http {
            status: status.as_u16(),
            message,
        },
    }
}

/// Pull `error.message` out of an error body. Some providers wrap it in an array.
fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let error = match &value {
        Value::Array(items) => items.first()?.get("error")?,
        _ => value.get("error")?,
    };
    error
        .get("message")
        .and_then(Value::as_str)
        .or_else(|| error.as_str())
        .map(str::to_string)
}

fn snippet(text: &str) -> String {
    let cut: String = text.chars().take(80).collect();
    if cut.len() < text.len() {
        format!("{}…", cut)
    } else {
        cut
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api_config() -> ApiConfig {
        ApiConfig {
            api_key: Some("test-key".to_string()),
            ..ApiConfig::default()
        }
    }

    #[test]
    fn test_zero_timeout_is_clamped_and_reported() {
        let client = ModelClient::new(ApiConfig {
            timeout_secs: 0,
            ..api_config()
        })
        .unwrap();

        assert_eq!(client.config.timeout_secs, 1);
        assert_eq!(
            ApiError::Timeout(client.config.timeout_secs).to_string(),
            "the model API did not answer within 1s"
        );
    }

    #[test]
    fn test_backoff_grows_linearly_and_saturates() {
        let client = ModelClient::new(ApiConfig {
            retry_backoff_ms: 250,
            ..api_config()
        })
        .unwrap();
        assert_eq!(client.backoff(1), Duration::from_millis(250));
        assert_eq!(client.backoff(3), Duration::from_millis(750));

        let client = ModelClient::new(ApiConfig {
            retry_backoff_ms: u64::MAX,
            ..api_config()
        })
        .unwrap();
        assert_eq!(client.backoff(2), Duration::from_millis(u64::MAX));
    }

    #[test]
    fn test_error_message_shapes() {
        assert_eq!(
            error_message(r#"{"error": {"message": "API key not valid", "code": 400}}"#),
            Some("API key not valid".to_string())
        );
        assert_eq!(
            error_message(r#"[{"error": {"message": "Quota exceeded", "status": "RESOURCE_EXHAUSTED"}}]"#),
            Some("Quota exceeded".to_string())
        );
        assert_eq!(error_message(r#"{"error": "plain"}"#), Some("plain".to_string()));
        assert_eq!(error_message("<html>oops</html>"), None);
    }

    #[test]
    fn test_status_classification() {
        assert!(matches!(
            status_error(StatusCode::UNAUTHORIZED, ""),
            ApiError::Authentication(_)
        ));
        assert!(matches!(
            status_error(StatusCode::TOO_MANY_REQUESTS, ""),
            ApiError::RateLimited(_)
        ));
        match status_error(StatusCode::INTERNAL_SERVER_ERROR, r#"{"error":{"message":"boom"}}"#) {
            ApiError::Http { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "boom");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_assistant_message_with_null_content() {
        let json = r#"{
            "role": "assistant",
            "content": null,
            "tool_calls": [{
                "id": "call_1",
                "type": "function",
                "function": {"name": "find_files", "arguments": "{\"file_extension\":\"pdf\"}"}
            }]
        }"#;
        let message: Message = serde_json::from_str(json).unwrap();
        assert_eq!(message.content, None);
        assert_eq!(message.tool_calls.unwrap()[0].function.name, "find_files");
    }

    #[test]
    fn test_missing_api_key_rejected() {
        let config = ApiConfig::default();
        assert!(ModelClient::new(config).is_err());
    }
}
