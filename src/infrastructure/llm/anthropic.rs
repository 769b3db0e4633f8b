use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::http_client::HttpClientTrait;
use crate::domain::{
    DomainError, FinishReason, LlmProvider, LlmRequest, LlmResponse, Message, MessageRole, Usage,
};

const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Anthropic messages API provider
#[derive(Debug)]
pub struct AnthropicProvider<C: HttpClientTrait> {
    client: C,
    api_key: String,
    base_url: String,
}

impl<C: HttpClientTrait> AnthropicProvider<C> {
    pub fn new(client: C, api_key: impl Into<String>) -> Self {
        Self::with_base_url(client, api_key, DEFAULT_ANTHROPIC_BASE_URL)
    }

    pub fn with_base_url(
        client: C,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.base_url)
    }

    fn build_request(&self, model: &str, request: &LlmRequest) -> serde_json::Value {
        let messages: Vec<AnthropicMessage> = request
            .messages
            .iter()
            .filter(|m| !m.is_system())
            .map(AnthropicMessage::from_domain)
            .collect();

        let mut body = serde_json::json!({
            "model": model,
            "messages": messages,
            "max_tokens": request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        });

        if let Some(system) = request.system_text() {
            body["system"] = serde_json::json!(system);
        }

        if let Some(temp) = request.temperature {
            body["temperature"] = serde_json::json!(temp);
        }

        if let Some(top_p) = request.top_p {
            body["top_p"] = serde_json::json!(top_p);
        }

        if let Some(ref stop) = request.stop {
            body["stop_sequences"] = serde_json::json!(stop);
        }

        body
    }

    fn headers(&self) -> Vec<(&str, &str)> {
        vec![
            ("x-api-key", self.api_key.as_str()),
            ("anthropic-version", ANTHROPIC_VERSION),
            ("Content-Type", "application/json"),
        ]
    }

    fn parse_response(&self, json: serde_json::Value) -> Result<LlmResponse, DomainError> {
        let response: AnthropicResponse = serde_json::from_value(json).map_err(|e| {
            DomainError::provider("anthropic", format!("Failed to parse response: {}", e))
        })?;

        let content = response
            .content
            .into_iter()
            .filter(|block| block.content_type == "text")
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join("");

        let mut llm_response =
            LlmResponse::new(response.id, response.model, Message::assistant(content));

        if let Some(reason) = response.stop_reason {
            llm_response = llm_response.with_finish_reason(parse_stop_reason(&reason));
        }

        Ok(llm_response.with_usage(Usage::new(
            response.usage.input_tokens,
            response.usage.output_tokens,
        )))
    }
}

#[async_trait]
impl<C: HttpClientTrait> LlmProvider for AnthropicProvider<C> {
    async fn chat(&self, model: &str, request: LlmRequest) -> Result<LlmResponse, DomainError> {
        let url = self.messages_url();
        let body = self.build_request(model, &request);
        let response = self
            .client
            .post_json(&url, self.headers(), &body)
            .await
            .map_err(|e| match e {
                DomainError::Provider { message, .. } => {
                    DomainError::provider("anthropic", message)
                }
                other => other,
            })?;

        self.parse_response(response)
    }

    fn provider_name(&self) -> &'static str {
        "anthropic"
    }
}

fn parse_stop_reason(reason: &str) -> FinishReason {
    match reason {
        "max_tokens" => FinishReason::Length,
        "tool_use" => FinishReason::ToolCalls,
        _ => FinishReason::Stop,
    }
}

// Anthropic API types

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'static str,
    content: &'a str,
}

impl<'a> AnthropicMessage<'a> {
    fn from_domain(message: &'a Message) -> Self {
        let role = match message.role {
            MessageRole::Assistant => "assistant",
            MessageRole::User | MessageRole::System => "user",
        };

        Self {
            role,
            content: message.content_text(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    id: String,
    model: String,
    content: Vec<AnthropicContentBlock>,
    stop_reason: Option<String>,
    usage: AnthropicUsage,
}

#[derive(Debug, Deserialize)]
struct AnthropicContentBlock {
    #[serde(rename = "type")]
    content_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::llm::http_client::mock::MockHttpClient;

    const TEST_URL: &str = "https://api.anthropic.com/v1/messages";

    fn message_response() -> serde_json::Value {
        serde_json::json!({
            "id": "msg_123",
            "model": "claude-3-5-haiku-latest",
            "content": [
                { "type": "text", "text": "Hello" },
                { "type": "text", "text": " there" }
            ],
            "stop_reason": "end_turn",
            "usage": { "input_tokens": 12, "output_tokens": 3 }
        })
    }

    #[tokio::test]
    async fn test_anthropic_chat_joins_text_blocks() {
        let client = MockHttpClient::new().with_response(TEST_URL, message_response());
        let provider = AnthropicProvider::new(client, "test-key");

        let response = provider
            .chat(
                "claude-3-5-haiku-latest",
                LlmRequest::builder().user("Hi").build(),
            )
            .await
            .unwrap();

        assert_eq!(response.content(), "Hello there");
        assert_eq!(response.finish_reason, Some(FinishReason::Stop));
        assert_eq!(response.usage.unwrap().total_tokens, 15);
    }

    #[tokio::test]
    async fn test_anthropic_system_prompt_moves_to_top_level() {
        let client = MockHttpClient::new().with_response(TEST_URL, message_response());
        let provider = AnthropicProvider::new(client, "test-key");

        let request = LlmRequest::builder()
            .system("You are a translator")
            .user("Bonjour")
            .build();
        provider.chat("claude", request).await.unwrap();

        let body = &provider.client.bodies()[0];
        assert_eq!(body["system"], "You are a translator");
        assert_eq!(body["max_tokens"], 4096);
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert_eq!(body["messages"][0]["role"], "user");
    }

    #[tokio::test]
    async fn test_anthropic_error() {
        let client = MockHttpClient::new().with_error(TEST_URL, "overloaded");
        let provider = AnthropicProvider::new(client, "test-key");

        let err = provider
            .chat("claude", LlmRequest::builder().user("Hi").build())
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::Provider { ref provider, .. } if provider == "anthropic"));
    }
}
