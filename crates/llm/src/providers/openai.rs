//! OpenAI Chat Completions provider.
//!
//! Also works with servers exposing the same `/v1/chat/completions` API.

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use crate::types::DEFAULT_OPENAI_URL;
use serde::{Deserialize, Serialize};
use verirag_core::{AppError, AppResult};

#[derive(Debug, Serialize)]
struct OpenAiChatRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAiMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct OpenAiMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct OpenAiChatResponse {
    model: String,
    choices: Vec<OpenAiChoice>,
    #[serde(default)]
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

/// OpenAI completion client.
pub struct OpenAiClient {
    base_url: String,
    auth_header: String,
    client: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(api_key: impl AsRef<str>) -> Self {
        Self::with_base_url(api_key, DEFAULT_OPENAI_URL)
    }

    pub fn with_base_url(api_key: impl AsRef<str>, base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth_header: format!("Bearer {}", api_key.as_ref()),
            client: reqwest::Client::new(),
        }
    }

    fn chat_completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }

    fn build_request<'a>(&self, request: &'a LlmRequest) -> OpenAiChatRequest<'a> {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        if let Some(ref system) = request.system {
            messages.push(OpenAiMessage {
                role: "system",
                content: system,
            });
        }
        messages.extend(request.messages.iter().map(|m| OpenAiMessage {
            role: m.role.as_str(),
            content: &m.content,
        }));

        OpenAiChatRequest {
            model: &request.model,
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        }
    }

    fn parse_response(&self, response: OpenAiChatResponse) -> AppResult<LlmResponse> {
        let choice = response.choices.into_iter().next().ok_or_else(|| {
            AppError::MalformedResponse("OpenAI response contained no choices".to_string())
        })?;

        let usage = response
            .usage
            .map(|u| LlmUsage::new(u.prompt_tokens, u.completion_tokens))
            .unwrap_or_default();

        Ok(LlmResponse {
            content: choice.message.content.unwrap_or_default(),
            model: response.model,
            usage,
        })
    }
}

#[async_trait::async_trait]
impl LlmClient for OpenAiClient {
    fn provider_name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::debug!(
            model = %request.model,
            messages = request.messages.len(),
            "Sending chat request to OpenAI"
        );

        let body = self.build_request(request);

        let response = self
            .client
            .post(self.chat_completions_url())
            .header("Authorization", &self.auth_header)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to send request to OpenAI: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Llm(format!(
                "OpenAI API error ({}): {}",
                status, error_text
            )));
        }

        let parsed: OpenAiChatResponse = response.json().await.map_err(|e| {
            AppError::MalformedResponse(format!("Failed to parse OpenAI response: {}", e))
        })?;

        self.parse_response(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ChatMessage;

    #[test]
    fn test_build_request_prepends_system() {
        let client = OpenAiClient::new("sk-test");
        let request = LlmRequest::new("gpt-4o-mini")
            .with_system("sys")
            .with_message(ChatMessage::user("q"))
            .with_temperature(0.0);

        let body = serde_json::to_value(client.build_request(&request)).unwrap();
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "q");
        assert_eq!(body["temperature"], 0.0);
        assert!(body.get("max_tokens").is_none());
    }

    #[test]
    fn test_parse_response() {
        let client = OpenAiClient::new("sk-test");
        let raw = r#"{
            "id": "chatcmpl-1",
            "model": "gpt-4o-mini",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "VALID"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 1, "total_tokens": 13}
        }"#;
        let parsed: OpenAiChatResponse = serde_json::from_str(raw).unwrap();
        let response = client.parse_response(parsed).unwrap();
        assert_eq!(response.content, "VALID");
        assert_eq!(response.usage.total_tokens, 13);
    }

    #[test]
    fn test_parse_response_without_choices() {
        let client = OpenAiClient::new("sk-test");
        let parsed = OpenAiChatResponse {
            model: "gpt-4o-mini".to_string(),
            choices: vec![],
            usage: None,
        };
        assert!(matches!(
            client.parse_response(parsed),
            Err(AppError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_base_url_trimming() {
        let client = OpenAiClient::with_base_url("k", "http://localhost:8000/");
        assert_eq!(
            client.chat_completions_url(),
            "http://localhost:8000/v1/chat/completions"
        );
    }
}
