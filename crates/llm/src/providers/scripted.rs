//! Deterministic in-process completion client.
//!
//! Replies are queued per marker: a request is routed to the first rule whose
//! marker appears in its system prompt. The last queued reply of a rule is
//! repeated once the queue drains.

use crate::client::{LlmClient, LlmRequest, LlmResponse};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use verirag_core::{AppError, AppResult};

/// One scripted outcome.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptedReply {
    Text(String),
    /// Fails the call with `AppError::Llm`
    Error(String),
    /// Sleeps before answering, for timeout tests
    Delayed(Duration, String),
}

impl ScriptedReply {
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text(content.into())
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(message.into())
    }
}

#[derive(Debug)]
struct Rule {
    marker: String,
    replies: VecDeque<ScriptedReply>,
}

#[derive(Debug, Default)]
struct ScriptState {
    rules: Vec<Rule>,
    calls: Vec<LlmRequest>,
}

/// Scripted completion client.
#[derive(Debug, Default)]
pub struct ScriptedClient {
    state: Mutex<ScriptState>,
    fallback: Option<ScriptedReply>,
    echo: bool,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Client that answers every request with its last user message.
    pub fn echo() -> Self {
        Self {
            echo: true,
            ..Self::default()
        }
    }

    /// Route requests whose system prompt contains `marker` to `replies`.
    pub fn on(
        mut self,
        marker: impl Into<String>,
        replies: impl IntoIterator<Item = ScriptedReply>,
    ) -> Self {
        if let Ok(state) = self.state.get_mut() {
            state.rules.push(Rule {
                marker: marker.into(),
                replies: replies.into_iter().collect(),
            });
        }
        self
    }

    /// Shorthand for a rule with a single text reply.
    pub fn on_text(self, marker: impl Into<String>, reply: impl Into<String>) -> Self {
        self.on(marker, [ScriptedReply::text(reply)])
    }

    /// Reply used when no rule matches.
    pub fn with_fallback(mut self, reply: ScriptedReply) -> Self {
        self.fallback = Some(reply);
        self
    }

    /// All recorded requests, oldest first.
    pub fn calls(&self) -> Vec<LlmRequest> {
        self.state
            .lock()
            .map(|state| state.calls.clone())
            .unwrap_or_default()
    }

    /// Number of recorded requests whose system prompt contains `marker`.
    pub fn call_count(&self, marker: &str) -> usize {
        self.calls()
            .iter()
            .filter(|request| {
                request
                    .system
                    .as_deref()
                    .is_some_and(|system| system.contains(marker))
            })
            .count()
    }

    fn next_reply(&self, request: &LlmRequest) -> AppResult<Option<ScriptedReply>> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| AppError::Other("scripted client state poisoned".to_string()))?;
        state.calls.push(request.clone());

        let system = request.system.as_deref().unwrap_or_default();
        let rule = state
            .rules
            .iter_mut()
            .find(|rule| system.contains(rule.marker.as_str()));

        let reply = match rule {
            Some(rule) if rule.replies.len() > 1 => rule.replies.pop_front(),
            Some(rule) => rule.replies.front().cloned(),
            None => self.fallback.clone(),
        };
        Ok(reply)
    }
}

#[async_trait::async_trait]
impl LlmClient for ScriptedClient {
    fn provider_name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        let reply = match self.next_reply(request)? {
            Some(reply) => reply,
            None if self.echo => {
                ScriptedReply::text(request.last_user_message().unwrap_or_default())
            }
            None => {
                return Err(AppError::Llm(
                    "scripted client has no reply for this request".to_string(),
                ))
            }
        };

        match reply {
            ScriptedReply::Text(content) => Ok(LlmResponse::new(content, &request.model)),
            ScriptedReply::Error(message) => Err(AppError::Llm(message)),
            ScriptedReply::Delayed(delay, content) => {
                tokio::time::sleep(delay).await;
                Ok(LlmResponse::new(content, &request.model))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ChatMessage;

    fn request(system: &str) -> LlmRequest {
        LlmRequest::new("test-model")
            .with_system(system)
            .with_message(ChatMessage::user("question"))
    }

    #[tokio::test]
    async fn test_routes_by_marker_and_repeats_last() {
        let client = ScriptedClient::new().on(
            "validator",
            [ScriptedReply::text("INVALID: nope"), ScriptedReply::text("VALID")],
        );

        let first = client.complete(&request("you are a validator")).await.unwrap();
        let second = client.complete(&request("you are a validator")).await.unwrap();
        let third = client.complete(&request("you are a validator")).await.unwrap();

        assert_eq!(first.content, "INVALID: nope");
        assert_eq!(second.content, "VALID");
        assert_eq!(third.content, "VALID");
        assert_eq!(client.call_count("validator"), 3);
    }

    #[tokio::test]
    async fn test_error_reply() {
        let client = ScriptedClient::new().on("gen", [ScriptedReply::error("boom")]);
        let err = client.complete(&request("gen")).await.unwrap_err();
        assert!(matches!(err, AppError::Llm(ref m) if m == "boom"));
    }

    #[tokio::test]
    async fn test_unmatched_without_fallback_fails() {
        let client = ScriptedClient::new();
        assert!(client.complete(&request("anything")).await.is_err());
        assert_eq!(client.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_echo() {
        let client = ScriptedClient::echo();
        let response = client.complete(&request("sys")).await.unwrap();
        assert_eq!(response.content, "question");
    }
}
