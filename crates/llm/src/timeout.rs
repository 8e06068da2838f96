//! Deadline enforcement for completion calls.

use crate::client::{LlmClient, LlmRequest, LlmResponse};
use std::sync::Arc;
use std::time::Duration;
use verirag_core::{AppError, AppResult};

/// Wraps a client so that every call either finishes within `timeout` or
/// fails with [`AppError::Timeout`].
pub struct TimeoutClient {
    inner: Arc<dyn LlmClient>,
    timeout: Duration,
}

impl TimeoutClient {
    pub fn new(inner: Arc<dyn LlmClient>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

#[async_trait::async_trait]
impl LlmClient for TimeoutClient {
    fn provider_name(&self) -> &str {
        self.inner.provider_name()
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        match tokio::time::timeout(self.timeout, self.inner.complete(request)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    provider = self.inner.provider_name(),
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Completion call timed out"
                );
                Err(AppError::Timeout(format!(
                    "{} completion exceeded {:?}",
                    self.inner.provider_name(),
                    self.timeout
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{ScriptedClient, ScriptedReply};

    #[tokio::test]
    async fn test_slow_call_times_out() {
        let inner = ScriptedClient::new().with_fallback(ScriptedReply::Delayed(
            Duration::from_millis(500),
            "late".to_string(),
        ));
        let client = TimeoutClient::new(Arc::new(inner), Duration::from_millis(20));

        let err = client
            .complete(&LlmRequest::new("m").with_system("s"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Timeout(_)));
        assert!(err.is_backend_unavailable());
    }

    #[tokio::test]
    async fn test_fast_call_passes_through() {
        let inner = ScriptedClient::new().with_fallback(ScriptedReply::text("ok"));
        let client = TimeoutClient::new(Arc::new(inner), Duration::from_secs(5));

        let response = client.complete(&LlmRequest::new("m")).await.unwrap();
        assert_eq!(response.content, "ok");
        assert_eq!(client.provider_name(), "scripted");
    }
}
