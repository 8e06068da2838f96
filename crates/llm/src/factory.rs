//! Completion client factory.
//!
//! Resolves a provider name to a client and wraps it with the backend
//! deadline, so callers never hold an unbounded client.

use crate::client::LlmClient;
use crate::providers::{OllamaClient, OpenAiClient, ScriptedClient};
use crate::timeout::TimeoutClient;
use crate::types::{ProviderType, DEFAULT_OLLAMA_URL, DEFAULT_OPENAI_URL};
use std::sync::Arc;
use std::time::Duration;
use verirag_core::{AppError, AppResult};

/// Create a completion client based on the provider name.
///
/// # Arguments
/// * `provider` - Provider identifier ("ollama", "openai", "scripted")
/// * `endpoint` - Optional custom endpoint URL
/// * `api_key` - API key, required by OpenAI
/// * `timeout` - Deadline applied to every call
///
/// # Errors
/// Returns `AppError::Config` if the provider is unknown or a required
/// secret is missing.
pub fn create_client(
    provider: &str,
    endpoint: Option<&str>,
    api_key: Option<&str>,
    timeout: Duration,
) -> AppResult<Arc<dyn LlmClient>> {
    let provider_type = ProviderType::parse(provider)
        .ok_or_else(|| AppError::Config(format!("Unknown provider: {}", provider)))?;

    let client: Arc<dyn LlmClient> = match provider_type {
        ProviderType::Ollama => Arc::new(OllamaClient::with_base_url(
            endpoint.unwrap_or(DEFAULT_OLLAMA_URL),
        )),
        ProviderType::OpenAI => {
            let key = api_key.ok_or_else(|| {
                AppError::Config("OpenAI provider requires API key".to_string())
            })?;
            Arc::new(OpenAiClient::with_base_url(
                key,
                endpoint.unwrap_or(DEFAULT_OPENAI_URL),
            ))
        }
        ProviderType::Scripted => Arc::new(ScriptedClient::echo()),
    };

    tracing::debug!(provider = provider_type.as_str(), ?timeout, "Created completion client");
    Ok(Arc::new(TimeoutClient::new(client, timeout)))
}
