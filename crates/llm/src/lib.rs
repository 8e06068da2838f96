//! Completion capability port for verirag.
//!
//! This crate provides a provider-agnostic abstraction for chat completions.
//! The workflow only ever sees the [`LlmClient`] trait.
//!
//! # Providers
//! - **Ollama**: Local LLM runtime (default)
//! - **OpenAI**: Chat Completions API (and compatible servers)
//! - **Scripted**: Deterministic in-process replies for tests and dry runs
//!
//! # Example
//! ```no_run
//! use verirag_llm::{ChatMessage, LlmClient, LlmRequest, providers::OllamaClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OllamaClient::new();
//! let request = LlmRequest::new("llama3.2")
//!     .with_system("Answer briefly.")
//!     .with_message(ChatMessage::user("Hello, world!"));
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod timeout;
pub mod types;

// Re-export main types
pub use client::{ChatMessage, ChatRole, LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::create_client;
pub use providers::{OllamaClient, OpenAiClient, ScriptedClient, ScriptedReply};
pub use timeout::TimeoutClient;
pub use types::ProviderType;
