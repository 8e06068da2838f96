//! Embedding capability port.
//!
//! Turns text into vectors. Ingestion embeds passages in batches; retrieval
//! embeds one query at a time.

pub mod config;
pub mod provider;
pub mod providers;

pub use config::EmbeddingConfig;
pub use provider::{create_provider, EmbeddingProvider};
