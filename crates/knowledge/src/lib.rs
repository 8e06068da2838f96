//! Knowledge layer: embeddings, vector index, document store and ingestion.
//!
//! Provides local-first retrieval using SQLite and pluggable embeddings.

pub mod embeddings;
pub mod ingest;
pub mod sqlite_index;
pub mod store;
pub mod vector_index;

#[cfg(test)]
mod tests;

pub use embeddings::{create_provider, EmbeddingConfig, EmbeddingProvider};
pub use ingest::{ingest_paths, IngestOptions, IngestStats};
pub use sqlite_index::SqliteIndex;
pub use store::DocumentStore;
pub use vector_index::{IndexRecord, Metadata, ScoredChunk, VectorIndex};

use std::sync::Arc;
use verirag_core::{AppConfig, AppResult};

/// Open the workspace document store described by `config`.
pub fn open_store(config: &AppConfig) -> AppResult<DocumentStore> {
    config.ensure_verirag_dir()?;

    let embedding_config = EmbeddingConfig::from_app_config(config);
    let api_key = config.resolve_api_key(&config.embedding_provider);
    let embedder = create_provider(&embedding_config, api_key.as_deref())?;
    let index = SqliteIndex::open(&config.index_path(), config.rag.collection.clone())?;

    tracing::debug!(
        collection = %config.rag.collection,
        provider = embedder.provider_name(),
        "Opened document store"
    );

    Ok(DocumentStore::new(
        embedder,
        Arc::new(index),
        config.backend_timeout(),
    ))
}
