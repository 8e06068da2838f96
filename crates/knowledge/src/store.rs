//! Document store: embedding provider plus vector index.

use crate::embeddings::EmbeddingProvider;
use crate::vector_index::{IndexRecord, Metadata, ScoredChunk, VectorIndex};
use sha2::{Digest, Sha256};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use verirag_core::{AppError, AppResult};

/// Embeds and stores passages, and answers similarity searches.
///
/// Every embedding and index call is bounded by the store's deadline.
#[derive(Clone)]
pub struct DocumentStore {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    timeout: Duration,
}

impl DocumentStore {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        timeout: Duration,
    ) -> Self {
        Self {
            embedder,
            index,
            timeout,
        }
    }

    pub fn embedder(&self) -> &dyn EmbeddingProvider {
        self.embedder.as_ref()
    }

    async fn bounded<T>(
        &self,
        what: &str,
        call: impl Future<Output = AppResult<T>>,
    ) -> AppResult<T> {
        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| AppError::Timeout(format!("{} exceeded {:?}", what, self.timeout)))?
    }

    /// Embed and upsert passages. `metadatas`, when given, must pair with
    /// `texts`; otherwise each passage gets `{chunk_id: i}`.
    pub async fn add_documents(
        &self,
        texts: Vec<String>,
        metadatas: Option<Vec<Metadata>>,
    ) -> AppResult<usize> {
        let metadatas = match metadatas {
            Some(m) if m.len() != texts.len() => {
                return Err(AppError::Other(format!(
                    "add_documents got {} texts but {} metadata entries",
                    texts.len(),
                    m.len()
                )))
            }
            Some(m) => m,
            None => (0..texts.len())
                .map(|i| {
                    let mut metadata = Metadata::new();
                    metadata.insert("chunk_id".to_string(), serde_json::json!(i));
                    metadata
                })
                .collect(),
        };

        if texts.is_empty() {
            return Ok(0);
        }

        tracing::info!(
            documents = texts.len(),
            provider = self.embedder.provider_name(),
            "Adding documents to vector store"
        );

        let embeddings = self
            .bounded("embedding", self.embedder.embed_batch(&texts))
            .await?;
        if embeddings.len() != texts.len() {
            return Err(AppError::MalformedResponse(format!(
                "embedder returned {} vectors for {} texts",
                embeddings.len(),
                texts.len()
            )));
        }

        let records: Vec<IndexRecord> = texts
            .into_iter()
            .zip(metadatas)
            .zip(embeddings)
            .map(|((text, metadata), embedding)| IndexRecord {
                id: record_id(&text),
                text,
                metadata,
                embedding,
            })
            .collect();
        let added = records.len();

        self.bounded("index upsert", self.index.upsert(records))
            .await?;
        Ok(added)
    }

    /// Embed `query` and return the `top_k` most similar passages.
    pub async fn similarity_search(&self, query: &str, top_k: usize) -> AppResult<Vec<ScoredChunk>> {
        let vector = self
            .bounded("query embedding", self.embedder.embed(query))
            .await?;
        let results = self
            .bounded("index query", self.index.query(&vector, top_k))
            .await?;
        tracing::debug!(top_k, found = results.len(), "Similarity search");
        Ok(results)
    }

    pub async fn reset(&self) -> AppResult<()> {
        tracing::warn!("Resetting document store");
        self.bounded("index reset", self.index.reset()).await
    }

    pub async fn count(&self) -> AppResult<usize> {
        self.bounded("index count", self.index.count()).await
    }
}

/// Content-addressed record id, so the same passage is stored once.
pub fn record_id(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}
