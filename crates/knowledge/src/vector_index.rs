//! Vector index abstraction.
//!
//! An index stores passage text, metadata and embedding, and answers nearest
//! neighbour queries by cosine similarity.

use serde::{Deserialize, Serialize};
use verirag_core::AppResult;

/// Free-form metadata attached to a passage.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// A passage as stored in the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexRecord {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub metadata: Metadata,
    pub embedding: Vec<f32>,
}

/// A passage returned by a similarity query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub text: String,
    #[serde(default)]
    pub metadata: Metadata,
    pub score: f32,
}

/// Trait for vector index backends.
///
/// Queries may run concurrently with each other. Writes are serialized and
/// a query never observes a half-applied write.
#[async_trait::async_trait]
pub trait VectorIndex: Send + Sync {
    /// Top-k passages ordered by descending similarity.
    async fn query(&self, vector: &[f32], top_k: usize) -> AppResult<Vec<ScoredChunk>>;

    /// Insert or replace records by id.
    async fn upsert(&self, records: Vec<IndexRecord>) -> AppResult<()>;

    /// Remove every record.
    async fn reset(&self) -> AppResult<()>;

    /// Number of stored records.
    async fn count(&self) -> AppResult<usize>;
}

/// Cosine similarity; 0.0 for mismatched lengths or zero vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Rank records against a query vector and keep the best `top_k`.
pub fn rank<'a>(
    records: impl IntoIterator<Item = &'a IndexRecord>,
    vector: &[f32],
    top_k: usize,
) -> Vec<ScoredChunk> {
    let mut scored: Vec<(f32, &IndexRecord)> = records
        .into_iter()
        .map(|record| (cosine_similarity(vector, &record.embedding), record))
        .collect();

    // Stable sort keeps insertion order among equal scores
    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(top_k);

    scored
        .into_iter()
        .map(|(score, record)| ScoredChunk {
            text: record.text.clone(),
            metadata: record.metadata.clone(),
            score,
        })
        .collect()
}
