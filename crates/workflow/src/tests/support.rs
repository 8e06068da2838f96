//! Fixtures shared by the workflow tests.

use crate::{PromptSet, Workflow, WorkflowConfig};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use verirag_core::{AppError, AppResult};
use verirag_knowledge::embeddings::providers::MockProvider;
use verirag_knowledge::{DocumentStore, IndexRecord, Metadata, ScoredChunk, SqliteIndex, VectorIndex};
use verirag_llm::{LlmClient, ScriptedClient};

// System prompt fragments that identify each step's completion call.
pub const ORCHESTRATOR: &str = "Orchestrator";
pub const GENERATOR: &str = "answers questions based on the provided context";
pub const VALIDATOR: &str = "strict validator";
pub const CONVERSATIONAL: &str = "CONVERSATIONAL MODE";

pub fn routing(intent: &str, query: &str) -> String {
    json!({ "intent": intent, "processed_query": query }).to_string()
}

/// Three passages of roughly 200 characters about the same document.
pub fn passages() -> Vec<String> {
    [
        "The quarterly report describes revenue growth across the northern region, driven by new \
         subscription plans and a steady reduction in customer churn over the preceding twelve months.",
        "Operating costs in the report rose modestly because the company opened two additional \
         warehouses and hired support engineers to shorten response times for enterprise customers.",
        "The report closes with an outlook section forecasting continued growth, while warning that \
         currency fluctuations and supply delays could weigh on margins during the next fiscal year.",
    ]
    .iter()
    .map(|p| p.to_string())
    .collect()
}

pub async fn store_with(passages: &[String]) -> DocumentStore {
    let index = SqliteIndex::in_memory("test").unwrap();
    let store = DocumentStore::new(
        Arc::new(MockProvider::new(64)),
        Arc::new(index),
        Duration::from_secs(5),
    );
    let metadatas = (0..passages.len())
        .map(|i| {
            let mut metadata = Metadata::new();
            metadata.insert("chunk_id".to_string(), json!(i));
            metadata.insert("source".to_string(), json!("report.md"));
            metadata
        })
        .collect();
    store
        .add_documents(passages.to_vec(), Some(metadatas))
        .await
        .unwrap();
    store
}

/// Index that fails every call.
#[derive(Debug)]
pub struct FailingIndex;

#[async_trait::async_trait]
impl VectorIndex for FailingIndex {
    async fn query(&self, _vector: &[f32], _top_k: usize) -> AppResult<Vec<ScoredChunk>> {
        Err(AppError::Index("index offline".to_string()))
    }

    async fn upsert(&self, _records: Vec<IndexRecord>) -> AppResult<()> {
        Err(AppError::Index("index offline".to_string()))
    }

    async fn reset(&self) -> AppResult<()> {
        Err(AppError::Index("index offline".to_string()))
    }

    async fn count(&self) -> AppResult<usize> {
        Err(AppError::Index("index offline".to_string()))
    }
}

pub fn failing_store() -> DocumentStore {
    DocumentStore::new(
        Arc::new(MockProvider::new(64)),
        Arc::new(FailingIndex),
        Duration::from_secs(5),
    )
}

pub fn workflow_with(llm: Arc<dyn LlmClient>, store: DocumentStore) -> Workflow {
    Workflow::new(
        llm,
        store,
        PromptSet::builtin().unwrap(),
        WorkflowConfig::default(),
    )
}

pub fn workflow(client: &Arc<ScriptedClient>, store: DocumentStore) -> Workflow {
    let llm: Arc<dyn LlmClient> = client.clone();
    workflow_with(llm, store)
}
