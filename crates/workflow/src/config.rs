//! Workflow tuning knobs.

use verirag_core::AppConfig;

#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowConfig {
    /// Model passed to every completion call
    pub completion_model: String,
    /// Passages requested from the index
    pub top_k: usize,
    /// Retrieved passages shorter than this (after trimming) are discarded
    pub min_chunk_chars: usize,
    /// Character limit of the context block sent to the backend
    pub max_context_chars: usize,
    /// Default retry budget when a request does not set one
    pub max_retries: u32,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            completion_model: "llama3.2".to_string(),
            top_k: 5,
            min_chunk_chars: 50,
            max_context_chars: 12_000,
            max_retries: 2,
        }
    }
}

impl WorkflowConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            completion_model: config.model.clone(),
            top_k: config.rag.top_k,
            min_chunk_chars: config.rag.min_chunk_chars,
            max_context_chars: config.rag.max_context_chars,
            max_retries: config.rag.max_retries,
        }
    }
}
