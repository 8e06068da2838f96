//! Command handlers for the verirag CLI.
//!
//! This module organizes all CLI commands into separate submodules.

pub mod ask;
pub mod chat;
pub mod ingest;
pub mod stats;

// Re-export command types for convenience
pub use ask::AskCommand;
pub use chat::ChatCommand;
pub use ingest::IngestCommand;
pub use stats::StatsCommand;

use verirag_core::{config::AppConfig, AppResult};
use verirag_knowledge::DocumentStore;
use verirag_llm::create_client;
use verirag_workflow::{PromptSet, Workflow, WorkflowConfig};

/// Wire the configured backends into a workflow.
pub fn open_workflow(config: &AppConfig) -> AppResult<(Workflow, DocumentStore)> {
    let endpoint = config.endpoint_for(&config.provider);
    let api_key = config.resolve_api_key(&config.provider);
    let llm = create_client(
        &config.provider,
        endpoint.as_deref(),
        api_key.as_deref(),
        config.backend_timeout(),
    )?;

    let store = verirag_knowledge::open_store(config)?;
    let prompts = PromptSet::load(&config.workspace)?;
    let workflow = Workflow::new(
        llm,
        store.clone(),
        prompts,
        WorkflowConfig::from_app_config(config),
    );

    tracing::debug!(provider = %config.provider, model = %config.model, "Workflow ready");
    Ok((workflow, store))
}
