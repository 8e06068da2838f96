//! Backend ports shared by every step of a run.

use crate::config::WorkflowConfig;
use crate::state::{ChatTurn, TurnRole};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use verirag_core::{AppError, AppResult};
use verirag_knowledge::DocumentStore;
use verirag_llm::{ChatMessage, LlmClient, LlmRequest};
use verirag_prompt::{build_prompt, catalog, load_builtin, load_prompt, PromptDefinition};

/// The four prompts a run needs.
#[derive(Debug, Clone)]
pub struct PromptSet {
    pub orchestrator: PromptDefinition,
    pub generator: PromptDefinition,
    pub validator: PromptDefinition,
    pub conversational: PromptDefinition,
}

impl PromptSet {
    /// Load prompts, preferring overrides under `<workspace>/.verirag/prompts`.
    pub fn load(workspace: &Path) -> AppResult<Self> {
        Ok(Self {
            orchestrator: load_prompt(workspace, catalog::ORCHESTRATOR)?,
            generator: load_prompt(workspace, catalog::GENERATOR)?,
            validator: load_prompt(workspace, catalog::VALIDATOR)?,
            conversational: load_prompt(workspace, catalog::CONVERSATIONAL)?,
        })
    }

    /// The prompts compiled into the binary.
    pub fn builtin() -> AppResult<Self> {
        Ok(Self {
            orchestrator: load_builtin(catalog::ORCHESTRATOR)?,
            generator: load_builtin(catalog::GENERATOR)?,
            validator: load_builtin(catalog::VALIDATOR)?,
            conversational: load_builtin(catalog::CONVERSATIONAL)?,
        })
    }
}

/// Read-only handles the steps use. Shared across runs.
pub struct Ports {
    pub llm: Arc<dyn LlmClient>,
    pub store: DocumentStore,
    pub prompts: PromptSet,
    pub config: WorkflowConfig,
}

impl Ports {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        store: DocumentStore,
        prompts: PromptSet,
        config: WorkflowConfig,
    ) -> Self {
        Self {
            llm,
            store,
            prompts,
            config,
        }
    }

    /// Render `prompt` and issue one completion call. `history` is sent
    /// ahead of the rendered user message, oldest first.
    pub(crate) async fn complete(
        &self,
        prompt: &PromptDefinition,
        variables: HashMap<String, String>,
        history: &[ChatTurn],
    ) -> AppResult<String> {
        let built = build_prompt(prompt, variables)?;

        let mut request = LlmRequest::new(self.config.completion_model.clone())
            .with_messages(history.iter().map(to_message))
            .with_message(ChatMessage::user(built.user))
            .with_temperature(built.temperature);
        if let Some(system) = built.system {
            request = request.with_system(system);
        }
        if let Some(max_tokens) = built.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }

        let response = self.llm.complete(&request).await?;
        let content = response.content.trim();
        if content.is_empty() {
            return Err(AppError::MalformedResponse(format!(
                "empty completion for prompt {}",
                prompt.id
            )));
        }
        Ok(content.to_string())
    }
}

fn to_message(turn: &ChatTurn) -> ChatMessage {
    match turn.role {
        TurnRole::User => ChatMessage::user(turn.text.clone()),
        TurnRole::Assistant => ChatMessage::assistant(turn.text.clone()),
    }
}

/// Build a variable map from string pairs.
pub(crate) fn vars<const N: usize>(pairs: [(&str, &str); N]) -> HashMap<String, String> {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_prompt_set_loads() {
        let prompts = PromptSet::builtin().unwrap();
        assert_eq!(prompts.orchestrator.id, catalog::ORCHESTRATOR);
        assert_eq!(prompts.validator.behavior.temperature, 0.0);
        assert!(prompts.generator.system.contains("provided context"));
    }

    #[test]
    fn test_workspace_override_wins() {
        let temp = tempfile::TempDir::new().unwrap();
        let dir = temp.path().join(".verirag/prompts");
        std::fs::create_dir_all(&dir).unwrap();
        let yaml = load_builtin_source().replace("Answer:", "Reply:");
        std::fs::write(dir.join("rag.generator.yml"), yaml).unwrap();

        let prompts = PromptSet::load(temp.path()).unwrap();
        assert!(prompts.generator.template.contains("Reply:"));
        assert!(prompts.validator.template.contains("Validation:"));
    }

    fn load_builtin_source() -> String {
        catalog::builtin_source(catalog::GENERATOR).unwrap().to_string()
    }
}
