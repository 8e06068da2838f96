//! Prompt loader.
//!
//! A workspace may override any prompt with `.verirag/prompts/<id>.yml`;
//! otherwise the built-in definition is used.

use crate::catalog;
use crate::types::PromptDefinition;
use std::path::{Path, PathBuf};
use verirag_core::{AppError, AppResult};

fn prompts_dir(workspace_path: &Path) -> PathBuf {
    workspace_path.join(".verirag/prompts")
}

/// Load a prompt definition by ID.
///
/// # Example
/// ```no_run
/// use verirag_prompt::load_prompt;
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let prompt = load_prompt(Path::new("."), "rag.validator")?;
/// println!("Loaded prompt: {}", prompt.title);
/// # Ok(())
/// # }
/// ```
pub fn load_prompt(workspace_path: &Path, prompt_id: &str) -> AppResult<PromptDefinition> {
    let prompt_file = prompts_dir(workspace_path).join(format!("{}.yml", prompt_id));

    let definition = if prompt_file.exists() {
        tracing::debug!("Loading prompt override from: {:?}", prompt_file);
        let contents = std::fs::read_to_string(&prompt_file).map_err(|e| {
            AppError::Prompt(format!(
                "Failed to read prompt file {:?}: {}",
                prompt_file, e
            ))
        })?;
        parse_prompt(&contents, &prompt_file.display().to_string())?
    } else {
        load_builtin(prompt_id)?
    };

    if definition.id != prompt_id {
        return Err(AppError::Prompt(format!(
            "Prompt file for '{}' declares id '{}'",
            prompt_id, definition.id
        )));
    }

    tracing::debug!("Loaded prompt: {} ({})", definition.id, definition.title);
    Ok(definition)
}

/// Load a built-in prompt definition, ignoring workspace overrides.
pub fn load_builtin(prompt_id: &str) -> AppResult<PromptDefinition> {
    let source = catalog::builtin_source(prompt_id)
        .ok_or_else(|| AppError::Prompt(format!("Unknown prompt: {}", prompt_id)))?;
    parse_prompt(source, prompt_id)
}

/// List available prompt IDs: built-ins plus workspace overrides.
pub fn list_prompts(workspace_path: &Path) -> AppResult<Vec<String>> {
    let mut prompt_ids: Vec<String> = catalog::builtin_ids().map(str::to_string).collect();

    let dir = prompts_dir(workspace_path);
    if dir.exists() {
        for entry in walkdir::WalkDir::new(&dir)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("yml") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    prompt_ids.push(stem.to_string());
                }
            }
        }
    }

    prompt_ids.sort();
    prompt_ids.dedup();
    Ok(prompt_ids)
}

fn parse_prompt(contents: &str, origin: &str) -> AppResult<PromptDefinition> {
    let definition: PromptDefinition = serde_yaml::from_str(contents).map_err(|e| {
        AppError::Prompt(format!("Failed to parse prompt YAML {}: {}", origin, e))
    })?;
    validate_prompt(&definition)?;
    Ok(definition)
}

fn validate_prompt(def: &PromptDefinition) -> AppResult<()> {
    if def.id.is_empty() {
        return Err(AppError::Prompt("Prompt ID cannot be empty".to_string()));
    }

    if def.title.is_empty() {
        return Err(AppError::Prompt("Prompt title cannot be empty".to_string()));
    }

    if def.template.is_empty() {
        return Err(AppError::Prompt(
            "Prompt template cannot be empty".to_string(),
        ));
    }

    if !def.api_version.contains('.') {
        return Err(AppError::Prompt(format!(
            "Invalid apiVersion format: {}. Expected format: 'x.y'",
            def.api_version
        )));
    }

    if !(0.0..=2.0).contains(&def.behavior.temperature) {
        return Err(AppError::Prompt(format!(
            "Temperature {} out of range for prompt {}",
            def.behavior.temperature, def.id
        )));
    }

    Ok(())
}
