//! Prompt builder: renders system and user templates.

use crate::types::{BuiltPrompt, BuiltPromptMetadata, PromptDefinition};
use handlebars::Handlebars;
use std::collections::HashMap;
use verirag_core::{AppError, AppResult};

/// Render a prompt definition with the given variables.
///
/// Missing variables render as empty strings. Output is not HTML-escaped.
pub fn build_prompt(
    definition: &PromptDefinition,
    variables: HashMap<String, String>,
) -> AppResult<BuiltPrompt> {
    tracing::debug!("Building prompt: {}", definition.id);

    let mut handlebars = Handlebars::new();
    handlebars.register_escape_fn(handlebars::no_escape);

    let system = render(&mut handlebars, "system", &definition.system, &variables)?;
    let user = render(&mut handlebars, "user", &definition.template, &variables)?;

    Ok(BuiltPrompt {
        system: if system.trim().is_empty() {
            None
        } else {
            Some(system.trim_end().to_string())
        },
        user: user.trim_end().to_string(),
        temperature: definition.behavior.temperature,
        max_tokens: definition.behavior.max_tokens,
        metadata: BuiltPromptMetadata {
            source_prompt_id: definition.id.clone(),
            resolved_variables: variables,
        },
    })
}

fn render(
    handlebars: &mut Handlebars<'_>,
    name: &str,
    template: &str,
    variables: &HashMap<String, String>,
) -> AppResult<String> {
    handlebars
        .register_template_string(name, template)
        .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

    handlebars
        .render(name, variables)
        .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PromptBehavior, PromptOutputSpec};

    fn definition(system: &str, template: &str) -> PromptDefinition {
        PromptDefinition {
            id: "test.prompt".to_string(),
            title: "Test".to_string(),
            api_version: "1.0".to_string(),
            created_by: "test".to_string(),
            behavior: PromptBehavior {
                temperature: 0.3,
                max_tokens: None,
            },
            system: system.to_string(),
            template: template.to_string(),
            output: PromptOutputSpec::default(),
        }
    }

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_renders_both_templates() {
        let def = definition("Original: {{q}}", "Question: {{q}}");
        let built = build_prompt(&def, vars(&[("q", "What is Rust?")])).unwrap();

        assert_eq!(built.system.as_deref(), Some("Original: What is Rust?"));
        assert_eq!(built.user, "Question: What is Rust?");
        assert_eq!(built.temperature, 0.3);
        assert_eq!(built.metadata.source_prompt_id, "test.prompt");
    }

    #[test]
    fn test_no_html_escaping() {
        let def = definition("", "{{answer}}");
        let built = build_prompt(&def, vars(&[("answer", "a < b && \"c\"")])).unwrap();
        assert_eq!(built.user, "a < b && \"c\"");
        assert!(built.system.is_none());
    }

    #[test]
    fn test_conditional_section() {
        let def = definition("", "Q{{#if feedback}} F:{{feedback}}{{/if}}");
        let without = build_prompt(&def, vars(&[("feedback", "")])).unwrap();
        let with = build_prompt(&def, vars(&[("feedback", "cite it")])).unwrap();

        assert_eq!(without.user, "Q");
        assert_eq!(with.user, "Q F:cite it");
    }

    #[test]
    fn test_invalid_template() {
        let def = definition("", "{{#if}}");
        assert!(build_prompt(&def, HashMap::new()).is_err());
    }
}
