//! Built-in prompt definitions shipped with the binary.

/// Classifies intent and rewrites the question into a standalone query.
pub const ORCHESTRATOR: &str = "rag.orchestrator";
/// Answers from retrieved context.
pub const GENERATOR: &str = "rag.generator";
/// Judges whether an answer is supported by context.
pub const VALIDATOR: &str = "rag.validator";
/// Replies to conversational turns.
pub const CONVERSATIONAL: &str = "rag.conversational";

const BUILTINS: [(&str, &str); 4] = [
    (ORCHESTRATOR, include_str!("../prompts/rag.orchestrator.yml")),
    (GENERATOR, include_str!("../prompts/rag.generator.yml")),
    (VALIDATOR, include_str!("../prompts/rag.validator.yml")),
    (CONVERSATIONAL, include_str!("../prompts/rag.conversational.yml")),
];

/// Raw YAML of a built-in prompt.
pub fn builtin_source(id: &str) -> Option<&'static str> {
    BUILTINS
        .iter()
        .find(|(builtin_id, _)| *builtin_id == id)
        .map(|(_, source)| *source)
}

/// Identifiers of all built-in prompts.
pub fn builtin_ids() -> impl Iterator<Item = &'static str> {
    BUILTINS.iter().map(|(id, _)| *id)
}
