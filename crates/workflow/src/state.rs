//! Per-run workflow state.

use serde::{Deserialize, Serialize};
use std::fmt;
use verirag_knowledge::Metadata;

/// Who authored a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

/// One prior turn of the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: TurnRole,
    pub text: String,
}

impl ChatTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Assistant,
            text: text.into(),
        }
    }
}

/// Routing decision made by the retriever.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    #[default]
    Retrieval,
    Conversational,
}

/// Confidence attached to the final answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Confidence {
    #[serde(rename = "High")]
    High,
    #[serde(rename = "Medium (Corrected)")]
    MediumCorrected,
    #[serde(rename = "Low")]
    Low,
    #[serde(rename = "N/A")]
    NotApplicable,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "High",
            Self::MediumCorrected => "Medium (Corrected)",
            Self::Low => "Low",
            Self::NotApplicable => "N/A",
        }
    }

    /// Confidence of a grounded answer.
    pub fn grounded(validated: bool, retry_count: u32) -> Self {
        if validated {
            Self::High
        } else if retry_count > 0 {
            Self::MediumCorrected
        } else {
            Self::Low
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The four workflow steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepName {
    Retriever,
    Generator,
    Validator,
    FinalResponse,
}

impl StepName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Retriever => "retriever",
            Self::Generator => "generator",
            Self::Validator => "validator",
            Self::FinalResponse => "final_response",
        }
    }
}

impl fmt::Display for StepName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a step fell back to its default behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegradationKind {
    BackendUnavailable,
    MalformedBackendResponse,
    InsufficientEvidence,
    RetryExhausted,
}

/// A recovered failure, kept for audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Degradation {
    pub step: StepName,
    pub kind: DegradationKind,
    pub detail: String,
}

/// Everything a run knows. Created fresh per run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowState {
    pub run_id: String,
    pub question: String,
    pub original_question: String,
    pub processed_query: String,
    pub chat_history: Vec<ChatTurn>,
    pub intent: Intent,
    pub retrieved_chunks: Vec<String>,
    pub retrieved_metadata: Vec<Metadata>,
    pub generated_answer: String,
    pub validation_result: bool,
    pub validation_reason: String,
    pub final_answer: String,
    pub confidence: Option<Confidence>,
    pub retry_count: u32,
    pub max_retries: u32,
    pub sources: Vec<String>,
    pub generator_invocations: u32,
    pub degradations: Vec<Degradation>,
}

impl WorkflowState {
    pub fn new(question: impl Into<String>, chat_history: Vec<ChatTurn>, max_retries: u32) -> Self {
        let question = question.into();
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            original_question: question.clone(),
            question,
            processed_query: String::new(),
            chat_history,
            intent: Intent::Retrieval,
            retrieved_chunks: Vec::new(),
            retrieved_metadata: Vec::new(),
            generated_answer: String::new(),
            validation_result: false,
            validation_reason: String::new(),
            final_answer: String::new(),
            confidence: None,
            retry_count: 0,
            max_retries,
            sources: Vec::new(),
            generator_invocations: 0,
            degradations: Vec::new(),
        }
    }

    pub(crate) fn degrade(&mut self, step: StepName, kind: DegradationKind, detail: impl Into<String>) {
        let detail = detail.into();
        tracing::warn!(step = %step, kind = ?kind, %detail, "Step degraded");
        self.degradations.push(Degradation { step, kind, detail });
    }

    /// Whether any degradation of `kind` was recorded.
    pub fn has_degradation(&self, kind: DegradationKind) -> bool {
        self.degradations.iter().any(|d| d.kind == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_defaults() {
        let state = WorkflowState::new("What is Rust?", vec![], 2);
        assert_eq!(state.original_question, "What is Rust?");
        assert_eq!(state.intent, Intent::Retrieval);
        assert_eq!(state.retry_count, 0);
        assert!(state.confidence.is_none());
        assert!(!state.run_id.is_empty());
    }

    #[test]
    fn test_run_ids_are_unique() {
        let a = WorkflowState::new("q", vec![], 2);
        let b = WorkflowState::new("q", vec![], 2);
        assert_ne!(a.run_id, b.run_id);
    }

    #[test]
    fn test_grounded_confidence() {
        assert_eq!(Confidence::grounded(true, 0), Confidence::High);
        assert_eq!(Confidence::grounded(true, 2), Confidence::High);
        assert_eq!(Confidence::grounded(false, 1), Confidence::MediumCorrected);
        assert_eq!(Confidence::grounded(false, 0), Confidence::Low);
    }

    #[test]
    fn test_confidence_display_strings() {
        assert_eq!(Confidence::MediumCorrected.to_string(), "Medium (Corrected)");
        assert_eq!(
            serde_json::to_value(Confidence::NotApplicable).unwrap(),
            serde_json::json!("N/A")
        );
    }
}
