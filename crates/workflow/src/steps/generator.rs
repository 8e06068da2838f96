//! Grounded answer generation.

use crate::context::build_context;
use crate::ports::{vars, Ports};
use crate::state::{DegradationKind, StepName, WorkflowState};

/// Answer given when retrieval produced no usable evidence.
pub const INSUFFICIENT_INFORMATION_ANSWER: &str =
    "I don't have enough information to answer this question.";

const STEP: StepName = StepName::Generator;

pub async fn generate(ports: &Ports, state: &mut WorkflowState) {
    state.generator_invocations += 1;

    if state.retrieved_chunks.is_empty() {
        state.degrade(
            STEP,
            DegradationKind::InsufficientEvidence,
            "no passages survived retrieval",
        );
        state.generated_answer = INSUFFICIENT_INFORMATION_ANSWER.to_string();
        return;
    }

    let context = build_context(&state.retrieved_chunks, ports.config.max_context_chars);
    // Feedback only exists once a previous attempt was rejected.
    let feedback = if state.retry_count > 0 {
        state.validation_reason.as_str()
    } else {
        ""
    };

    let reply = ports
        .complete(
            &ports.prompts.generator,
            vars([
                ("context", context.as_str()),
                ("question", state.question.as_str()),
                ("feedback", feedback),
            ]),
            &[],
        )
        .await;

    state.generated_answer = match reply {
        Ok(answer) => answer,
        Err(e) => {
            let kind = if e.is_backend_unavailable() {
                DegradationKind::BackendUnavailable
            } else {
                DegradationKind::MalformedBackendResponse
            };
            state.degrade(STEP, kind, e.to_string());
            format!("Error generating answer: {}", e)
        }
    };

    tracing::info!(
        attempt = state.generator_invocations,
        answer_chars = state.generated_answer.chars().count(),
        "Generated answer"
    );
}
