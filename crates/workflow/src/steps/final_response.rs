//! Final response formatting.
//!
//! A grounded answer is decorated with its confidence without another
//! backend call. Otherwise the turn is answered conversationally.

use crate::ports::{vars, Ports};
use crate::state::{Confidence, DegradationKind, StepName, WorkflowState};

/// Final answer when the conversational reply failed and there is no prior
/// answer to fall back on.
pub const FINAL_RESPONSE_ERROR: &str = "I encountered an error generating the final response.";

const STEP: StepName = StepName::FinalResponse;

pub async fn finalize(ports: &Ports, state: &mut WorkflowState) {
    if state.generated_answer.is_empty() {
        respond_conversationally(ports, state).await;
    } else {
        format_grounded(state);
    }
}

fn format_grounded(state: &mut WorkflowState) {
    let confidence = Confidence::grounded(state.validation_result, state.retry_count);
    if !state.validation_result {
        state.degrade(
            STEP,
            DegradationKind::RetryExhausted,
            format!(
                "answer still unvalidated after {} retries: {}",
                state.retry_count, state.validation_reason
            ),
        );
    }

    state.final_answer = grounded_answer(&state.generated_answer, confidence);
    state.confidence = Some(confidence);
    tracing::info!(confidence = %confidence, "Finalized grounded answer");
}

/// The generated answer followed by its metadata footer.
pub fn grounded_answer(answer: &str, confidence: Confidence) -> String {
    format!(
        "{}\n\n---\n**Metadata**\n- **Confidence Score**: {}",
        answer, confidence
    )
}

async fn respond_conversationally(ports: &Ports, state: &mut WorkflowState) {
    let processed_query = if state.processed_query.is_empty() {
        state.original_question.as_str()
    } else {
        state.processed_query.as_str()
    };

    let reply = ports
        .complete(
            &ports.prompts.conversational,
            vars([
                ("original_question", state.original_question.as_str()),
                ("processed_query", processed_query),
            ]),
            &state.chat_history,
        )
        .await;

    state.final_answer = match reply {
        Ok(text) => text,
        Err(e) => {
            let kind = if e.is_backend_unavailable() {
                DegradationKind::BackendUnavailable
            } else {
                DegradationKind::MalformedBackendResponse
            };
            state.degrade(STEP, kind, e.to_string());
            FINAL_RESPONSE_ERROR.to_string()
        }
    };
    state.confidence = Some(Confidence::NotApplicable);
    tracing::info!("Finalized conversational answer");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grounded_footer() {
        let text = grounded_answer("Rust is a language.", Confidence::MediumCorrected);
        assert_eq!(
            text,
            "Rust is a language.\n\n---\n**Metadata**\n- **Confidence Score**: Medium (Corrected)"
        );
    }

    #[test]
    fn test_format_grounded_records_exhaustion() {
        let mut state = WorkflowState::new("q", vec![], 1);
        state.generated_answer = "an answer".to_string();
        state.retry_count = 2;
        state.validation_reason = "unsupported".to_string();

        format_grounded(&mut state);

        assert_eq!(state.confidence, Some(Confidence::MediumCorrected));
        assert!(state.has_degradation(DegradationKind::RetryExhausted));
        assert!(state.final_answer.starts_with("an answer\n\n---"));
    }

    #[test]
    fn test_format_grounded_validated() {
        let mut state = WorkflowState::new("q", vec![], 2);
        state.generated_answer = "an answer".to_string();
        state.validation_result = true;

        format_grounded(&mut state);

        assert_eq!(state.confidence, Some(Confidence::High));
        assert!(state.degradations.is_empty());
    }
}
