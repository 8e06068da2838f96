//! Grounding check of the generated answer.

use crate::context::build_context;
use crate::ports::{vars, Ports};
use crate::state::{DegradationKind, StepName, WorkflowState};

const VALID_TOKEN: &str = "VALID";
const VALID_REASON: &str = "Answer is properly supported by context";
const DEFAULT_INVALID_REASON: &str = "Answer not properly supported by context";

const STEP: StepName = StepName::Validator;

/// Parsed validator reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub valid: bool,
    pub reason: String,
}

/// Interpret a `VALID` / `INVALID: reason` reply. Anything not starting with
/// the valid token is a rejection.
pub fn parse_verdict(reply: &str) -> Verdict {
    let reply = reply.trim();
    if reply.starts_with(VALID_TOKEN) {
        return Verdict {
            valid: true,
            reason: VALID_REASON.to_string(),
        };
    }

    let reason = reply
        .split_once(':')
        .map(|(_, rest)| rest.trim())
        .filter(|rest| !rest.is_empty())
        .unwrap_or(DEFAULT_INVALID_REASON);
    Verdict {
        valid: false,
        reason: reason.to_string(),
    }
}

pub async fn validate(ports: &Ports, state: &mut WorkflowState) {
    let context = build_context(&state.retrieved_chunks, ports.config.max_context_chars);

    let reply = ports
        .complete(
            &ports.prompts.validator,
            vars([
                ("context", context.as_str()),
                ("question", state.question.as_str()),
                ("answer", state.generated_answer.as_str()),
            ]),
            &[],
        )
        .await;

    let verdict = match reply {
        Ok(text) => parse_verdict(&text),
        Err(e) => {
            let kind = if e.is_backend_unavailable() {
                DegradationKind::BackendUnavailable
            } else {
                DegradationKind::MalformedBackendResponse
            };
            state.degrade(STEP, kind, e.to_string());
            Verdict {
                valid: false,
                reason: format!("Validation error: {}", e),
            }
        }
    };

    state.validation_result = verdict.valid;
    state.validation_reason = verdict.reason;
    if !state.validation_result {
        state.retry_count += 1;
    }

    tracing::info!(
        valid = state.validation_result,
        retry_count = state.retry_count,
        reason = %state.validation_reason,
        "Validated answer"
    );
}
