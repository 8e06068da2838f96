//! Orchestrating retriever: classify intent, rewrite the query, fetch
//! evidence.

use crate::orchestration::{parse_orchestration, Orchestration};
use crate::ports::{vars, Ports};
use crate::state::{DegradationKind, Intent, StepName, WorkflowState};
use verirag_core::AppError;
use verirag_knowledge::ScoredChunk;

const STEP: StepName = StepName::Retriever;

pub async fn retrieve(ports: &Ports, state: &mut WorkflowState) {
    state.original_question = state.question.clone();
    state.retrieved_chunks.clear();
    state.retrieved_metadata.clear();
    state.sources.clear();

    let routing = orchestrate(ports, state).await;
    state.intent = routing.intent;
    state.processed_query = routing.processed_query;

    if state.intent == Intent::Conversational {
        tracing::info!(query = %state.processed_query, "Conversational turn, skipping retrieval");
        return;
    }

    let results = match ports
        .store
        .similarity_search(&state.processed_query, ports.config.top_k)
        .await
    {
        Ok(results) => results,
        Err(e) => {
            state.degrade(STEP, DegradationKind::BackendUnavailable, e.to_string());
            state.intent = Intent::Conversational;
            state.processed_query = state.question.clone();
            return;
        }
    };

    let returned = results.len();
    keep_evidence(state, results, ports.config.min_chunk_chars);

    tracing::info!(
        query = %state.processed_query,
        returned,
        kept = state.retrieved_chunks.len(),
        "Retrieved evidence"
    );
}

/// Ask the backend for intent and a standalone query, falling back to
/// documented defaults.
async fn orchestrate(ports: &Ports, state: &mut WorkflowState) -> Orchestration {
    let reply = ports
        .complete(
            &ports.prompts.orchestrator,
            vars([("question", state.question.as_str())]),
            &state.chat_history,
        )
        .await;

    let parsed = match reply {
        Ok(text) => parse_orchestration(&text).map_err(|e| format!("{}: {}", e, text)),
        Err(AppError::MalformedResponse(detail)) => Err(detail),
        Err(e) => {
            let kind = if e.is_backend_unavailable() {
                DegradationKind::BackendUnavailable
            } else {
                DegradationKind::MalformedBackendResponse
            };
            state.degrade(STEP, kind, e.to_string());
            return Orchestration {
                intent: Intent::Conversational,
                processed_query: state.question.clone(),
            };
        }
    };

    match parsed {
        Ok(mut routing) => {
            if routing.processed_query.trim().is_empty() {
                routing.processed_query = state.question.clone();
            }
            routing
        }
        Err(detail) => {
            state.degrade(STEP, DegradationKind::MalformedBackendResponse, detail);
            Orchestration {
                intent: Intent::Retrieval,
                processed_query: state.question.clone(),
            }
        }
    }
}

/// Keep trimmed passages of at least `min_chars` characters, together with
/// their metadata, and collect distinct sources in rank order.
fn keep_evidence(state: &mut WorkflowState, results: Vec<ScoredChunk>, min_chars: usize) {
    for chunk in results {
        let text = chunk.text.trim();
        if text.chars().count() < min_chars {
            continue;
        }
        if let Some(source) = chunk.metadata.get("source").and_then(|v| v.as_str()) {
            if !state.sources.iter().any(|s| s == source) {
                state.sources.push(source.to_string());
            }
        }
        state.retrieved_chunks.push(text.to_string());
        state.retrieved_metadata.push(chunk.metadata);
    }
}
