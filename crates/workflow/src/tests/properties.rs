//! Invariants that hold across runs.

use super::support::*;
use crate::steps::{validate, INSUFFICIENT_INFORMATION_ANSWER};
use crate::{
    CancellationToken, DegradationKind, Intent, Phase, Ports, PromptSet, RunRequest, StepName,
    WorkflowConfig, WorkflowState,
};
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use verirag_core::AppError;
use verirag_llm::{LlmClient, ScriptedClient, ScriptedReply, TimeoutClient};

fn always_rejecting() -> ScriptedClient {
    ScriptedClient::new()
        .on_text(ORCHESTRATOR, routing("retrieval", "Summarize the document"))
        .on_text(GENERATOR, "an answer")
        .on_text(VALIDATOR, "INVALID: unsupported")
}

#[tokio::test]
async fn test_generator_calls_bounded_by_budget() {
    for max_retries in 0..4 {
        let client = Arc::new(always_rejecting());
        let workflow = workflow(&client, store_with(&passages()).await);

        let state = workflow
            .run(RunRequest::new("Summarize the document").with_max_retries(max_retries))
            .await;

        assert_eq!(state.generator_invocations, max_retries + 1);
        assert_eq!(client.call_count(GENERATOR) as u32, max_retries + 1);
        assert!(state.retry_count <= max_retries + 1);
        assert!(!state.final_answer.is_empty());
    }
}

#[tokio::test]
async fn test_chunks_and_metadata_stay_paired() {
    let mut corpus = passages();
    corpus.push("short".to_string());
    let client = Arc::new(
        ScriptedClient::new()
            .on_text(ORCHESTRATOR, routing("retrieval", "report"))
            .on_text(GENERATOR, "answer")
            .on_text(VALIDATOR, "VALID"),
    );
    let workflow = workflow(&client, store_with(&corpus).await);

    let mut stream = workflow.stream(RunRequest::new("report"));
    let first = stream.next().await.unwrap();

    assert_eq!(first.step, StepName::Retriever);
    assert_eq!(first.state.retrieved_chunks.len(), 3);
    assert_eq!(
        first.state.retrieved_chunks.len(),
        first.state.retrieved_metadata.len()
    );
}

#[tokio::test]
async fn test_validator_verdict_is_repeatable() {
    let client = Arc::new(
        ScriptedClient::new().on_text(VALIDATOR, "INVALID: the answer cites no passage"),
    );
    let llm: Arc<dyn LlmClient> = client.clone();
    let ports = Ports::new(
        llm,
        store_with(&[]).await,
        PromptSet::builtin().unwrap(),
        WorkflowConfig::default(),
    );

    let mut state = WorkflowState::new("What grew?", vec![], 2);
    state.retrieved_chunks = passages();
    state.generated_answer = "Revenue grew.".to_string();
    let mut again = state.clone();

    validate(&ports, &mut state).await;
    validate(&ports, &mut again).await;

    assert!(!state.validation_result);
    assert_eq!(state.validation_result, again.validation_result);
    assert_eq!(state.validation_reason, again.validation_reason);
    assert_eq!(state.retry_count, again.retry_count);
}

#[tokio::test]
async fn test_conversational_path_skips_generation() {
    let client = Arc::new(
        ScriptedClient::new()
            .on_text(ORCHESTRATOR, routing("conversational", "Thanks!"))
            .on_text(CONVERSATIONAL, "You're welcome."),
    );
    let workflow = workflow(&client, store_with(&passages()).await);

    let steps: Vec<StepName> = workflow
        .stream(RunRequest::new("Thanks!"))
        .map(|event| event.step)
        .collect()
        .await;

    assert_eq!(steps, vec![StepName::Retriever, StepName::FinalResponse]);
}

#[tokio::test]
async fn test_no_evidence_still_validates() {
    let client = Arc::new(
        ScriptedClient::new()
            .on_text(ORCHESTRATOR, routing("retrieval", "anything"))
            .on_text(VALIDATOR, "VALID"),
    );
    let workflow = workflow(&client, store_with(&["tiny".to_string()]).await);

    let state = workflow.run(RunRequest::new("anything")).await;

    assert_eq!(state.intent, Intent::Retrieval);
    assert!(state.retrieved_chunks.is_empty());
    assert_eq!(state.generated_answer, INSUFFICIENT_INFORMATION_ANSWER);
    assert_eq!(client.call_count(GENERATOR), 0);
    assert_eq!(client.call_count(VALIDATOR), 1);
    let context = client
        .calls()
        .into_iter()
        .find(|c| c.system.as_deref().is_some_and(|s| s.contains(VALIDATOR)))
        .and_then(|c| c.last_user_message().map(str::to_string))
        .unwrap();
    assert!(context.starts_with("Context:"));
}

#[tokio::test]
async fn test_stream_follows_run_order() {
    let script = || {
        ScriptedClient::new()
            .on_text(ORCHESTRATOR, routing("retrieval", "Summarize the document"))
            .on_text(GENERATOR, "draft")
            .on(
                VALIDATOR,
                [
                    ScriptedReply::text("INVALID: too vague"),
                    ScriptedReply::text("VALID"),
                ],
            )
    };

    let run_client = Arc::new(script());
    let ran = workflow(&run_client, store_with(&passages()).await)
        .run(RunRequest::new("Summarize the document"))
        .await;

    let stream_client = Arc::new(script());
    let events: Vec<_> = workflow(&stream_client, store_with(&passages()).await)
        .stream(RunRequest::new("Summarize the document"))
        .collect()
        .await;

    let steps: Vec<StepName> = events.iter().map(|e| e.step).collect();
    assert_eq!(
        steps,
        vec![
            StepName::Retriever,
            StepName::Generator,
            StepName::Validator,
            StepName::Generator,
            StepName::Validator,
            StepName::FinalResponse,
        ]
    );
    let last = &events.last().unwrap().state;
    assert_eq!(last.final_answer, ran.final_answer);
    assert_eq!(last.retry_count, ran.retry_count);
    assert_eq!(last.confidence, ran.confidence);
    assert_eq!(run_client.calls().len(), stream_client.calls().len());
}

#[tokio::test]
async fn test_runner_walks_phases_in_order() {
    let client = Arc::new(
        ScriptedClient::new()
            .on_text(ORCHESTRATOR, routing("retrieval", "Summarize the document"))
            .on_text(GENERATOR, "draft")
            .on(
                VALIDATOR,
                [
                    ScriptedReply::text("INVALID: too vague"),
                    ScriptedReply::text("VALID"),
                ],
            ),
    );
    let workflow = workflow(&client, store_with(&passages()).await);
    let mut runner = workflow.runner(RunRequest::new("Summarize the document"));

    let mut phases = vec![runner.phase()];
    while runner.advance().await.unwrap().is_some() {
        phases.push(runner.phase());
    }

    assert_eq!(
        phases,
        vec![
            Phase::Retrieving,
            Phase::Generating,
            Phase::Validating,
            Phase::Generating,
            Phase::Validating,
            Phase::Finalizing,
            Phase::Done,
        ]
    );
    assert!(runner.advance().await.unwrap().is_none());
    assert_eq!(runner.phase(), Phase::Done);
    assert!(runner.into_state().validation_result);
}

#[tokio::test]
async fn test_cancelled_before_start() {
    let client = Arc::new(always_rejecting());
    let workflow = workflow(&client, store_with(&passages()).await);
    let token = CancellationToken::new();
    token.cancel();

    let result = workflow
        .run_cancellable(RunRequest::new("q").with_cancel(token.clone()))
        .await;
    assert!(matches!(result, Err(AppError::Cancelled)));

    let events: Vec<_> = workflow
        .stream(RunRequest::new("q").with_cancel(token))
        .collect()
        .await;
    assert!(events.is_empty());
    assert!(client.calls().is_empty());
}

#[tokio::test]
async fn test_cancel_mid_stream_stops_events() {
    let client = Arc::new(always_rejecting());
    let workflow = workflow(&client, store_with(&passages()).await);
    let token = CancellationToken::new();

    let mut stream = workflow.stream(RunRequest::new("q").with_cancel(token.clone()));
    let first = stream.next().await.unwrap();
    assert_eq!(first.step, StepName::Retriever);

    token.cancel();
    assert!(stream.next().await.is_none());
    assert_eq!(client.call_count(GENERATOR), 0);
}

#[tokio::test]
async fn test_slow_backend_times_out_and_degrades() {
    let scripted = ScriptedClient::new()
        .on_text(ORCHESTRATOR, routing("retrieval", "Summarize the document"))
        .on(
            GENERATOR,
            [ScriptedReply::Delayed(
                Duration::from_millis(500),
                "too late".to_string(),
            )],
        )
        .on_text(VALIDATOR, "INVALID: no answer");
    let llm: Arc<dyn LlmClient> = Arc::new(TimeoutClient::new(
        Arc::new(scripted),
        Duration::from_millis(20),
    ));
    let workflow = workflow_with(llm, store_with(&passages()).await);

    let state = workflow
        .run(RunRequest::new("Summarize the document").with_max_retries(0))
        .await;

    assert!(state.generated_answer.starts_with("Error generating answer:"));
    assert!(state.has_degradation(DegradationKind::BackendUnavailable));
    assert!(!state.final_answer.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_runs_are_independent() {
    let client = Arc::new(
        ScriptedClient::new()
            .on_text(ORCHESTRATOR, routing("retrieval", "Summarize the document"))
            .on_text(GENERATOR, "Revenue grew.")
            .on_text(VALIDATOR, "VALID"),
    );
    let workflow = workflow(&client, store_with(&passages()).await);

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let workflow = workflow.clone();
            tokio::spawn(async move {
                workflow
                    .run(RunRequest::new(format!("Summarize the document {}", i)))
                    .await
            })
        })
        .collect();

    let mut run_ids = Vec::new();
    for handle in handles {
        let state = handle.await.unwrap();
        assert_eq!(state.retry_count, 0);
        assert!(state.validation_result);
        run_ids.push(state.run_id);
    }
    run_ids.sort();
    run_ids.dedup();
    assert_eq!(run_ids.len(), 8);
}
