//! Ask command handler.
//!
//! Runs one question through the workflow and prints the final answer.

use super::open_workflow;
use clap::Args;
use futures::StreamExt;
use verirag_core::{config::AppConfig, AppError, AppResult};
use verirag_workflow::{RunRequest, StepEvent, StepName, Workflow, WorkflowState};

/// Ask one question
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub question: String,

    /// Maximum regeneration attempts after a rejected answer
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Print each workflow step to stderr as it completes
    #[arg(long)]
    pub trace: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");
        tracing::debug!("Ask command options: {:?}", self);

        let request = request_for(&self.question)?;
        let (workflow, _store) = open_workflow(config)?;

        let state = if self.trace {
            run_traced(&workflow, request).await?
        } else {
            workflow.run(request).await
        };

        if self.json {
            println!("{}", serde_json::to_string_pretty(&summary_json(&state))?);
        } else {
            println!("{}", state.final_answer);
            if !state.sources.is_empty() {
                println!("\nSources: {}", state.sources.join(", "));
            }
        }

        Ok(())
    }
}

/// The question is passed on verbatim; only the emptiness check trims it.
fn request_for(question: &str) -> AppResult<RunRequest> {
    if question.trim().is_empty() {
        return Err(AppError::Config("No question provided".to_string()));
    }
    Ok(RunRequest::new(question))
}

async fn run_traced(workflow: &Workflow, request: RunRequest) -> AppResult<WorkflowState> {
    let mut stream = workflow.stream(request);
    let mut last = None;
    while let Some(event) = stream.next().await {
        eprintln!("{}", describe_event(&event));
        last = Some(event.state);
    }
    last.ok_or_else(|| AppError::Other("workflow produced no steps".to_string()))
}

/// One-line description of a completed step.
pub fn describe_event(event: &StepEvent) -> String {
    let state = &event.state;
    let detail = match event.step {
        StepName::Retriever => format!(
            "intent={:?} query={:?} chunks={}",
            state.intent,
            state.processed_query,
            state.retrieved_chunks.len()
        ),
        StepName::Generator => format!(
            "attempt={} answer_chars={}",
            state.generator_invocations,
            state.generated_answer.chars().count()
        ),
        StepName::Validator => format!(
            "valid={} retry_count={} reason={:?}",
            state.validation_result, state.retry_count, state.validation_reason
        ),
        StepName::FinalResponse => format!(
            "confidence={}",
            state.confidence.map(|c| c.as_str()).unwrap_or("-")
        ),
    };
    format!("[{}] {}", event.step, detail)
}

pub fn summary_json(state: &WorkflowState) -> serde_json::Value {
    serde_json::json!({
        "runId": state.run_id,
        "question": state.original_question,
        "answer": state.final_answer,
        "intent": state.intent,
        "processedQuery": state.processed_query,
        "confidence": state.confidence,
        "validated": state.validation_result,
        "validationReason": state.validation_reason,
        "retryCount": state.retry_count,
        "generatorInvocations": state.generator_invocations,
        "sources": state.sources,
        "degradations": state.degradations,
    })
}
