//! Workflow engine: the step graph and its two callers.
//!
//! ```text
//! Retrieving -> Generating -> Validating -> Finalizing -> Done
//!      |           ^______________|  (retry)    ^
//!      |________________________________________|  (conversational)
//! ```
//!
//! [`StepRunner`] is the only place steps are executed. [`Workflow::run`]
//! drains it; [`Workflow::stream`] yields a snapshot after each step.

use crate::cancel::CancellationToken;
use crate::config::WorkflowConfig;
use crate::ports::{Ports, PromptSet};
use crate::state::{ChatTurn, Intent, StepName, WorkflowState};
use crate::steps;
use futures::stream::{self, BoxStream, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use tracing::Instrument;
use verirag_core::{AppError, AppResult};
use verirag_knowledge::DocumentStore;
use verirag_llm::LlmClient;

/// Position of a run in the step graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Retrieving,
    Generating,
    Validating,
    Finalizing,
    Done,
}

impl Phase {
    /// The step executed in this phase.
    pub fn step(&self) -> Option<StepName> {
        match self {
            Self::Retrieving => Some(StepName::Retriever),
            Self::Generating => Some(StepName::Generator),
            Self::Validating => Some(StepName::Validator),
            Self::Finalizing => Some(StepName::FinalResponse),
            Self::Done => None,
        }
    }
}

/// Transition taken after the step of `phase` has updated `state`.
///
/// `retry_count` already includes the verdict just recorded, so a retry is
/// allowed while it does not exceed `max_retries`. Generation is capped at
/// `max_retries + 1` attempts regardless of how the count evolves.
pub fn next_phase(phase: Phase, state: &WorkflowState) -> Phase {
    match phase {
        Phase::Retrieving => match state.intent {
            Intent::Retrieval => Phase::Generating,
            Intent::Conversational => Phase::Finalizing,
        },
        Phase::Generating => Phase::Validating,
        Phase::Validating => {
            let retry = !state.validation_result
                && state.retry_count <= state.max_retries
                && state.generator_invocations <= state.max_retries;
            if retry {
                Phase::Generating
            } else {
                Phase::Finalizing
            }
        }
        Phase::Finalizing | Phase::Done => Phase::Done,
    }
}

/// Input of a single run.
#[derive(Debug, Clone, Default)]
pub struct RunRequest {
    pub question: String,
    pub chat_history: Vec<ChatTurn>,
    /// Overrides the configured retry budget
    pub max_retries: Option<u32>,
    pub cancel: Option<CancellationToken>,
}

impl RunRequest {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            ..Self::default()
        }
    }

    pub fn with_history(mut self, chat_history: Vec<ChatTurn>) -> Self {
        self.chat_history = chat_history;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }
}

/// A completed step and the state right after it.
#[derive(Debug, Clone, Serialize)]
pub struct StepEvent {
    pub step: StepName,
    pub state: WorkflowState,
}

pub type WorkflowStream = BoxStream<'static, StepEvent>;

/// Drives one run through the step graph, one step per [`advance`](Self::advance).
pub struct StepRunner {
    ports: Arc<Ports>,
    state: WorkflowState,
    phase: Phase,
    cancel: Option<CancellationToken>,
    span: tracing::Span,
}

impl StepRunner {
    fn new(ports: Arc<Ports>, request: RunRequest) -> Self {
        let max_retries = request.max_retries.unwrap_or(ports.config.max_retries);
        let state = WorkflowState::new(request.question, request.chat_history, max_retries);
        let span = tracing::info_span!("workflow", run_id = %state.run_id);
        Self {
            ports,
            state,
            phase: Phase::Retrieving,
            cancel: request.cancel,
            span,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    pub fn into_state(self) -> WorkflowState {
        self.state
    }

    /// Execute the current step and move to the next phase.
    ///
    /// Returns `Ok(None)` once the run is done and `Err(AppError::Cancelled)`
    /// if the token fired before this step started.
    pub async fn advance(&mut self) -> AppResult<Option<StepName>> {
        let Some(step) = self.phase.step() else {
            return Ok(None);
        };
        if self.cancel.as_ref().is_some_and(|c| c.is_cancelled()) {
            tracing::info!(parent: &self.span, step = %step, "Run cancelled");
            return Err(AppError::Cancelled);
        }

        let span = tracing::debug_span!(parent: &self.span, "step", step = %step);
        let ports = self.ports.as_ref();
        let state = &mut self.state;
        async {
            match step {
                StepName::Retriever => steps::retrieve(ports, state).await,
                StepName::Generator => steps::generate(ports, state).await,
                StepName::Validator => steps::validate(ports, state).await,
                StepName::FinalResponse => steps::finalize(ports, state).await,
            }
        }
        .instrument(span)
        .await;

        self.phase = next_phase(self.phase, &self.state);
        tracing::debug!(parent: &self.span, step = %step, next = ?self.phase, "Step complete");
        Ok(Some(step))
    }
}

/// The RAG workflow. Cheap to share: concurrent runs each own their state.
#[derive(Clone)]
pub struct Workflow {
    ports: Arc<Ports>,
}

impl Workflow {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        store: DocumentStore,
        prompts: PromptSet,
        config: WorkflowConfig,
    ) -> Self {
        Self {
            ports: Arc::new(Ports::new(llm, store, prompts, config)),
        }
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.ports.config
    }

    /// Start a run without executing anything yet.
    pub fn runner(&self, request: RunRequest) -> StepRunner {
        StepRunner::new(Arc::clone(&self.ports), request)
    }

    /// Run to completion. If the request's token fires, the state reached so
    /// far is returned; use [`run_cancellable`](Self::run_cancellable) to
    /// tell the two apart.
    pub async fn run(&self, request: RunRequest) -> WorkflowState {
        let mut runner = self.runner(request);
        while let Ok(Some(_)) = runner.advance().await {}
        runner.into_state()
    }

    /// Run to completion, failing with `AppError::Cancelled` if cancelled.
    pub async fn run_cancellable(&self, request: RunRequest) -> AppResult<WorkflowState> {
        let mut runner = self.runner(request);
        while runner.advance().await?.is_some() {}
        Ok(runner.into_state())
    }

    /// Lazily run, yielding one event per executed step in execution order.
    /// The stream ends after the final response or on cancellation.
    pub fn stream(&self, request: RunRequest) -> WorkflowStream {
        let runner = self.runner(request);
        stream::unfold(runner, |mut runner| async move {
            match runner.advance().await {
                Ok(Some(step)) => {
                    let event = StepEvent {
                        step,
                        state: runner.state().clone(),
                    };
                    Some((event, runner))
                }
                Ok(None) | Err(_) => None,
            }
        })
        .boxed()
    }
}
