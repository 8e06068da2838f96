//! Self-correcting retrieval-augmented question answering.
//!
//! A run moves an owned [`WorkflowState`] through four steps: the
//! orchestrating retriever, the generator, the validator (which may send the
//! run back to the generator a bounded number of times) and the final
//! responder. Backends are reached only through the completion client and the
//! document store held in [`Ports`].

pub mod cancel;
pub mod config;
pub mod context;
pub mod engine;
pub mod orchestration;
pub mod ports;
pub mod state;
pub mod steps;

#[cfg(test)]
mod tests;

pub use cancel::CancellationToken;
pub use config::WorkflowConfig;
pub use engine::{next_phase, Phase, RunRequest, StepEvent, StepRunner, Workflow, WorkflowStream};
pub use ports::{Ports, PromptSet};
pub use state::{
    ChatTurn, Confidence, Degradation, DegradationKind, Intent, StepName, TurnRole, WorkflowState,
};
