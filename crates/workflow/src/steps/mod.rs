//! The four workflow steps.
//!
//! Each step reads the fields it needs from [`WorkflowState`], writes its
//! outputs back, and recovers from backend failures locally by recording a
//! [`Degradation`](crate::state::Degradation). Steps never return errors.
//!
//! [`WorkflowState`]: crate::state::WorkflowState

pub mod final_response;
pub mod generator;
pub mod retriever;
pub mod validator;

pub use final_response::{finalize, FINAL_RESPONSE_ERROR};
pub use generator::{generate, INSUFFICIENT_INFORMATION_ANSWER};
pub use retriever::retrieve;
pub use validator::{parse_verdict, validate, Verdict};
