//! Verirag Core Library
//!
//! This crate provides the foundational utilities shared by every verirag crate:
//! - Error handling (`AppError`, `AppResult`)
//! - Logging infrastructure
//! - Configuration management (`AppConfig`, `RagSettings`)

pub mod config;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use config::{AppConfig, RagSettings};
pub use error::{AppError, AppResult};
