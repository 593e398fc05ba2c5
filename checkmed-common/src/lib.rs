//! # CheckMed Common Library
//!
//! Shared code for the CheckMed verification workspace including:
//! - Error types
//! - Configuration loading (CLI, environment, TOML, compiled defaults)
//! - Workflow event types and the broadcast event bus
//! - Timestamp helpers

pub mod config;
pub mod error;
pub mod events;
pub mod time;

pub use error::{Error, Result};
pub use events::{EventBus, WorkflowEvent};
