//! checkmed-verify library interface
//!
//! Capture, submission and verdict handling for the CheckMed product
//! verification workflow. The `checkmed` binary is a thin front end over this.

pub mod error;
pub mod models;
pub mod services;
pub mod workflow;

pub use crate::error::{Error, Result};
pub use checkmed_common::config::{PacingPolicy, Settings};
pub use models::{ImageBlob, ImageRole, ProductType, ReportRecord, ScanSession, Verdict};
pub use workflow::{Workflow, WorkflowPhase};
