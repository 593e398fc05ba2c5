//! Error types for checkmed-verify
//!
//! Capture-time errors are recovered locally and never reach the network
//! layer. Verification-time transport failures are not errors at all: they
//! come back as a failed [`Verdict`](crate::models::Verdict).

use crate::models::{ImageRole, ProductType, Requirement};
use crate::workflow::WorkflowPhase;
use thiserror::Error;

/// Main error type for checkmed-verify
#[derive(Error, Debug)]
pub enum Error {
    /// Selected file is not an image
    #[error("Invalid image kind for {role}: '{media_type}' is not an image")]
    InvalidImageKind { role: ImageRole, media_type: String },

    /// Image role does not exist for this product type
    #[error("A {product_type} has no {role} image")]
    RoleNotApplicable {
        role: ImageRole,
        product_type: ProductType,
    },

    /// Submission attempted before every required role and the code are present
    #[error("Incomplete session: missing {}", join_requirements(.missing))]
    IncompleteSession { missing: Vec<Requirement> },

    /// Product registration attempted without a manufacturer
    #[error("A manufacturer is required to register a product")]
    MissingManufacturer,

    /// Report attempted with no cached session
    #[error("No cached scan session to report")]
    NoCachedSession,

    /// A verification call is already running on this client
    #[error("A verification is already in progress")]
    VerificationInFlight,

    /// Workflow phase change not in the transition table
    #[error("Invalid workflow transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: WorkflowPhase,
        to: WorkflowPhase,
    },

    /// Remote service refused a register or report call
    #[error("Rejected by service: {detail}")]
    Rejected { detail: String },

    /// HTTP client construction error
    #[error("HTTP client error: {0}")]
    Http(String),

    /// Session cache could not be read or written
    #[error("Session cache error: {0}")]
    Cache(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn join_requirements(missing: &[Requirement]) -> String {
    missing
        .iter()
        .map(|r| r.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Convenience Result type using checkmed-verify Error
pub type Result<T> = std::result::Result<T, Error>;
