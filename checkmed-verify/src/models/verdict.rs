//! Normalized outcome of a verification call

use serde::{Deserialize, Serialize};

/// Pass/fail verdict, independent of the raw backend response shape.
///
/// Immutable once built. `failed` marks calls that never produced a factual
/// pass/fail answer (network errors, rejected requests).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    authentic: bool,
    failed: bool,
    detail_text: String,
    registration_verified: bool,
    match_score: u8,
}

impl Verdict {
    /// The service accepted the product
    pub fn authentic(detail_text: impl Into<String>) -> Self {
        Self {
            authentic: true,
            failed: false,
            detail_text: detail_text.into(),
            registration_verified: true,
            match_score: 100,
        }
    }

    /// Any error path
    pub fn failure(detail_text: impl Into<String>) -> Self {
        Self {
            authentic: false,
            failed: true,
            detail_text: detail_text.into(),
            registration_verified: false,
            match_score: 0,
        }
    }

    pub fn is_authentic(&self) -> bool {
        self.authentic
    }

    pub fn is_failed(&self) -> bool {
        self.failed
    }

    pub fn detail_text(&self) -> &str {
        &self.detail_text
    }

    pub fn registration_verified(&self) -> bool {
        self.registration_verified
    }

    /// 0..=100
    pub fn match_score(&self) -> u8 {
        self.match_score
    }
}
