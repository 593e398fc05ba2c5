//! Verification workflow phases and controller

pub mod controller;

pub use controller::Workflow;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Screen-level phase of the verification workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowPhase {
    Home,
    Instructions,
    ProductDetails,
    Capturing,
    Verifying,
    Result,
    Reporting,
    Registering,
}

impl WorkflowPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowPhase::Home => "home",
            WorkflowPhase::Instructions => "instructions",
            WorkflowPhase::ProductDetails => "product_details",
            WorkflowPhase::Capturing => "capturing",
            WorkflowPhase::Verifying => "verifying",
            WorkflowPhase::Result => "result",
            WorkflowPhase::Reporting => "reporting",
            WorkflowPhase::Registering => "registering",
        }
    }

    /// Allowed phase changes.
    ///
    /// Every phase except `Verifying` can be abandoned back to `Home`.
    pub fn can_transition_to(&self, next: WorkflowPhase) -> bool {
        use WorkflowPhase::*;

        matches!(
            (*self, next),
            (Home, Instructions)
                | (Home, Registering)
                | (Home, Reporting)
                | (Instructions, ProductDetails)
                | (ProductDetails, Capturing)
                | (Capturing, Verifying)
                | (Verifying, Result)
                | (Verifying, Capturing)
                | (Result, Reporting)
                | (Result, Registering)
                | (Reporting, Result)
                | (Instructions | ProductDetails | Capturing | Result | Reporting | Registering, Home)
        )
    }
}

impl fmt::Display for WorkflowPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_path_allowed() {
        let path = [
            WorkflowPhase::Home,
            WorkflowPhase::Instructions,
            WorkflowPhase::ProductDetails,
            WorkflowPhase::Capturing,
            WorkflowPhase::Verifying,
            WorkflowPhase::Result,
            WorkflowPhase::Reporting,
            WorkflowPhase::Home,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_verifying_cannot_be_abandoned() {
        assert!(!WorkflowPhase::Verifying.can_transition_to(WorkflowPhase::Home));
        assert!(!WorkflowPhase::Home.can_transition_to(WorkflowPhase::Home));
    }

    #[test]
    fn test_no_shortcuts_to_verdict() {
        assert!(!WorkflowPhase::Capturing.can_transition_to(WorkflowPhase::Result));
        assert!(!WorkflowPhase::Home.can_transition_to(WorkflowPhase::Verifying));
        assert!(!WorkflowPhase::Instructions.can_transition_to(WorkflowPhase::Capturing));
    }

    #[test]
    fn test_phase_serialization() {
        let json = serde_json::to_string(&WorkflowPhase::ProductDetails).unwrap();
        assert_eq!(json, "\"product_details\"");
    }
}
