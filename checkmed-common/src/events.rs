//! Workflow events for the presentation layer
//!
//! The verification workflow publishes its progress on an [`EventBus`] so a
//! front end can drive progress indicators without polling.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Workflow event types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WorkflowEvent {
    /// Workflow moved to another phase
    PhaseChanged {
        old_phase: String,
        new_phase: String,
        timestamp: DateTime<Utc>,
    },

    /// A capture step was completed or reverted
    CaptureProgress {
        session_id: Uuid,
        /// Step now awaited, or "ready"
        awaiting: String,
        ready: bool,
        timestamp: DateTime<Utc>,
    },

    /// Verification request issued
    VerificationStarted {
        session_id: Uuid,
        product_type: String,
        timestamp: DateTime<Utc>,
    },

    /// Verdict surfaced (after the pacing floor)
    VerificationCompleted {
        session_id: Uuid,
        authentic: bool,
        failed: bool,
        timestamp: DateTime<Utc>,
    },

    /// Counterfeit report accepted by the service
    ReportSubmitted {
        session_id: Uuid,
        with_location: bool,
        timestamp: DateTime<Utc>,
    },
}

impl WorkflowEvent {
    /// Event type name as serialized in the `type` tag
    pub fn event_type(&self) -> &'static str {
        match self {
            WorkflowEvent::PhaseChanged { .. } => "PhaseChanged",
            WorkflowEvent::CaptureProgress { .. } => "CaptureProgress",
            WorkflowEvent::VerificationStarted { .. } => "VerificationStarted",
            WorkflowEvent::VerificationCompleted { .. } => "VerificationCompleted",
            WorkflowEvent::ReportSubmitted { .. } => "ReportSubmitted",
        }
    }
}

/// Broadcast bus for [`WorkflowEvent`]s
///
/// Cloning shares the same underlying channel.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<WorkflowEvent>,
}

impl EventBus {
    /// Creates a new EventBus buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<WorkflowEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: WorkflowEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}
