//! Capture state machine
//!
//! Steps per product type:
//! - Tablet: AwaitingPackage → AwaitingRegistrationCode → AwaitingBlisterPack → Ready
//! - Syrup: AwaitingPackage → AwaitingRegistrationCode → Ready
//!
//! Inputs may arrive in any order. An input for a later step is stored but the
//! machine keeps awaiting the earliest unmet step, so `Ready` is reached exactly
//! when the session is complete.

use crate::error::{Error, Result};
use crate::models::{ImageBlob, ImageRole, ProductType, Requirement, ScanSession};
use checkmed_common::events::{EventBus, WorkflowEvent};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Capture step currently awaited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaptureStep {
    AwaitingPackage,
    AwaitingRegistrationCode,
    AwaitingBlisterPack,
    Ready,
}

impl CaptureStep {
    fn for_requirement(requirement: Requirement) -> Self {
        match requirement {
            Requirement::Image(ImageRole::Package) => CaptureStep::AwaitingPackage,
            Requirement::RegistrationCode => CaptureStep::AwaitingRegistrationCode,
            Requirement::Image(ImageRole::BlisterPack) => CaptureStep::AwaitingBlisterPack,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CaptureStep::AwaitingPackage => "package",
            CaptureStep::AwaitingRegistrationCode => "registration_code",
            CaptureStep::AwaitingBlisterPack => "blister_pack",
            CaptureStep::Ready => "ready",
        }
    }
}

/// Owns a [`ScanSession`] while the user fills it in.
///
/// No network side effects; nothing leaves memory until submission.
pub struct CaptureManager {
    session: ScanSession,
    step: CaptureStep,
    event_bus: Option<EventBus>,
}

impl CaptureManager {
    pub fn new(product_name: impl Into<String>, product_type: ProductType) -> Self {
        Self::from_session(ScanSession::new(product_name, product_type))
    }

    pub fn from_session(session: ScanSession) -> Self {
        let mut manager = Self {
            session,
            step: CaptureStep::AwaitingPackage,
            event_bus: None,
        };
        manager.step = manager.compute_step();
        manager
    }

    /// Publish step changes as `CaptureProgress` events
    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn step(&self) -> CaptureStep {
        self.step
    }

    pub fn session(&self) -> &ScanSession {
        &self.session
    }

    /// Store an image under `role`.
    ///
    /// Rejects blobs whose declared media kind is not `image/*`. A rejected
    /// capture leaves the session untouched.
    pub fn capture_image(&mut self, role: ImageRole, blob: ImageBlob) -> Result<CaptureStep> {
        if !self.session.product_type.accepts(role) {
            return Err(Error::RoleNotApplicable {
                role,
                product_type: self.session.product_type,
            });
        }
        if !blob.is_image() {
            return Err(Error::InvalidImageKind {
                role,
                media_type: blob.media_type().to_string(),
            });
        }

        debug!(
            role = %role,
            media_type = blob.media_type(),
            bytes = blob.len(),
            "Image captured"
        );
        self.session.insert_image(role, blob);
        Ok(self.advance())
    }

    /// Store the uppercase-normalized code. Blank input leaves the step unmet.
    pub fn set_registration_code(&mut self, text: &str) -> CaptureStep {
        self.session.set_registration_code(text);
        self.advance()
    }

    /// Drop a captured image, reverting to the step that produces it
    pub fn retry_image(&mut self, role: ImageRole) -> CaptureStep {
        if self.session.remove_image(role).is_some() {
            debug!(role = %role, "Image cleared for retake");
        }
        self.advance()
    }

    pub fn is_ready(&self) -> bool {
        self.session.is_complete()
    }

    fn compute_step(&self) -> CaptureStep {
        self.session
            .missing_requirements()
            .first()
            .map(|r| CaptureStep::for_requirement(*r))
            .unwrap_or(CaptureStep::Ready)
    }

    fn advance(&mut self) -> CaptureStep {
        let next = self.compute_step();
        if next != self.step {
            debug!(
                session_id = %self.session.session_id,
                from = self.step.as_str(),
                to = next.as_str(),
                "Capture step changed"
            );
            self.step = next;
            if let Some(bus) = &self.event_bus {
                bus.emit_lossy(WorkflowEvent::CaptureProgress {
                    session_id: self.session.session_id,
                    awaiting: next.as_str().to_string(),
                    ready: next == CaptureStep::Ready,
                    timestamp: checkmed_common::time::now(),
                });
            }
        }
        self.step
    }
}
