//! Workflow controller
//!
//! Owns the current phase, the in-progress capture and the last verdict, and
//! routes each user action to the service that performs it.

use super::WorkflowPhase;
use crate::error::{Error, Result};
use crate::models::{ImageBlob, ImageRole, ProductType, ReportReceipt, ReportRecord, ScanSession, Verdict};
use crate::services::{
    CaptureManager, CaptureStep, HttpTransport, LocationProvider, RegistrationRequest,
    ReportBuilder, SessionCache, VerificationClient,
};
use checkmed_common::config::Settings;
use checkmed_common::events::{EventBus, WorkflowEvent};
use std::sync::Arc;
use tracing::{debug, info};

pub struct Workflow {
    phase: WorkflowPhase,
    capture: Option<CaptureManager>,
    last_verdict: Option<Verdict>,
    client: VerificationClient,
    reports: ReportBuilder,
    event_bus: EventBus,
}

impl Workflow {
    /// `client` and `reports` should already publish on `event_bus`
    pub fn new(client: VerificationClient, reports: ReportBuilder, event_bus: EventBus) -> Self {
        Self {
            phase: WorkflowPhase::Home,
            capture: None,
            last_verdict: None,
            client,
            reports,
            event_bus,
        }
    }

    /// HTTP-backed workflow sharing one transport and cache
    pub fn from_settings(settings: &Settings, locator: Arc<dyn LocationProvider>) -> Result<Self> {
        let event_bus = EventBus::default();
        let transport = Arc::new(HttpTransport::new(
            &settings.service_url,
            settings.request_timeout,
        )?);
        let cache = SessionCache::from_settings(settings);

        let client = VerificationClient::new(transport.clone(), cache.clone(), settings.pacing)
            .with_event_bus(event_bus.clone());
        let reports = ReportBuilder::new(transport, cache, locator, settings.location_timeout)
            .with_event_bus(event_bus.clone());

        Ok(Self::new(client, reports, event_bus))
    }

    pub fn phase(&self) -> WorkflowPhase {
        self.phase
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub fn capture(&self) -> Option<&CaptureManager> {
        self.capture.as_ref()
    }

    pub fn last_verdict(&self) -> Option<&Verdict> {
        self.last_verdict.as_ref()
    }

    /// Home → Instructions
    pub fn begin_scan(&mut self) -> Result<()> {
        self.transition_to(WorkflowPhase::Instructions)
    }

    /// Instructions → ProductDetails
    pub fn acknowledge_instructions(&mut self) -> Result<()> {
        self.transition_to(WorkflowPhase::ProductDetails)
    }

    /// ProductDetails → Capturing, with a fresh session
    pub fn start_capture(&mut self, product_name: &str, product_type: ProductType) -> Result<CaptureStep> {
        self.transition_to(WorkflowPhase::Capturing)?;
        let capture = CaptureManager::new(product_name, product_type)
            .with_event_bus(self.event_bus.clone());
        let step = capture.step();
        self.capture = Some(capture);
        self.last_verdict = None;
        Ok(step)
    }

    pub fn capture_image(&mut self, role: ImageRole, blob: ImageBlob) -> Result<CaptureStep> {
        self.capture_mut()?.capture_image(role, blob)
    }

    pub fn set_registration_code(&mut self, text: &str) -> Result<CaptureStep> {
        Ok(self.capture_mut()?.set_registration_code(text))
    }

    pub fn retry_image(&mut self, role: ImageRole) -> Result<CaptureStep> {
        Ok(self.capture_mut()?.retry_image(role))
    }

    /// Capturing → Verifying → Result.
    ///
    /// An incomplete session is refused before anything is sent and the
    /// workflow stays in `Capturing`.
    pub async fn verify(&mut self) -> Result<Verdict> {
        let session = self.session_for_submit()?;
        self.transition_to(WorkflowPhase::Verifying)?;

        match self.client.verify(&session).await {
            Ok(verdict) => {
                self.last_verdict = Some(verdict.clone());
                self.transition_to(WorkflowPhase::Result)?;
                Ok(verdict)
            }
            Err(e) => {
                self.transition_to(WorkflowPhase::Capturing)?;
                Err(e)
            }
        }
    }

    /// Back to Home, discarding capture state. The session cache is kept so
    /// the last verification can still be reported.
    pub fn start_new(&mut self) -> Result<()> {
        if self.phase != WorkflowPhase::Home {
            self.transition_to(WorkflowPhase::Home)?;
        }
        self.capture = None;
        self.last_verdict = None;
        Ok(())
    }

    /// Home or Result → Registering
    pub fn open_registration(&mut self) -> Result<()> {
        self.transition_to(WorkflowPhase::Registering)
    }

    /// Register `session` with the service; back to Home on success
    pub async fn register(
        &mut self,
        session: &ScanSession,
        request: RegistrationRequest,
    ) -> Result<String> {
        self.require_phase(WorkflowPhase::Registering)?;
        let message = self.client.register_drug(session, request).await?;
        self.transition_to(WorkflowPhase::Home)?;
        Ok(message)
    }

    /// Home or Result → Reporting, with a report built from the cache
    pub async fn prepare_report(&mut self, reason: Option<String>) -> Result<ReportRecord> {
        if !self.phase.can_transition_to(WorkflowPhase::Reporting) {
            return Err(self.invalid(WorkflowPhase::Reporting));
        }
        let record = self.reports.prepare_report(reason).await?;
        self.transition_to(WorkflowPhase::Reporting)?;
        Ok(record)
    }

    /// Send the report; back to Home on success, stay in Reporting on failure
    pub async fn submit_report(&mut self, record: &ReportRecord) -> Result<ReportReceipt> {
        self.require_phase(WorkflowPhase::Reporting)?;
        let receipt = self.reports.submit_report(record).await?;
        self.capture = None;
        self.last_verdict = None;
        self.transition_to(WorkflowPhase::Home)?;
        Ok(receipt)
    }

    fn session_for_submit(&self) -> Result<ScanSession> {
        self.require_phase(WorkflowPhase::Capturing)?;
        let capture = self
            .capture
            .as_ref()
            .ok_or_else(|| self.invalid(WorkflowPhase::Verifying))?;
        let missing = capture.session().missing_requirements();
        if !missing.is_empty() {
            return Err(Error::IncompleteSession { missing });
        }
        Ok(capture.session().clone())
    }

    fn capture_mut(&mut self) -> Result<&mut CaptureManager> {
        self.require_phase(WorkflowPhase::Capturing)?;
        let phase = self.phase;
        self.capture.as_mut().ok_or(Error::InvalidTransition {
            from: phase,
            to: WorkflowPhase::Capturing,
        })
    }

    fn require_phase(&self, expected: WorkflowPhase) -> Result<()> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(self.invalid(expected))
        }
    }

    fn invalid(&self, to: WorkflowPhase) -> Error {
        Error::InvalidTransition {
            from: self.phase,
            to,
        }
    }

    fn transition_to(&mut self, next: WorkflowPhase) -> Result<()> {
        if !self.phase.can_transition_to(next) {
            return Err(self.invalid(next));
        }
        let old = self.phase;
        self.phase = next;

        debug!(from = %old, to = %next, "Workflow phase changed");
        if next == WorkflowPhase::Result {
            info!(session_id = ?self.capture.as_ref().map(|c| c.session().session_id), "Verification finished");
        }

        self.event_bus.emit_lossy(WorkflowEvent::PhaseChanged {
            old_phase: old.as_str().to_string(),
            new_phase: next.as_str().to_string(),
            timestamp: checkmed_common::time::now(),
        });
        Ok(())
    }
}
