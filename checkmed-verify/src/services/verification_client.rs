//! Verification and product registration calls
//!
//! `verify` never returns a transport problem as an error: every service or
//! network failure comes back as a failed [`Verdict`]. Only misuse (an
//! incomplete session, a second concurrent call) is an `Err`.

use super::response_interpreter::{failure_detail, interpret_failure, interpret_success, success_detail};
use super::session_cache::SessionCache;
use super::submission_builder::{build, Operation, RegistrationRequest};
use super::transport::{HttpTransport, Transport};
use crate::error::{Error, Result};
use crate::models::{ScanSession, Verdict};
use checkmed_common::config::{PacingPolicy, Settings};
use checkmed_common::events::{EventBus, WorkflowEvent};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Client for the remote verification service
pub struct VerificationClient {
    transport: Arc<dyn Transport>,
    cache: SessionCache,
    pacing: PacingPolicy,
    in_flight: AtomicBool,
    event_bus: Option<EventBus>,
}

/// Clears the in-flight flag when the call finishes, however it finishes
struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| Error::VerificationInFlight)?;
        Ok(Self(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl VerificationClient {
    pub fn new(transport: Arc<dyn Transport>, cache: SessionCache, pacing: PacingPolicy) -> Self {
        Self {
            transport,
            cache,
            pacing,
            in_flight: AtomicBool::new(false),
            event_bus: None,
        }
    }

    /// HTTP client configured from resolved settings
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let transport = HttpTransport::new(&settings.service_url, settings.request_timeout)?;
        Ok(Self::new(
            Arc::new(transport),
            SessionCache::from_settings(settings),
            settings.pacing,
        ))
    }

    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn cache(&self) -> &SessionCache {
        &self.cache
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Submit a complete session and wait for its verdict.
    ///
    /// The session is cached before the request goes out so it can be reported
    /// even if the call fails. The verdict is held back until the pacing floor
    /// has elapsed since submission.
    pub async fn verify(&self, session: &ScanSession) -> Result<Verdict> {
        let payload = build(session, &Operation::Verify)?;
        let _guard = InFlightGuard::acquire(&self.in_flight)?;

        if let Err(e) = self.cache.store(session) {
            warn!(session_id = %session.session_id, "Failed to cache scan session: {}", e);
        }

        self.emit(WorkflowEvent::VerificationStarted {
            session_id: session.session_id,
            product_type: session.product_type.as_str().to_string(),
            timestamp: checkmed_common::time::now(),
        });

        info!(
            session_id = %session.session_id,
            product_type = session.product_type.as_str(),
            "Verifying product"
        );

        let started = Instant::now();
        let (verdict, floor) = match self.transport.submit(payload).await {
            Ok(body) => (interpret_success(&body), self.pacing.success_floor),
            Err(failure) => {
                debug!(status = ?failure.status, "Verification request failed");
                (interpret_failure(&failure), self.pacing.failure_floor)
            }
        };
        tokio::time::sleep_until(started + floor).await;

        if let Err(e) = self.cache.record_detail(session.session_id, verdict.detail_text()) {
            warn!(session_id = %session.session_id, "Failed to record verdict detail: {}", e);
        }

        info!(
            session_id = %session.session_id,
            authentic = verdict.is_authentic(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Verdict ready"
        );

        self.emit(WorkflowEvent::VerificationCompleted {
            session_id: session.session_id,
            authentic: verdict.is_authentic(),
            failed: verdict.is_failed(),
            timestamp: checkmed_common::time::now(),
        });

        Ok(verdict)
    }

    /// Register a product not yet known to the service.
    ///
    /// Returns the service acknowledgement; a refusal is `Error::Rejected`.
    pub async fn register_drug(
        &self,
        session: &ScanSession,
        request: RegistrationRequest,
    ) -> Result<String> {
        let payload = build(session, &Operation::Register(request))?;

        info!(session_id = %session.session_id, "Registering product");

        match self.transport.submit(payload).await {
            Ok(body) => Ok(success_detail(&body)),
            Err(failure) => {
                let detail = failure_detail(&failure);
                warn!(session_id = %session.session_id, detail = %detail, "Registration rejected");
                Err(Error::Rejected { detail })
            }
        }
    }

    fn emit(&self, event: WorkflowEvent) {
        if let Some(bus) = &self.event_bus {
            bus.emit_lossy(event);
        }
    }
}
