//! Counterfeit reports for the last verified session
//!
//! A report is rebuilt from the session cache, never from in-memory state, so
//! it survives the workflow being reset. The cache is cleared only once the
//! service has accepted the report.

use super::geolocation::{locate_within, LocationProvider};
use super::response_interpreter::{failure_detail, success_detail};
use super::session_cache::SessionCache;
use super::submission_builder::build_report;
use super::transport::Transport;
use crate::error::{Error, Result};
use crate::models::{ReportReceipt, ReportRecord};
use checkmed_common::events::{EventBus, WorkflowEvent};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Reason used when neither the caller nor the last verdict supplies one
pub const DEFAULT_REPORT_REASON: &str = "Suspected counterfeit product";

pub struct ReportBuilder {
    transport: Arc<dyn Transport>,
    cache: SessionCache,
    locator: Arc<dyn LocationProvider>,
    location_timeout: Duration,
    event_bus: Option<EventBus>,
}

impl ReportBuilder {
    pub fn new(
        transport: Arc<dyn Transport>,
        cache: SessionCache,
        locator: Arc<dyn LocationProvider>,
        location_timeout: Duration,
    ) -> Self {
        Self {
            transport,
            cache,
            locator,
            location_timeout,
            event_bus: None,
        }
    }

    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    /// Assemble a report from the cached session.
    ///
    /// `reason` falls back to the cached verdict detail, then to
    /// [`DEFAULT_REPORT_REASON`]. Location is best effort.
    pub async fn prepare_report(&self, reason: Option<String>) -> Result<ReportRecord> {
        let cached = self.cache.load()?.ok_or(Error::NoCachedSession)?;

        let reason = reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .or_else(|| cached.last_detail.clone().filter(|d| !d.trim().is_empty()))
            .unwrap_or_else(|| DEFAULT_REPORT_REASON.to_string());

        let location = locate_within(self.locator.as_ref(), self.location_timeout).await;
        let session = cached.session;

        Ok(ReportRecord {
            session_id: session.session_id,
            product_name: session.product_name.clone(),
            registration_code: session.registration_code().to_string(),
            reason,
            location,
            images: session.images().clone(),
        })
    }

    /// Send a prepared report.
    ///
    /// On success the cache is cleared; on failure it is left untouched so the
    /// report can be retried. Once the service has accepted the report a cache
    /// removal problem is only logged.
    pub async fn submit_report(&self, record: &ReportRecord) -> Result<ReportReceipt> {
        match self.cache.load()? {
            Some(cached) if cached.session.session_id == record.session_id => {}
            _ => return Err(Error::NoCachedSession),
        }

        info!(
            session_id = %record.session_id,
            with_location = record.location.is_some(),
            "Submitting counterfeit report"
        );

        match self.transport.submit(build_report(record)).await {
            Ok(body) => {
                // Accepted upstream: the receipt stands even if the slot survives
                if let Err(e) = self.cache.clear() {
                    warn!(
                        session_id = %record.session_id,
                        path = %self.cache.path().display(),
                        "Report accepted but cached session could not be removed: {}", e
                    );
                }
                if let Some(bus) = &self.event_bus {
                    bus.emit_lossy(WorkflowEvent::ReportSubmitted {
                        session_id: record.session_id,
                        with_location: record.location.is_some(),
                        timestamp: checkmed_common::time::now(),
                    });
                }
                Ok(ReportReceipt {
                    session_id: record.session_id,
                    message: success_detail(&body),
                })
            }
            Err(failure) => {
                let detail = failure_detail(&failure);
                warn!(session_id = %record.session_id, detail = %detail, "Report rejected");
                Err(Error::Rejected { detail })
            }
        }
    }
}
