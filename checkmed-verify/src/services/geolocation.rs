//! Best-effort device location
//!
//! Location never blocks or fails a report. Denied, unavailable and slow
//! providers all collapse to "no location".

use crate::models::GeoPoint;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

/// Source of the device position
#[async_trait]
pub trait LocationProvider: Send + Sync {
    /// `None` when permission is denied or no fix is available
    async fn current_location(&self) -> Option<GeoPoint>;
}

/// Provider for hosts without any positioning support
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLocation;

#[async_trait]
impl LocationProvider for NoLocation {
    async fn current_location(&self) -> Option<GeoPoint> {
        None
    }
}

/// Position supplied up front, e.g. from the command line
#[derive(Debug, Clone, Copy)]
pub struct FixedLocation(pub GeoPoint);

#[async_trait]
impl LocationProvider for FixedLocation {
    async fn current_location(&self) -> Option<GeoPoint> {
        Some(self.0)
    }
}

/// Ask `provider` for a position, waiting at most `wait`
pub async fn locate_within(provider: &dyn LocationProvider, wait: Duration) -> Option<GeoPoint> {
    match tokio::time::timeout(wait, provider.current_location()).await {
        Ok(Some(point)) => {
            debug!(%point, "Location acquired");
            Some(point)
        }
        Ok(None) => {
            debug!("Location unavailable");
            None
        }
        Err(_) => {
            warn!(wait_ms = wait.as_millis() as u64, "Location lookup timed out");
            None
        }
    }
}
