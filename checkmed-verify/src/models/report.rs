//! Counterfeit report records

use super::product::{ImageBlob, ImageRole};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Sent as the `location` field when no position could be obtained
pub const LOCATION_NOT_AVAILABLE: &str = "not available";

/// WGS84 position in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    /// Returns `None` for non-finite or out-of-range coordinates
    pub fn new(latitude: f64, longitude: f64) -> Option<Self> {
        let valid = latitude.is_finite()
            && longitude.is_finite()
            && (-90.0..=90.0).contains(&latitude)
            && (-180.0..=180.0).contains(&longitude);
        valid.then_some(Self {
            latitude,
            longitude,
        })
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}, {:.6}", self.latitude, self.longitude)
    }
}

/// Counterfeit report rebuilt from the cached scan session
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRecord {
    /// Cached session the report was prepared from
    pub session_id: Uuid,
    pub product_name: String,
    pub registration_code: String,
    pub reason: String,
    pub location: Option<GeoPoint>,
    pub images: BTreeMap<ImageRole, ImageBlob>,
}

impl ReportRecord {
    /// Value of the `location` form field
    pub fn location_field(&self) -> String {
        self.location
            .map(|point| point.to_string())
            .unwrap_or_else(|| LOCATION_NOT_AVAILABLE.to_string())
    }
}

/// Service acknowledgement of a submitted report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportReceipt {
    pub session_id: Uuid,
    pub message: String,
}
