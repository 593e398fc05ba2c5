//! Data model for the verification workflow

pub mod product;
pub mod report;
pub mod scan_session;
pub mod verdict;

pub use product::{ImageBlob, ImageRole, ProductType};
pub use report::{GeoPoint, ReportReceipt, ReportRecord, LOCATION_NOT_AVAILABLE};
pub use scan_session::{Requirement, ScanSession};
pub use verdict::Verdict;
