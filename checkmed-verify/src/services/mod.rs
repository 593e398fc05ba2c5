//! Services layer

pub mod capture_manager;
pub mod geolocation;
pub mod report_builder;
pub mod response_interpreter;
pub mod session_cache;
pub mod submission_builder;
pub mod transport;
pub mod verification_client;

pub use capture_manager::{CaptureManager, CaptureStep};
pub use geolocation::{locate_within, FixedLocation, LocationProvider, NoLocation};
pub use report_builder::{ReportBuilder, DEFAULT_REPORT_REASON};
pub use response_interpreter::{
    interpret_failure, interpret_success, ErrorBody, TransportFailure, GENERIC_FAILURE_MESSAGE,
};
pub use session_cache::{CachedSession, SessionCache};
pub use submission_builder::{Endpoint, Operation, RegistrationRequest, SubmissionPayload};
pub use transport::{HttpTransport, Transport};
pub use verification_client::VerificationClient;
