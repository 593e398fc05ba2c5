//! Transport to the remote verification service
//!
//! The [`Transport`] trait is the seam between workflow logic and the network.
//! [`HttpTransport`] is the production implementation; it posts multipart forms
//! with `reqwest` and decodes error bodies once, right here.

use super::response_interpreter::TransportFailure;
use super::submission_builder::SubmissionPayload;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info, warn};

const USER_AGENT: &str = concat!("CheckMed/", env!("CARGO_PKG_VERSION"));

/// Sends one payload and returns the raw success body
#[async_trait]
pub trait Transport: Send + Sync {
    async fn submit(
        &self,
        payload: SubmissionPayload,
    ) -> std::result::Result<String, TransportFailure>;
}

/// Multipart HTTP transport
pub struct HttpTransport {
    http_client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    /// `base_url` like `https://host/api` (trailing slash optional)
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, payload: &SubmissionPayload) -> String {
        format!("{}/{}", self.base_url, payload.endpoint().path())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn submit(
        &self,
        payload: SubmissionPayload,
    ) -> std::result::Result<String, TransportFailure> {
        let url = self.url_for(&payload);
        info!(
            url = %url,
            fields = ?payload.field_names(),
            "Submitting multipart payload"
        );

        let form = payload
            .into_form()
            .map_err(|e| TransportFailure::network(e.to_string()))?;

        let response = self
            .http_client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                warn!(url = %url, error = %e, "Request failed before a response arrived");
                TransportFailure::network(e.to_string())
            })?;

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                warn!(status = status.as_u16(), error = %e, "Failed to read response body");
                String::new()
            }
        };

        if status.is_success() {
            debug!(status = status.as_u16(), bytes = body.len(), "Service accepted payload");
            Ok(body)
        } else {
            warn!(status = status.as_u16(), "Service rejected payload");
            Err(TransportFailure::from_response(status.as_u16(), &body))
        }
    }
}
