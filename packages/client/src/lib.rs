#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Backend access for ghost net reports.
//!
//! The REST backend is the single source of truth. Everything the
//! presentation layer needs from it goes through the [`ReportBackend`]
//! trait:
//!
//! * `GET /reports` → [`ReportBackend::list_reports`]
//! * `POST /reports` → [`ReportBackend::create_report`]
//! * `PATCH /reports/{id}/status` → [`ReportBackend::update_status`]
//!
//! [`http::HttpBackend`] talks to a real server; [`memory::MemoryBackend`]
//! keeps reports in process and applies the same server-side rules, which
//! makes it the backend double for tests and offline demos.
//!
//! All operations are single-attempt. There is no retry policy: the user
//! re-triggers the action instead.

pub mod config;
pub mod http;
pub mod memory;

use async_trait::async_trait;
use ghost_net_report_models::parse::ParsedBatch;
use ghost_net_report_models::{ModelError, NewReport, Report, ReportId, StatusUpdate};

pub use config::ClientConfig;
pub use http::HttpBackend;
pub use memory::MemoryBackend;

/// Errors from backend operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The request could not be sent or the response not read.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-2xx status.
    #[error("HTTP {status}: {body}")]
    Status {
        /// Response status code.
        status: u16,
        /// Response body, possibly empty.
        body: String,
    },

    /// The response body is not valid JSON.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// The response JSON does not describe a valid report.
    #[error("Invalid report data: {0}")]
    Model(#[from] ModelError),

    /// The configured URL cannot be used.
    #[error("Invalid URL '{url}': {message}")]
    InvalidUrl {
        /// The offending URL or template.
        url: String,
        /// Why it was rejected.
        message: String,
    },

    /// No report with this id exists.
    #[error("Report {id} not found")]
    NotFound {
        /// The requested id.
        id: ReportId,
    },

    /// The backend refused the request payload.
    #[error("Request rejected: {message}")]
    Rejected {
        /// Validation message from the backend.
        message: String,
    },

    /// The backend could not be reached.
    #[error("Backend unavailable")]
    Unavailable,
}

impl ClientError {
    /// Whether the failure happened in transport rather than in the
    /// content of the request.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Http(_) | Self::Unavailable | Self::Status {
                status: 500..=599,
                ..
            }
        )
    }
}

/// CRUD and status-transition operations on the report collection.
#[async_trait]
pub trait ReportBackend: Send + Sync {
    /// Fetches the full current report collection.
    ///
    /// Malformed records are dropped and listed in
    /// [`ParsedBatch::rejected`]; they never fail the whole call.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on transport failure, a non-2xx response, or
    /// a body that is not a JSON array.
    async fn list_reports(&self) -> Result<ParsedBatch, ClientError>;

    /// Submits a new report and returns the created record.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the request fails or is rejected.
    async fn create_report(&self, report: &NewReport) -> Result<Report, ClientError>;

    /// Moves report `id` to a new status and returns the updated record.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the request fails, the id is unknown, or
    /// the update is rejected.
    async fn update_status(
        &self,
        id: &ReportId,
        update: &StatusUpdate,
    ) -> Result<Report, ClientError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_classification() {
        assert!(ClientError::Unavailable.is_transport());
        assert!(
            ClientError::Status {
                status: 503,
                body: String::new()
            }
            .is_transport()
        );
        assert!(
            !ClientError::Status {
                status: 400,
                body: String::new()
            }
            .is_transport()
        );
        assert!(
            !ClientError::NotFound {
                id: ReportId::Numeric(1)
            }
            .is_transport()
        );
    }
}
