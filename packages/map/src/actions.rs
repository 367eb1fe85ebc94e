//! User-triggered writes: submitting a report and changing its status.
//!
//! Both go straight to the backend and, only on success, publish the
//! change notification so every attached view re-fetches.

use std::sync::Arc;

use ghost_net_client::{ClientError, ReportBackend};
use ghost_net_events::ChangeNotifier;
use ghost_net_report_models::{
    ModelError, NewReport, Report, ReportId, ReportStatus, StatusUpdate,
};

/// Errors from [`ReportActions`].
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    /// The input failed validation before anything was sent.
    #[error("Invalid input: {0}")]
    Invalid(#[from] ModelError),

    /// The backend call failed.
    #[error(transparent)]
    Backend(#[from] ClientError),
}

impl ActionError {
    /// Text for the blocking notification shown to the user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Invalid(e) => format!("Please check your input: {e}."),
            Self::Backend(ClientError::NotFound { id }) => {
                format!("Report #{id} no longer exists.")
            }
            Self::Backend(ClientError::Rejected { message }) => {
                format!("The report was rejected: {message}")
            }
            Self::Backend(e) if e.is_transport() => {
                "The server could not be reached. Please try again.".to_string()
            }
            Self::Backend(e) => format!("The request failed: {e}"),
        }
    }
}

/// Source of the logged-in user's id.
pub trait CurrentUser: Send + Sync {
    /// The current user's id, `None` when nobody is logged in.
    fn current_user_id(&self) -> Option<i64>;
}

impl CurrentUser for Option<i64> {
    fn current_user_id(&self) -> Option<i64> {
        *self
    }
}

/// Create and status-change operations that notify on success.
#[derive(Clone)]
pub struct ReportActions {
    backend: Arc<dyn ReportBackend>,
    user: Arc<dyn CurrentUser>,
    notifier: ChangeNotifier,
}

impl std::fmt::Debug for ReportActions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportActions")
            .field("user", &self.user.current_user_id())
            .field("notifier", &self.notifier)
            .finish_non_exhaustive()
    }
}

impl ReportActions {
    /// Creates the action set.
    #[must_use]
    pub fn new(
        backend: Arc<dyn ReportBackend>,
        user: Arc<dyn CurrentUser>,
        notifier: ChangeNotifier,
    ) -> Self {
        Self {
            backend,
            user,
            notifier,
        }
    }

    /// Validates and submits a new report on behalf of the current user.
    ///
    /// Anonymous submissions are allowed. An explicit reporter id on
    /// `report` wins over the session user.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::Invalid`] if the coordinates or size are
    /// invalid, and [`ActionError::Backend`] if the request fails. Nothing
    /// is published on error.
    pub async fn create(&self, report: NewReport) -> Result<Report, ActionError> {
        let mut report = report.validated()?;
        if report.reported_by_user_id.is_none() {
            report.reported_by_user_id = self.user.current_user_id();
        }

        let created = self.backend.create_report(&report).await?;
        log::info!(
            "Created report {} at {:.5}, {:.5}",
            created.id,
            created.latitude,
            created.longitude
        );

        self.notifier.publish().await;
        Ok(created)
    }

    /// Moves report `id` to `status`, attributing the change to the current
    /// user.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::Backend`] if the request fails. Nothing is
    /// published on error.
    pub async fn update_status(
        &self,
        id: &ReportId,
        status: ReportStatus,
    ) -> Result<Report, ActionError> {
        let update = StatusUpdate::new(status, self.user.current_user_id());

        let updated = self.backend.update_status(id, &update).await?;
        log::info!("Report {id} is now {}", updated.status);

        self.notifier.publish().await;
        Ok(updated)
    }
}
