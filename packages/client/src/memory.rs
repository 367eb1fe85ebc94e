//! In-process [`ReportBackend`].
//!
//! Applies the same server-side rules as the REST backend: ids are
//! assigned sequentially, new reports always start as `REPORTED`, and a
//! status update records the acting user and a timestamp on the field
//! matching the target status. Listing serializes the stored records and
//! runs them back through the boundary parser, so callers see exactly what
//! the HTTP path would produce.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use ghost_net_report_models::parse::{ParsedBatch, parse_reports};
use ghost_net_report_models::{
    AttributionField, NewReport, Report, ReportId, ReportStatus, StatusUpdate,
};
use tokio::sync::oneshot;

use crate::{ClientError, ReportBackend};

#[derive(Default)]
struct State {
    reports: Vec<Report>,
    /// Raw records served verbatim alongside `reports`.
    raw: Vec<serde_json::Value>,
    next_id: i64,
    unavailable: bool,
    held_lists: VecDeque<oneshot::Receiver<()>>,
}

/// Report store living in process memory.
#[derive(Default)]
pub struct MemoryBackend {
    state: Mutex<State>,
    list_calls: AtomicUsize,
}

impl std::fmt::Debug for MemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state();
        f.debug_struct("MemoryBackend")
            .field("reports", &state.reports.len())
            .field("raw", &state.raw.len())
            .field("unavailable", &state.unavailable)
            .finish_non_exhaustive()
    }
}

impl MemoryBackend {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding `reports`.
    #[must_use]
    pub fn with_reports(reports: impl IntoIterator<Item = Report>) -> Self {
        let backend = Self::new();
        for report in reports {
            backend.insert(report);
        }
        backend
    }

    /// Stores `report` as-is, replacing any report with the same id.
    pub fn insert(&self, report: Report) {
        let mut state = self.state();
        if let Some(n) = report.id.as_i64() {
            state.next_id = state.next_id.max(n);
        }
        state.reports.retain(|r| r.id != report.id);
        state.reports.push(report);
    }

    /// Serves `value` verbatim in listings, e.g. to simulate a malformed
    /// record coming from the server.
    pub fn insert_raw(&self, value: serde_json::Value) {
        self.state().raw.push(value);
    }

    /// Makes every operation fail with [`ClientError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state().unavailable = unavailable;
    }

    /// Holds the next listing until the returned sender fires or is
    /// dropped.
    ///
    /// The listing snapshots the data before waiting, so a held call
    /// returns the state as it was when the request arrived.
    pub fn hold_next_list(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.state().held_lists.push_back(rx);
        tx
    }

    /// Returns the stored report with `id`.
    #[must_use]
    pub fn get(&self, id: &ReportId) -> Option<Report> {
        self.state().reports.iter().find(|r| &r.id == id).cloned()
    }

    /// Status of the stored report with `id`.
    #[must_use]
    pub fn status_of(&self, id: &ReportId) -> Option<ReportStatus> {
        self.get(id).map(|r| r.status)
    }

    /// Number of stored (well-formed) reports.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state().reports.len()
    }

    /// Whether no reports are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state().reports.is_empty()
    }

    /// Number of `list_reports` calls served so far.
    #[must_use]
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl ReportBackend for MemoryBackend {
    async fn list_reports(&self) -> Result<ParsedBatch, ClientError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);

        let (body, held) = {
            let mut state = self.state();
            if state.unavailable {
                return Err(ClientError::Unavailable);
            }
            let mut items = state
                .reports
                .iter()
                .map(serde_json::to_value)
                .collect::<Result<Vec<_>, _>>()?;
            items.extend(state.raw.iter().cloned());
            (serde_json::Value::Array(items), state.held_lists.pop_front())
        };

        if let Some(release) = held {
            // A dropped sender releases the call as well.
            let _ = release.await;
        }

        Ok(parse_reports(&body)?)
    }

    async fn create_report(&self, report: &NewReport) -> Result<Report, ClientError> {
        let report = report.clone().validated().map_err(|e| ClientError::Rejected {
            message: e.to_string(),
        })?;

        let mut state = self.state();
        if state.unavailable {
            return Err(ClientError::Unavailable);
        }

        state.next_id += 1;
        let now = Utc::now();

        let mut created = Report::new(state.next_id, report.latitude, report.longitude);
        created.size = report.size;
        created.phone = report.phone;
        created.attribution.reported_by = report.reported_by_user_id;
        created.timeline.reported_at = Some(now);

        state.reports.push(created.clone());
        log::debug!("Created report {}", created.id);
        Ok(created)
    }

    async fn update_status(
        &self,
        id: &ReportId,
        update: &StatusUpdate,
    ) -> Result<Report, ClientError> {
        let mut state = self.state();
        if state.unavailable {
            return Err(ClientError::Unavailable);
        }

        let report = state
            .reports
            .iter_mut()
            .find(|r| &r.id == id)
            .ok_or_else(|| ClientError::NotFound { id: id.clone() })?;

        let previous = report.status;
        let now = Utc::now();
        report.status = update.status;
        report.timeline.updated_at = Some(now);

        if let Some((field, user_id)) = update.attribution() {
            if user_id.is_some() {
                report.attribution.set(field, user_id);
            }

            let stamp = match field {
                AttributionField::ScheduledBy => &mut report.timeline.scheduled_at,
                AttributionField::RecoveredBy => &mut report.timeline.recovered_at,
                AttributionField::CancelledBy => &mut report.timeline.cancelled_at,
                AttributionField::ReportedBy => &mut report.timeline.reported_at,
            };
            if previous != update.status || stamp.is_none() {
                *stamp = Some(now);
            }
        }

        log::debug!("Report {id}: {previous} -> {}", update.status);
        Ok(report.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn create_assigns_sequential_ids_and_forces_reported() {
        let backend = MemoryBackend::with_reports([Report::new(4, 1.0, 1.0)]);

        let mut request = NewReport::new(54.3, 10.1).with_size(8.0);
        request.reported_by_user_id = Some(11);
        let created = backend.create_report(&request).await.unwrap();

        assert_eq!(created.id, ReportId::Numeric(5));
        assert_eq!(created.status, ReportStatus::Reported);
        assert_eq!(created.attribution.reported_by, Some(11));
        assert_eq!(created.size, Some(8.0));
        assert!(created.timeline.reported_at.is_some());
        assert_eq!(backend.len(), 2);
    }

    #[tokio::test]
    async fn create_rejects_invalid_coordinates() {
        let backend = MemoryBackend::new();
        let err = backend
            .create_report(&NewReport::new(120.0, 0.0))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Rejected { .. }));
        assert!(backend.is_empty());
    }

    #[tokio::test]
    async fn status_update_records_matching_attribution_only() {
        let backend = MemoryBackend::with_reports([Report::new(5, 53.5, 8.1)]);
        let id = ReportId::Numeric(5);

        let updated = backend
            .update_status(&id, &StatusUpdate::new(ReportStatus::Recovered, Some(3)))
            .await
            .unwrap();

        assert_eq!(updated.status, ReportStatus::Recovered);
        assert_eq!(updated.attribution.recovered_by, Some(3));
        assert_eq!(updated.attribution.scheduled_by, None);
        assert_eq!(updated.attribution.cancelled_by, None);
        assert!(updated.timeline.recovered_at.is_some());
        assert!(updated.timeline.updated_at.is_some());
        assert_eq!(backend.status_of(&id), Some(ReportStatus::Recovered));
    }

    #[tokio::test]
    async fn repeated_status_keeps_first_timestamp_and_attribution() {
        let backend = MemoryBackend::with_reports([Report::new(1, 0.0, 0.0)]);
        let id = ReportId::Numeric(1);

        let first = backend
            .update_status(&id, &StatusUpdate::new(ReportStatus::Scheduled, Some(2)))
            .await
            .unwrap();
        let second = backend
            .update_status(&id, &StatusUpdate::new(ReportStatus::Scheduled, None))
            .await
            .unwrap();

        assert_eq!(second.attribution.scheduled_by, Some(2));
        assert_eq!(second.timeline.scheduled_at, first.timeline.scheduled_at);
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let backend = MemoryBackend::new();
        let err = backend
            .update_status(
                &ReportId::Numeric(42),
                &StatusUpdate::new(ReportStatus::Cancelled, None),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::NotFound { .. }));
    }

    #[tokio::test]
    async fn listing_drops_malformed_raw_records() {
        let backend = MemoryBackend::with_reports([Report::new(1, 51.0, 10.0)]);
        backend.insert_raw(json!({ "id": 2, "latitude": "51.5", "longitude": "10.5" }));
        backend.insert_raw(json!({ "id": 3, "latitude": 999, "longitude": 10.0 }));

        let batch = backend.list_reports().await.unwrap();

        assert_eq!(batch.reports.len(), 2);
        assert_eq!(batch.rejected.len(), 1);
        assert_eq!(backend.list_calls(), 1);
    }

    #[tokio::test]
    async fn unavailable_backend_fails_every_operation() {
        let backend = MemoryBackend::with_reports([Report::new(1, 0.0, 0.0)]);
        backend.set_unavailable(true);

        assert!(matches!(
            backend.list_reports().await,
            Err(ClientError::Unavailable)
        ));
        assert!(matches!(
            backend.create_report(&NewReport::new(0.0, 0.0)).await,
            Err(ClientError::Unavailable)
        ));

        backend.set_unavailable(false);
        assert!(backend.list_reports().await.is_ok());
    }

    #[tokio::test]
    async fn held_listing_returns_snapshot_from_request_time() {
        let backend = std::sync::Arc::new(MemoryBackend::with_reports([Report::new(
            1, 0.0, 0.0,
        )]));
        let release = backend.hold_next_list();

        let pending = tokio::spawn({
            let backend = std::sync::Arc::clone(&backend);
            async move { backend.list_reports().await }
        });
        while backend.list_calls() == 0 {
            tokio::task::yield_now().await;
        }

        backend.insert(Report::new(2, 1.0, 1.0));
        release.send(()).unwrap();

        let batch = pending.await.unwrap().unwrap();
        assert_eq!(batch.reports.len(), 1);
    }
}
