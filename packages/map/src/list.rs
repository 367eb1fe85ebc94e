//! Sidebar report list.
//!
//! A second, independent consumer of the report collection: it re-fetches
//! on its own after a change notification and keeps the reports sorted by
//! id. Positions shown here are the stored ones, never the spread display
//! positions.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use ghost_net_client::ReportBackend;
use ghost_net_events::{ChangeNotifier, SubscriptionId};
use ghost_net_map_models::{FOCUS_ZOOM, MapView};
use ghost_net_report_models::{Report, ReportId};

use crate::renderer::RefreshOutcome;

/// Where the map should move when a list entry is selected.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FocusTarget {
    /// Latitude to centre on.
    pub latitude: f64,
    /// Longitude to centre on.
    pub longitude: f64,
    /// Zoom level to use.
    pub zoom: u8,
}

impl FocusTarget {
    /// Centres `view` on this target.
    pub fn apply(&self, view: &mut MapView) {
        view.set_view(self.latitude, self.longitude, self.zoom);
    }
}

#[derive(Default)]
struct ListState {
    reports: Vec<Report>,
    applied: u64,
}

/// Sorted, filterable list of all reports.
pub struct ReportList {
    backend: Arc<dyn ReportBackend>,
    started: AtomicU64,
    state: Mutex<ListState>,
}

impl std::fmt::Debug for ReportList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportList")
            .field("entries", &self.len())
            .finish_non_exhaustive()
    }
}

impl ReportList {
    /// Creates an empty list; call [`refresh`](Self::refresh) to fill it.
    #[must_use]
    pub fn new(backend: Arc<dyn ReportBackend>) -> Self {
        Self {
            backend,
            started: AtomicU64::new(0),
            state: Mutex::new(ListState::default()),
        }
    }

    /// Re-fetches the collection. Same failure and ordering rules as
    /// [`MarkerRenderer::refresh`](crate::MarkerRenderer::refresh);
    /// `markers` in the outcome counts list entries.
    pub async fn refresh(&self) -> RefreshOutcome {
        let seq = self.started.fetch_add(1, Ordering::SeqCst) + 1;

        let batch = match self.backend.list_reports().await {
            Ok(batch) => batch,
            Err(e) => {
                log::error!("[list] Failed to fetch reports: {e}");
                return RefreshOutcome::Failed(e);
            }
        };

        let dropped = batch.rejected.len();
        let mut reports = batch.reports;
        reports.sort_by(|a, b| a.id.cmp(&b.id));

        let mut state = self.state();
        if seq < state.applied {
            log::debug!("[list] Discarding refresh #{seq}");
            return RefreshOutcome::Superseded;
        }
        state.applied = seq;
        state.reports = reports;

        RefreshOutcome::Rendered {
            markers: state.reports.len(),
            dropped,
        }
    }

    /// Refreshes this list on every change notification.
    pub fn attach(self: &Arc<Self>, notifier: &ChangeNotifier) -> SubscriptionId {
        let list = Arc::clone(self);
        notifier.subscribe(move || {
            let list = Arc::clone(&list);
            async move {
                list.refresh().await;
            }
        })
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state().reports.len()
    }

    /// Whether the list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state().reports.is_empty()
    }

    /// All entries, sorted by id.
    #[must_use]
    pub fn entries(&self) -> Vec<Report> {
        self.state().reports.clone()
    }

    /// Entries whose `#id` or status contains `query`, ignoring case.
    ///
    /// A blank query matches everything.
    #[must_use]
    pub fn filter(&self, query: &str) -> Vec<Report> {
        let query = query.trim().to_lowercase();
        self.state()
            .reports
            .iter()
            .filter(|r| query.is_empty() || matches_query(r, &query))
            .cloned()
            .collect()
    }

    /// Map position for the entry with `id`.
    #[must_use]
    pub fn focus_target(&self, id: &ReportId) -> Option<FocusTarget> {
        self.state()
            .reports
            .iter()
            .find(|r| &r.id == id)
            .map(|r| FocusTarget {
                latitude: r.latitude,
                longitude: r.longitude,
                zoom: FOCUS_ZOOM,
            })
    }

    fn state(&self) -> MutexGuard<'_, ListState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn matches_query(report: &Report, query: &str) -> bool {
    format!("#{}", report.id).to_lowercase().contains(query)
        || report.status.as_ref().to_lowercase().contains(query)
}

/// One-line entry text: `#id STATUS · size · lat, lng`.
#[must_use]
pub fn summary_line(report: &Report) -> String {
    format!(
        "#{} {} · {} · {:.3}, {:.3}",
        report.id,
        report.status,
        ghost_net_map_models::format_size(report.size),
        report.latitude,
        report.longitude
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use ghost_net_client::MemoryBackend;
    use ghost_net_report_models::ReportStatus;

    async fn filled_list() -> ReportList {
        let backend = MemoryBackend::with_reports([
            Report::new(12, 54.1, 10.2).with_status(ReportStatus::Scheduled),
            Report::new(3, 53.5, 8.1).with_status(ReportStatus::Recovered),
            Report::new("net-b", 52.0, 7.0),
            Report::new(7, 55.0, 11.0),
        ]);
        let list = ReportList::new(Arc::new(backend));
        assert!(list.refresh().await.is_rendered());
        list
    }

    fn ids(reports: &[Report]) -> Vec<String> {
        reports.iter().map(|r| r.id.to_string()).collect()
    }

    #[tokio::test]
    async fn entries_are_sorted_numeric_first() {
        let list = filled_list().await;
        assert_eq!(ids(&list.entries()), ["3", "7", "12", "net-b"]);
    }

    #[tokio::test]
    async fn filter_matches_id_and_status_case_insensitively() {
        let list = filled_list().await;

        assert_eq!(ids(&list.filter("sched")), ["12"]);
        assert_eq!(ids(&list.filter("#1")), ["12"]);
        assert_eq!(ids(&list.filter("REPORTED")), ["7", "net-b"]);
        assert_eq!(ids(&list.filter("NET-")), ["net-b"]);
        assert_eq!(list.filter("   ").len(), 4);
        assert!(list.filter("nothing like this").is_empty());
    }

    #[tokio::test]
    async fn focus_target_uses_stored_position_and_focus_zoom() {
        let list = filled_list().await;

        let target = list.focus_target(&ReportId::Numeric(3)).unwrap();
        assert!((target.latitude - 53.5).abs() < f64::EPSILON);
        assert!((target.longitude - 8.1).abs() < f64::EPSILON);
        assert_eq!(target.zoom, 13);

        let mut view = MapView::new("main");
        target.apply(&mut view);
        assert_eq!(view.zoom(), 13);

        assert!(list.focus_target(&ReportId::Numeric(99)).is_none());
    }

    #[test]
    fn summary_line_formats_size_and_coordinates() {
        let report = Report::new(5, 53.512_34, 8.1)
            .with_status(ReportStatus::Recovered)
            .with_size(Some(12.5));
        assert_eq!(summary_line(&report), "#5 RECOVERED · 12.5 m² · 53.512, 8.100");

        let unknown = Report::new(6, 1.0, 2.0);
        assert_eq!(summary_line(&unknown), "#6 REPORTED · – · 1.000, 2.000");
    }

    #[tokio::test]
    async fn failed_refresh_keeps_entries() {
        let backend = Arc::new(MemoryBackend::with_reports([Report::new(1, 1.0, 1.0)]));
        let list = ReportList::new(backend.clone());
        list.refresh().await;

        backend.set_unavailable(true);
        assert!(matches!(list.refresh().await, RefreshOutcome::Failed(_)));
        assert_eq!(list.len(), 1);
    }
}
