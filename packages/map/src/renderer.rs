//! Keeps one map view's marker layer in step with the backend.
//!
//! A refresh fetches the full report collection, spreads overlapping
//! reports, and replaces the layer's markers in one step. Failures are
//! logged and leave the previous markers in place.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use ghost_net_client::{ClientError, ReportBackend};
use ghost_net_events::{ChangeNotifier, SubscriptionId};
use ghost_net_map_models::{MapView, Marker};
use ghost_net_report_models::Report;
use ghost_net_spread::{SpreadOptions, resolve_overlaps};

use crate::config::MapConfig;

/// What a single refresh did.
#[derive(Debug)]
pub enum RefreshOutcome {
    /// The layer now shows `markers` markers; `dropped` records were
    /// skipped as malformed or unrenderable.
    Rendered {
        /// Markers on the layer after the refresh.
        markers: usize,
        /// Records left out of the layer.
        dropped: usize,
    },
    /// A refresh started later had already been applied, so this result
    /// was discarded.
    Superseded,
    /// The fetch failed; the layer was left untouched.
    Failed(ClientError),
}

impl RefreshOutcome {
    /// Whether the layer was replaced.
    #[must_use]
    pub const fn is_rendered(&self) -> bool {
        matches!(self, Self::Rendered { .. })
    }
}

struct RenderState {
    view: MapView,
    /// Sequence number of the refresh currently shown.
    applied: u64,
}

/// Renders the report collection onto one [`MapView`].
pub struct MarkerRenderer {
    backend: Arc<dyn ReportBackend>,
    options: SpreadOptions,
    fit_bounds: bool,
    started: AtomicU64,
    state: Mutex<RenderState>,
}

impl std::fmt::Debug for MarkerRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state();
        f.debug_struct("MarkerRenderer")
            .field("view", &state.view.name())
            .field("markers", &state.view.layer().len())
            .field("options", &self.options)
            .field("fit_bounds", &self.fit_bounds)
            .finish_non_exhaustive()
    }
}

impl MarkerRenderer {
    /// Creates a renderer drawing into `view` with default spreading and
    /// no viewport fitting.
    #[must_use]
    pub fn new(backend: Arc<dyn ReportBackend>, view: MapView) -> Self {
        Self {
            backend,
            options: SpreadOptions::default(),
            fit_bounds: false,
            started: AtomicU64::new(0),
            state: Mutex::new(RenderState { view, applied: 0 }),
        }
    }

    /// Creates a renderer for a new view named `name`, set up from `config`.
    #[must_use]
    pub fn from_config(
        backend: Arc<dyn ReportBackend>,
        name: impl Into<String>,
        config: &MapConfig,
    ) -> Self {
        Self::new(backend, config.new_view(name))
            .with_options(config.spread_options())
            .with_fit_bounds(config.fit_bounds)
    }

    /// Overrides the overlap resolver settings.
    #[must_use]
    pub const fn with_options(mut self, options: SpreadOptions) -> Self {
        self.options = options;
        self
    }

    /// Fits the viewport to the markers after each successful refresh.
    #[must_use]
    pub const fn with_fit_bounds(mut self, fit_bounds: bool) -> Self {
        self.fit_bounds = fit_bounds;
        self
    }

    /// Copy of the current view, markers included.
    #[must_use]
    pub fn snapshot(&self) -> MapView {
        self.state().view.clone()
    }

    /// Number of markers currently drawn.
    #[must_use]
    pub fn marker_count(&self) -> usize {
        self.state().view.layer().len()
    }

    /// Runs `f` with exclusive access to the view, e.g. to pan or zoom.
    pub fn with_view<R>(&self, f: impl FnOnce(&mut MapView) -> R) -> R {
        f(&mut self.state().view)
    }

    /// Fetches the report collection and redraws the layer.
    ///
    /// Never fails: a fetch error is logged and reported as
    /// [`RefreshOutcome::Failed`] with the layer unchanged. Concurrent calls
    /// are allowed; a result is discarded if a refresh that started later
    /// has already been drawn.
    pub async fn refresh(&self) -> RefreshOutcome {
        let seq = self.started.fetch_add(1, Ordering::SeqCst) + 1;

        let batch = match self.backend.list_reports().await {
            Ok(batch) => batch,
            Err(e) => {
                log::error!("[{}] Failed to fetch reports: {e}", self.view_name());
                return RefreshOutcome::Failed(e);
            }
        };

        for reason in &batch.rejected {
            log::debug!("[{}] Dropping malformed report: {reason}", self.view_name());
        }

        let markers = build_markers(&batch.reports, self.options);
        let dropped = batch.rejected.len() + (batch.reports.len() - markers.len());
        if dropped > 0 {
            log::warn!(
                "[{}] Skipped {dropped} report(s) that cannot be shown",
                self.view_name()
            );
        }

        let mut state = self.state();
        if seq < state.applied {
            log::debug!(
                "[{}] Discarding refresh #{seq}, #{} is already shown",
                state.view.name(),
                state.applied
            );
            return RefreshOutcome::Superseded;
        }
        state.applied = seq;

        let view = &mut state.view;
        view.layer_mut().replace_all(markers);
        if self.fit_bounds {
            if let Some(bounds) = view.layer().bounds() {
                view.fit_bounds(bounds);
            }
        }

        let count = view.layer().len();
        log::debug!("[{}] Rendered {count} marker(s)", view.name());

        RefreshOutcome::Rendered {
            markers: count,
            dropped,
        }
    }

    /// Refreshes this renderer on every change notification.
    pub fn attach(self: &Arc<Self>, notifier: &ChangeNotifier) -> SubscriptionId {
        let renderer = Arc::clone(self);
        notifier.subscribe(move || {
            let renderer = Arc::clone(&renderer);
            async move {
                renderer.refresh().await;
            }
        })
    }

    fn view_name(&self) -> String {
        self.state().view.name().to_string()
    }

    fn state(&self) -> MutexGuard<'_, RenderState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Resolves overlaps in `reports` and builds one styled marker per
/// renderable report.
#[must_use]
pub fn build_markers(reports: &[Report], options: SpreadOptions) -> Vec<Marker> {
    resolve_overlaps(reports, options)
        .iter()
        .map(|spread| Marker::for_report(&spread.report, spread.meta.index, spread.meta.total))
        .collect()
}
