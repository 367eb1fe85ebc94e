#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Map-side presentation logic for ghost net reports.
//!
//! * [`MarkerRenderer`] keeps one map view's marker layer in step with the
//!   backend.
//! * [`ReportList`] is the sidebar's sorted, filterable copy of the same
//!   collection.
//! * [`CoordinatePicker`] binds the report form's position fields to a
//!   draggable marker.
//! * [`ReportActions`] submits reports and status changes.
//!
//! The pieces never call each other. Writers publish on a shared
//! [`ghost_net_events::ChangeNotifier`] and every attached reader
//! re-fetches on its own.

pub mod actions;
pub mod config;
pub mod list;
pub mod picker;
pub mod renderer;

pub use actions::{ActionError, CurrentUser, ReportActions};
pub use config::{MapConfig, Settings};
pub use list::{FocusTarget, ReportList, summary_line};
pub use picker::{CoordinatePicker, FieldValues};
pub use renderer::{MarkerRenderer, RefreshOutcome, build_markers};
