#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Ghost net report types shared across the whole system.
//!
//! A [`Report`] is a user-submitted sighting of a derelict fishing net at a
//! geographic point. Reports move through a small lifecycle
//! ([`ReportStatus`]) and record which user performed each transition
//! ([`Attribution`]).
//!
//! Raw backend payloads are loosely typed (coordinates may arrive as
//! strings, status casing varies), so everything entering the system goes
//! through [`parse::parse_report`] / [`parse::parse_reports`] first. Code
//! downstream of the parser can rely on every [`Report`] having finite,
//! in-range coordinates.

pub mod parse;

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Inclusive latitude range in decimal degrees.
pub const LATITUDE_RANGE: (f64, f64) = (-90.0, 90.0);

/// Inclusive longitude range in decimal degrees.
pub const LONGITUDE_RANGE: (f64, f64) = (-180.0, 180.0);

/// Errors raised while validating report data at the system boundary.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    /// A required field is absent or null.
    #[error("missing required field '{field}'")]
    MissingField {
        /// JSON name of the missing field.
        field: &'static str,
    },

    /// A coordinate is non-finite or outside its valid range.
    #[error("invalid {field}: {value} (expected a finite value in [{min}, {max}])")]
    InvalidCoordinate {
        /// `"latitude"` or `"longitude"`.
        field: &'static str,
        /// The offending value.
        value: f64,
        /// Lower bound (inclusive).
        min: f64,
        /// Upper bound (inclusive).
        max: f64,
    },

    /// A size is negative or non-finite.
    #[error("invalid size: {value} (expected a non-negative finite area)")]
    InvalidSize {
        /// The offending value.
        value: f64,
    },

    /// The payload does not have the expected JSON shape.
    #[error("unexpected payload shape: {message}")]
    Shape {
        /// What was expected.
        message: String,
    },
}

/// Unique identifier of a report, stable for the record's lifetime.
///
/// Backends may hand out numeric or string ids. Numeric ids sort before
/// string ids; within each kind the natural order applies.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReportId {
    /// Integer id (the common case).
    Numeric(i64),
    /// Opaque string id.
    Text(String),
}

impl ReportId {
    /// Returns the numeric value, if this is a numeric id.
    #[must_use]
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Numeric(n) => Some(*n),
            Self::Text(_) => None,
        }
    }
}

impl fmt::Display for ReportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for ReportId {
    fn from(value: i64) -> Self {
        Self::Numeric(value)
    }
}

impl From<&str> for ReportId {
    fn from(value: &str) -> Self {
        value
            .trim()
            .parse::<i64>()
            .map_or_else(|_| Self::Text(value.to_string()), Self::Numeric)
    }
}

impl PartialOrd for ReportId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ReportId {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Numeric(a), Self::Numeric(b)) => a.cmp(b),
            (Self::Numeric(_), Self::Text(_)) => Ordering::Less,
            (Self::Text(_), Self::Numeric(_)) => Ordering::Greater,
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
        }
    }
}

/// Lifecycle stage of a report.
///
/// `REPORTED → SCHEDULED → RECOVERED`, or `→ CANCELLED` from any stage.
/// Transition rules are enforced by the backend, not here.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum ReportStatus {
    /// Sighted and submitted, nobody has acted on it yet.
    #[default]
    Reported,
    /// A recovery has been announced.
    Scheduled,
    /// The net has been recovered.
    Recovered,
    /// The net is lost or the recovery was called off.
    Cancelled,
}

impl ReportStatus {
    /// Returns all variants in lifecycle order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Reported,
            Self::Scheduled,
            Self::Recovered,
            Self::Cancelled,
        ]
    }

    /// Parses a status case-insensitively, falling back to
    /// [`ReportStatus::Reported`] for missing or unrecognized values.
    #[must_use]
    pub fn from_lenient(raw: Option<&str>) -> Self {
        raw.and_then(|s| s.trim().parse().ok()).unwrap_or_default()
    }

    /// Returns the attribution field the backend fills when a report moves
    /// into this status.
    #[must_use]
    pub const fn attribution_field(self) -> Option<AttributionField> {
        AttributionField::for_status(self)
    }
}

/// One of the per-transition "who did it" fields on a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributionField {
    /// `reportedByUserId`
    ReportedBy,
    /// `scheduledByUserId`
    ScheduledBy,
    /// `recoveredByUserId`
    RecoveredBy,
    /// `cancelledByUserId`
    CancelledBy,
}

impl AttributionField {
    /// Returns all fields in lifecycle order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::ReportedBy,
            Self::ScheduledBy,
            Self::RecoveredBy,
            Self::CancelledBy,
        ]
    }

    /// Returns the field populated by a transition into `status`.
    ///
    /// `REPORTED` has none: the reporter is recorded at creation time, not
    /// through a status transition.
    #[must_use]
    pub const fn for_status(status: ReportStatus) -> Option<Self> {
        match status {
            ReportStatus::Reported => None,
            ReportStatus::Scheduled => Some(Self::ScheduledBy),
            ReportStatus::Recovered => Some(Self::RecoveredBy),
            ReportStatus::Cancelled => Some(Self::CancelledBy),
        }
    }

    /// JSON property name on the wire.
    #[must_use]
    pub const fn json_name(self) -> &'static str {
        match self {
            Self::ReportedBy => "reportedByUserId",
            Self::ScheduledBy => "scheduledByUserId",
            Self::RecoveredBy => "recoveredByUserId",
            Self::CancelledBy => "cancelledByUserId",
        }
    }

    /// Human-readable label used in popups and lists.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::ReportedBy => "Reported by",
            Self::ScheduledBy => "Scheduled by",
            Self::RecoveredBy => "Recovered by",
            Self::CancelledBy => "Cancelled by",
        }
    }
}

/// User ids recorded for each lifecycle transition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attribution {
    /// Who submitted the report.
    #[serde(default, rename = "reportedByUserId")]
    pub reported_by: Option<i64>,
    /// Who announced the recovery.
    #[serde(default, rename = "scheduledByUserId")]
    pub scheduled_by: Option<i64>,
    /// Who recovered the net.
    #[serde(default, rename = "recoveredByUserId")]
    pub recovered_by: Option<i64>,
    /// Who cancelled the recovery.
    #[serde(default, rename = "cancelledByUserId")]
    pub cancelled_by: Option<i64>,
}

impl Attribution {
    /// Returns the user id stored in `field`.
    #[must_use]
    pub const fn get(&self, field: AttributionField) -> Option<i64> {
        match field {
            AttributionField::ReportedBy => self.reported_by,
            AttributionField::ScheduledBy => self.scheduled_by,
            AttributionField::RecoveredBy => self.recovered_by,
            AttributionField::CancelledBy => self.cancelled_by,
        }
    }

    /// Stores `user_id` in `field`.
    pub fn set(&mut self, field: AttributionField, user_id: Option<i64>) {
        match field {
            AttributionField::ReportedBy => self.reported_by = user_id,
            AttributionField::ScheduledBy => self.scheduled_by = user_id,
            AttributionField::RecoveredBy => self.recovered_by = user_id,
            AttributionField::CancelledBy => self.cancelled_by = user_id,
        }
    }

    /// Iterates over the populated fields in lifecycle order.
    pub fn present(&self) -> impl Iterator<Item = (AttributionField, i64)> + '_ {
        AttributionField::all()
            .iter()
            .filter_map(|field| self.get(*field).map(|id| (*field, id)))
    }
}

/// Timestamps recorded by the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timeline {
    /// When the report was submitted.
    #[serde(default)]
    pub reported_at: Option<DateTime<Utc>>,
    /// Last modification.
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    /// First transition into `SCHEDULED`.
    #[serde(default)]
    pub scheduled_at: Option<DateTime<Utc>>,
    /// First transition into `RECOVERED`.
    #[serde(default)]
    pub recovered_at: Option<DateTime<Utc>>,
    /// First transition into `CANCELLED`.
    #[serde(default)]
    pub cancelled_at: Option<DateTime<Utc>>,
}

/// A ghost net report as seen by the presentation layer.
///
/// Instances produced by [`parse::parse_report`] always have finite,
/// in-range coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    /// Stable identifier.
    pub id: ReportId,
    /// Latitude (WGS84).
    pub latitude: f64,
    /// Longitude (WGS84).
    pub longitude: f64,
    /// Lifecycle stage.
    #[serde(default)]
    pub status: ReportStatus,
    /// Net area in square metres, `None` when unknown.
    #[serde(default)]
    pub size: Option<f64>,
    /// Contact phone number left by the reporter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Who performed each transition.
    #[serde(flatten)]
    pub attribution: Attribution,
    /// When each transition happened.
    #[serde(flatten)]
    pub timeline: Timeline,
}

impl Report {
    /// Creates a freshly reported net with no size, attribution, or
    /// timestamps.
    #[must_use]
    pub fn new(id: impl Into<ReportId>, latitude: f64, longitude: f64) -> Self {
        Self {
            id: id.into(),
            latitude,
            longitude,
            status: ReportStatus::Reported,
            size: None,
            phone: None,
            attribution: Attribution::default(),
            timeline: Timeline::default(),
        }
    }

    /// Returns this report with `status` replaced.
    #[must_use]
    pub const fn with_status(mut self, status: ReportStatus) -> Self {
        self.status = status;
        self
    }

    /// Returns this report with `size` replaced.
    #[must_use]
    pub const fn with_size(mut self, size: Option<f64>) -> Self {
        self.size = size;
        self
    }

    /// Whether the coordinates can be drawn on a map.
    #[must_use]
    pub fn is_renderable(&self) -> bool {
        is_renderable(self.latitude, self.longitude)
    }
}

/// Whether a coordinate pair is finite and within WGS84 bounds.
#[must_use]
pub fn is_renderable(latitude: f64, longitude: f64) -> bool {
    check_latitude(latitude).is_ok() && check_longitude(longitude).is_ok()
}

/// Validates a latitude value.
///
/// # Errors
///
/// Returns [`ModelError::InvalidCoordinate`] if the value is non-finite or
/// outside `[-90, 90]`.
pub fn check_latitude(value: f64) -> Result<f64, ModelError> {
    check_range("latitude", value, LATITUDE_RANGE)
}

/// Validates a longitude value.
///
/// # Errors
///
/// Returns [`ModelError::InvalidCoordinate`] if the value is non-finite or
/// outside `[-180, 180]`.
pub fn check_longitude(value: f64) -> Result<f64, ModelError> {
    check_range("longitude", value, LONGITUDE_RANGE)
}

fn check_size(value: f64) -> Result<f64, ModelError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(ModelError::InvalidSize { value })
    }
}

fn check_range(field: &'static str, value: f64, (min, max): (f64, f64)) -> Result<f64, ModelError> {
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(value)
    } else {
        Err(ModelError::InvalidCoordinate {
            field,
            value,
            min,
            max,
        })
    }
}

/// Body of `POST /reports`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReport {
    /// Latitude (WGS84).
    pub latitude: f64,
    /// Longitude (WGS84).
    pub longitude: f64,
    /// Net area in square metres.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,
    /// Contact phone number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Reporting user, `None` for anonymous reports.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reported_by_user_id: Option<i64>,
}

impl NewReport {
    /// Creates an anonymous report at the given position.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            size: None,
            phone: None,
            reported_by_user_id: None,
        }
    }

    /// Sets the net area.
    #[must_use]
    pub const fn with_size(mut self, size: f64) -> Self {
        self.size = Some(size);
        self
    }

    /// Sets the contact phone number.
    #[must_use]
    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    /// Validates and normalizes the request.
    ///
    /// Coordinates must be finite and in range, a size must be finite and
    /// non-negative. A blank phone number is dropped, others are trimmed.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError`] describing the first invalid field.
    pub fn validated(mut self) -> Result<Self, ModelError> {
        check_latitude(self.latitude)?;
        check_longitude(self.longitude)?;
        if let Some(size) = self.size {
            check_size(size)?;
        }
        self.phone = self
            .phone
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());
        Ok(self)
    }
}

/// Body of `PATCH /reports/{id}/status`.
///
/// Only the attribution field matching `status` is populated; the others
/// serialize as `null`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    /// Target status.
    pub status: ReportStatus,
    /// Set when `status` is `SCHEDULED`.
    pub scheduled_by_user_id: Option<i64>,
    /// Set when `status` is `RECOVERED`.
    pub recovered_by_user_id: Option<i64>,
    /// Set when `status` is `CANCELLED`.
    pub cancelled_by_user_id: Option<i64>,
}

impl StatusUpdate {
    /// Builds the request for moving to `status` on behalf of `acting_user`.
    #[must_use]
    pub const fn new(status: ReportStatus, acting_user: Option<i64>) -> Self {
        let mut update = Self {
            status,
            scheduled_by_user_id: None,
            recovered_by_user_id: None,
            cancelled_by_user_id: None,
        };
        match AttributionField::for_status(status) {
            Some(AttributionField::ScheduledBy) => update.scheduled_by_user_id = acting_user,
            Some(AttributionField::RecoveredBy) => update.recovered_by_user_id = acting_user,
            Some(AttributionField::CancelledBy) => update.cancelled_by_user_id = acting_user,
            Some(AttributionField::ReportedBy) | None => {}
        }
        update
    }

    /// Returns the attribution field carried by this update and its value.
    #[must_use]
    pub const fn attribution(&self) -> Option<(AttributionField, Option<i64>)> {
        match AttributionField::for_status(self.status) {
            Some(AttributionField::ScheduledBy) => {
                Some((AttributionField::ScheduledBy, self.scheduled_by_user_id))
            }
            Some(AttributionField::RecoveredBy) => {
                Some((AttributionField::RecoveredBy, self.recovered_by_user_id))
            }
            Some(AttributionField::CancelledBy) => {
                Some((AttributionField::CancelledBy, self.cancelled_by_user_id))
            }
            Some(AttributionField::ReportedBy) | None => None,
        }
    }
}
