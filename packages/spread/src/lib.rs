#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Overlap resolver for report markers.
//!
//! Several reports often share a position (the same net reported twice, or
//! a cluster entered from one boat). Drawn as-is, all but one marker would
//! be hidden. [`resolve_overlaps`] groups reports whose coordinates agree
//! after rounding to [`SpreadOptions::precision`] decimal digits and places
//! every member of a group on a circle of [`SpreadOptions::radius_meters`]
//! around the shared position.
//!
//! Group membership order is the input order, so the angle a given report
//! lands at depends on where it appears in the input. Callers must not
//! assume a specific report always lands at a specific angle.

use std::collections::BTreeMap;
use std::f64::consts::PI;

use ghost_net_report_models::Report;
use serde::{Deserialize, Serialize};

/// Metres per degree of latitude (and of longitude at the equator).
pub const METERS_PER_DEGREE: f64 = 111_320.0;

/// Default rounding precision used to detect coincident points
/// (5 digits ≈ 1.1 m at the equator).
pub const DEFAULT_PRECISION: u32 = 5;

/// Default spreading radius in metres.
pub const DEFAULT_RADIUS_METERS: f64 = 30.0;

/// Largest grouping precision honoured; `f64` carries no more significant
/// decimal digits than this.
pub const MAX_PRECISION: u32 = 15;

/// Tuning knobs for [`resolve_overlaps`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct SpreadOptions {
    /// Decimal digits both coordinates are rounded to when grouping.
    pub precision: u32,
    /// Radius of the circle group members are placed on.
    pub radius_meters: f64,
}

impl Default for SpreadOptions {
    fn default() -> Self {
        Self {
            precision: DEFAULT_PRECISION,
            radius_meters: DEFAULT_RADIUS_METERS,
        }
    }
}

/// Position of a report inside its overlap group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpreadMeta {
    /// Zero-based slot on the circle.
    pub index: usize,
    /// Number of reports in the group.
    pub total: usize,
}

impl SpreadMeta {
    /// Metadata of a report that shares its position with nobody.
    pub const SINGLE: Self = Self { index: 0, total: 1 };

    /// Whether the report was moved off its original position.
    #[must_use]
    pub const fn is_spread(&self) -> bool {
        self.total > 1
    }
}

/// A report whose coordinates may have been offset for display.
///
/// Only `report.latitude` and `report.longitude` differ from the input;
/// every other field is carried over untouched. Recomputed on every render
/// pass and never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct SpreadReport {
    /// The report with display coordinates.
    pub report: Report,
    /// Latitude before spreading.
    pub original_latitude: f64,
    /// Longitude before spreading.
    pub original_longitude: f64,
    /// Slot within the overlap group.
    pub meta: SpreadMeta,
}

/// Spreads reports that share a rounded position onto a circle.
///
/// Reports with non-finite or out-of-range coordinates are silently
/// discarded. A group of one is returned unchanged; a group of `N > 1`
/// places member `i` at angle `2π·i/N` on a circle of
/// `options.radius_meters`, converting metres to degrees with a
/// longitude correction for the group's latitude.
///
/// Groups are emitted in order of first appearance, members in input
/// order, so the same input always yields the same output. A spread member
/// whose offset position is not renderable (a non-finite radius) is dropped
/// too. `precision` above [`MAX_PRECISION`] is treated as [`MAX_PRECISION`].
#[must_use]
pub fn resolve_overlaps(reports: &[Report], options: SpreadOptions) -> Vec<SpreadReport> {
    let mut slots: BTreeMap<(String, String), usize> = BTreeMap::new();
    let mut groups: Vec<Vec<&Report>> = Vec::new();

    for report in reports {
        if !report.is_renderable() {
            log::trace!(
                "Skipping report {} with unrenderable coordinates ({}, {})",
                report.id,
                report.latitude,
                report.longitude
            );
            continue;
        }

        let key = group_key(
            report.latitude,
            report.longitude,
            options.precision.min(MAX_PRECISION),
        );
        let slot = *slots.entry(key).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[slot].push(report);
    }

    let mut out = Vec::with_capacity(reports.len());

    for group in groups {
        let total = group.len();

        if total == 1 {
            let report = group[0];
            out.push(SpreadReport {
                report: report.clone(),
                original_latitude: report.latitude,
                original_longitude: report.longitude,
                meta: SpreadMeta::SINGLE,
            });
            continue;
        }

        log::debug!(
            "Spreading {total} overlapping reports around ({}, {})",
            group[0].latitude,
            group[0].longitude
        );

        for (index, report) in group.into_iter().enumerate() {
            let (d_lat, d_lng) =
                circle_offset(report.latitude, index, total, options.radius_meters);

            let mut spread = report.clone();
            spread.latitude = clamp_latitude(report.latitude + d_lat);
            spread.longitude = wrap_longitude(report.longitude + d_lng);

            if !spread.is_renderable() {
                log::warn!(
                    "Dropping report {}: spreading with radius {} gave ({}, {})",
                    report.id,
                    options.radius_meters,
                    spread.latitude,
                    spread.longitude
                );
                continue;
            }

            out.push(SpreadReport {
                report: spread,
                original_latitude: report.latitude,
                original_longitude: report.longitude,
                meta: SpreadMeta { index, total },
            });
        }
    }

    out
}

/// Degree offset `(Δlat, Δlng)` for slot `index` of `total` on a circle of
/// `radius_meters` around a point at `latitude`.
///
/// Uses the original latitude for the longitude correction. At the poles
/// `cos(lat)` vanishes, so the uncorrected equatorial conversion is used for
/// longitude there; members still get distinct positions.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn circle_offset(
    latitude: f64,
    index: usize,
    total: usize,
    radius_meters: f64,
) -> (f64, f64) {
    let angle = 2.0 * PI * index as f64 / total as f64;
    let cos_lat = latitude.to_radians().cos();

    let deg_lat = radius_meters / METERS_PER_DEGREE;
    let deg_lng = if cos_lat.abs() < 1e-12 {
        deg_lat
    } else {
        radius_meters / (METERS_PER_DEGREE * cos_lat)
    };

    (deg_lat * angle.sin(), deg_lng * angle.cos())
}

/// Rounds both coordinates to `precision` digits, mirroring fixed-point
/// string formatting so near-coincident points share a key.
fn group_key(latitude: f64, longitude: f64, precision: u32) -> (String, String) {
    (
        fixed_key(latitude, precision),
        fixed_key(longitude, precision),
    )
}

/// `value` formatted to `precision` digits, with negative zero (and values
/// rounding to it) keyed like positive zero.
fn fixed_key(value: f64, precision: u32) -> String {
    let digits = precision as usize;
    let key = format!("{value:.digits$}");
    match key.strip_prefix('-') {
        Some(unsigned) if unsigned.bytes().all(|b| b == b'0' || b == b'.') => {
            unsigned.to_string()
        }
        _ => key,
    }
}

fn clamp_latitude(latitude: f64) -> f64 {
    latitude.clamp(-90.0, 90.0)
}

fn wrap_longitude(longitude: f64) -> f64 {
    if (-180.0..=180.0).contains(&longitude) {
        longitude
    } else {
        (longitude + 180.0).rem_euclid(360.0) - 180.0
    }
}
