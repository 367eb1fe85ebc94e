//! Status-keyed marker styling.
//!
//! Pin icons share the standard Leaflet marker shape and differ only in
//! colour, see <https://github.com/pointhi/leaflet-color-markers>.

use ghost_net_report_models::ReportStatus;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

const ICON_BASE_URL: &str =
    "https://raw.githubusercontent.com/pointhi/leaflet-color-markers/master/img/";
const SHADOW_URL: &str =
    "https://cdnjs.cloudflare.com/ajax/libs/leaflet/1.9.4/images/marker-shadow.png";

/// Marker pin colour.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MarkerColor {
    /// `REPORTED`
    Blue,
    /// `SCHEDULED`
    Gold,
    /// `RECOVERED`
    Green,
    /// `CANCELLED`
    Red,
    /// Markers that do not represent a report, e.g. the coordinate picker.
    Grey,
}

impl MarkerColor {
    /// Colour for a report in `status`.
    #[must_use]
    pub const fn for_status(status: ReportStatus) -> Self {
        match status {
            ReportStatus::Reported => Self::Blue,
            ReportStatus::Scheduled => Self::Gold,
            ReportStatus::Recovered => Self::Green,
            ReportStatus::Cancelled => Self::Red,
        }
    }

    /// Colour for an optional status; `None` gets the neutral fallback.
    #[must_use]
    pub const fn for_optional_status(status: Option<ReportStatus>) -> Self {
        match status {
            Some(status) => Self::for_status(status),
            None => Self::Grey,
        }
    }

    /// CSS hex colour, for renderers that draw their own pins.
    #[must_use]
    pub const fn hex(self) -> &'static str {
        match self {
            Self::Blue => "#2a81cb",
            Self::Gold => "#ffd326",
            Self::Green => "#2aad27",
            Self::Red => "#cb2b3e",
            Self::Grey => "#7b7b7b",
        }
    }
}

/// Full pin style: colour plus icon geometry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerStyle {
    /// Pin colour.
    pub color: MarkerColor,
    /// Icon image URL.
    pub icon_url: String,
    /// Shadow image URL.
    pub shadow_url: String,
    /// Icon size in pixels.
    pub icon_size: [u32; 2],
    /// Pixel of the icon that sits on the coordinate.
    pub icon_anchor: [i32; 2],
    /// Popup offset relative to the anchor.
    pub popup_anchor: [i32; 2],
    /// Shadow size in pixels.
    pub shadow_size: [u32; 2],
}

impl MarkerStyle {
    /// Standard pin in `color`.
    #[must_use]
    pub fn pin(color: MarkerColor) -> Self {
        Self {
            color,
            icon_url: format!("{ICON_BASE_URL}marker-icon-{color}.png"),
            shadow_url: SHADOW_URL.to_string(),
            icon_size: [25, 41],
            icon_anchor: [12, 41],
            popup_anchor: [1, -34],
            shadow_size: [41, 41],
        }
    }

    /// Pin for a report in `status`.
    #[must_use]
    pub fn for_status(status: ReportStatus) -> Self {
        Self::pin(MarkerColor::for_status(status))
    }

    /// Neutral pin for markers that are not reports.
    #[must_use]
    pub fn neutral() -> Self {
        Self::pin(MarkerColor::Grey)
    }
}
