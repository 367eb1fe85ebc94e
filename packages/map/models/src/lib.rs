#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Marker, marker layer, and map view types.
//!
//! A [`MapView`] owns exactly one [`MarkerLayer`]. Layers are cleared and
//! fully repopulated on every refresh; there is no incremental diffing.
//! These types hold display state only and perform no I/O.

pub mod style;

use std::fmt;

use geo::{BoundingRect, MultiPoint, Point, Rect};
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value, feature::Id};
use ghost_net_report_models::{Report, ReportId, ReportStatus};

pub use style::{MarkerColor, MarkerStyle};

/// Start position of a fresh map view (central Germany).
pub const DEFAULT_CENTER: (f64, f64) = (51.163, 10.447);

/// Start zoom of a fresh map view.
pub const DEFAULT_ZOOM: u8 = 6;

/// Zoom used when focusing a single position.
pub const FOCUS_ZOOM: u8 = 13;

/// Detail text attached to a marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Popup {
    /// First line, e.g. `#5 RECOVERED`.
    pub title: String,
    /// Remaining lines.
    pub lines: Vec<String>,
}

impl Popup {
    /// Summarizes id, status, coordinates, size, and any attribution.
    #[must_use]
    pub fn for_report(report: &Report) -> Self {
        let mut lines = vec![
            format!(
                "Position: {:.5}, {:.5}",
                report.latitude, report.longitude
            ),
            format!("Size: {}", format_size(report.size)),
        ];

        for (field, user_id) in report.attribution.present() {
            lines.push(format!("{}: user #{user_id}", field.label()));
        }

        Self {
            title: format!("#{} {}", report.id, report.status),
            lines,
        }
    }
}

impl fmt::Display for Popup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title)?;
        for line in &self.lines {
            write!(f, "\n{line}")?;
        }
        Ok(())
    }
}

/// Formats a net area, `–` when unknown.
#[must_use]
pub fn format_size(size: Option<f64>) -> String {
    size.map_or_else(|| "–".to_string(), |s| format!("{s} m²"))
}

/// A single drawn marker.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    /// Report this marker stands for, `None` for non-report markers.
    pub report_id: Option<ReportId>,
    /// Report status, `None` for non-report markers.
    pub status: Option<ReportStatus>,
    /// Display position (`x` = longitude, `y` = latitude).
    pub position: Point<f64>,
    /// Pin style.
    pub style: MarkerStyle,
    /// Detail popup.
    pub popup: Option<Popup>,
    /// Slot within an overlap group.
    pub group_index: usize,
    /// Size of the overlap group (1 when not overlapping).
    pub group_size: usize,
    /// Whether the user may drag the marker.
    pub draggable: bool,
}

impl Marker {
    /// Marker for `report` at the report's (possibly offset) coordinates.
    #[must_use]
    pub fn for_report(report: &Report, group_index: usize, group_size: usize) -> Self {
        Self {
            report_id: Some(report.id.clone()),
            status: Some(report.status),
            position: Point::new(report.longitude, report.latitude),
            style: MarkerStyle::for_status(report.status),
            popup: Some(Popup::for_report(report)),
            group_index,
            group_size,
            draggable: false,
        }
    }

    /// Draggable neutral marker, used for picking a position.
    #[must_use]
    pub fn draft(latitude: f64, longitude: f64) -> Self {
        Self {
            report_id: None,
            status: None,
            position: Point::new(longitude, latitude),
            style: MarkerStyle::neutral(),
            popup: None,
            group_index: 0,
            group_size: 1,
            draggable: true,
        }
    }

    /// Latitude of the display position.
    #[must_use]
    pub fn latitude(&self) -> f64 {
        self.position.y()
    }

    /// Longitude of the display position.
    #[must_use]
    pub fn longitude(&self) -> f64 {
        self.position.x()
    }

    /// Moves the marker.
    pub fn set_position(&mut self, latitude: f64, longitude: f64) {
        self.position = Point::new(longitude, latitude);
    }

    fn to_feature(&self) -> Feature {
        let mut properties = JsonObject::new();
        if let Some(status) = self.status {
            properties.insert("status".to_string(), status.to_string().into());
        }
        properties.insert("color".to_string(), self.style.color.to_string().into());
        properties.insert("iconUrl".to_string(), self.style.icon_url.clone().into());
        if let Some(popup) = &self.popup {
            properties.insert("popup".to_string(), popup.to_string().into());
        }
        properties.insert("spreadIndex".to_string(), self.group_index.into());
        properties.insert("spreadTotal".to_string(), self.group_size.into());

        let id = self.report_id.as_ref().map(|id| match id {
            ReportId::Numeric(n) => Id::Number((*n).into()),
            ReportId::Text(s) => Id::String(s.clone()),
        });

        Feature {
            bbox: None,
            geometry: Some(Geometry::new(Value::Point(vec![
                self.longitude(),
                self.latitude(),
            ]))),
            id,
            properties: Some(properties),
            foreign_members: None,
        }
    }
}

/// Ownership container for every marker drawn on one map view.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarkerLayer {
    markers: Vec<Marker>,
}

impl MarkerLayer {
    /// Creates an empty layer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            markers: Vec::new(),
        }
    }

    /// Removes every marker.
    pub fn clear(&mut self) {
        self.markers.clear();
    }

    /// Adds a marker.
    pub fn add(&mut self, marker: Marker) {
        self.markers.push(marker);
    }

    /// Clears the layer and fills it with `markers`.
    pub fn replace_all(&mut self, markers: impl IntoIterator<Item = Marker>) {
        self.clear();
        self.markers.extend(markers);
    }

    /// Number of markers on the layer.
    #[must_use]
    pub fn len(&self) -> usize {
        self.markers.len()
    }

    /// Whether the layer is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// All markers in draw order.
    #[must_use]
    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    /// The marker drawn for report `id`.
    #[must_use]
    pub fn find(&self, id: &ReportId) -> Option<&Marker> {
        self.markers
            .iter()
            .find(|m| m.report_id.as_ref() == Some(id))
    }

    /// Bounding rectangle of all marker positions.
    #[must_use]
    pub fn bounds(&self) -> Option<Rect<f64>> {
        let points: MultiPoint<f64> = self.markers.iter().map(|m| m.position).collect();
        points.bounding_rect()
    }

    /// Exports the layer as a `GeoJSON` feature collection.
    #[must_use]
    pub fn to_geojson(&self) -> FeatureCollection {
        FeatureCollection {
            bbox: None,
            features: self.markers.iter().map(Marker::to_feature).collect(),
            foreign_members: None,
        }
    }
}

/// One independently instantiated map (main map, modal map, ...).
#[derive(Debug, Clone, PartialEq)]
pub struct MapView {
    name: String,
    center: Point<f64>,
    zoom: u8,
    viewport: Option<Rect<f64>>,
    layer: MarkerLayer,
}

impl MapView {
    /// Creates a view centred on [`DEFAULT_CENTER`] at [`DEFAULT_ZOOM`].
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_view(name, DEFAULT_CENTER.0, DEFAULT_CENTER.1, DEFAULT_ZOOM)
    }

    /// Creates a view at the given centre and zoom.
    #[must_use]
    pub fn with_view(name: impl Into<String>, latitude: f64, longitude: f64, zoom: u8) -> Self {
        Self {
            name: name.into(),
            center: Point::new(longitude, latitude),
            zoom,
            viewport: None,
            layer: MarkerLayer::new(),
        }
    }

    /// Name used in log messages.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current centre (`x` = longitude, `y` = latitude).
    #[must_use]
    pub const fn center(&self) -> Point<f64> {
        self.center
    }

    /// Current zoom level.
    #[must_use]
    pub const fn zoom(&self) -> u8 {
        self.zoom
    }

    /// Rectangle the view was last fitted to, if any.
    #[must_use]
    pub const fn viewport(&self) -> Option<Rect<f64>> {
        self.viewport
    }

    /// The view's marker layer.
    #[must_use]
    pub const fn layer(&self) -> &MarkerLayer {
        &self.layer
    }

    /// Mutable access to the view's marker layer.
    pub const fn layer_mut(&mut self) -> &mut MarkerLayer {
        &mut self.layer
    }

    /// Centres the view at a position and zoom.
    pub fn set_view(&mut self, latitude: f64, longitude: f64, zoom: u8) {
        self.center = Point::new(longitude, latitude);
        self.zoom = zoom;
    }

    /// Centres the view at a position, keeping the zoom.
    pub fn pan_to(&mut self, latitude: f64, longitude: f64) {
        self.center = Point::new(longitude, latitude);
    }

    /// Fits the view to `bounds`, centring on its middle.
    pub fn fit_bounds(&mut self, bounds: Rect<f64>) {
        self.center = bounds.center().into();
        self.viewport = Some(bounds);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ghost_net_report_models::AttributionField;

    fn sample_report() -> Report {
        let mut report = Report::new(5, 53.5, 8.1)
            .with_status(ReportStatus::Recovered)
            .with_size(Some(12.5));
        report.attribution.set(AttributionField::RecoveredBy, Some(3));
        report
    }

    #[test]
    fn popup_summarizes_report() {
        let popup = Popup::for_report(&sample_report());
        assert_eq!(
            popup.to_string(),
            "#5 RECOVERED\nPosition: 53.50000, 8.10000\nSize: 12.5 m²\nRecovered by: user #3"
        );
    }

    #[test]
    fn popup_marks_unknown_size() {
        let popup = Popup::for_report(&Report::new(1, 0.0, 0.0));
        assert_eq!(popup.lines[1], "Size: –");
    }

    #[test]
    fn report_marker_uses_status_style() {
        let marker = Marker::for_report(&sample_report(), 0, 1);
        assert_eq!(marker.style.color, MarkerColor::Green);
        assert!((marker.latitude() - 53.5).abs() < f64::EPSILON);
        assert!((marker.longitude() - 8.1).abs() < f64::EPSILON);
        assert!(!marker.draggable);
    }

    #[test]
    fn layer_replace_clears_previous_markers() {
        let mut layer = MarkerLayer::new();
        layer.add(Marker::for_report(&Report::new(1, 0.0, 0.0), 0, 1));
        layer.add(Marker::for_report(&Report::new(2, 1.0, 1.0), 0, 1));

        layer.replace_all([Marker::for_report(&sample_report(), 0, 1)]);

        assert_eq!(layer.len(), 1);
        assert!(layer.find(&ReportId::Numeric(5)).is_some());
        assert!(layer.find(&ReportId::Numeric(1)).is_none());
    }

    #[test]
    fn layer_bounds_cover_all_markers() {
        let mut layer = MarkerLayer::new();
        assert!(layer.bounds().is_none());

        layer.add(Marker::for_report(&Report::new(1, 50.0, 8.0), 0, 1));
        layer.add(Marker::for_report(&Report::new(2, 54.0, 12.0), 0, 1));

        let bounds = layer.bounds().unwrap();
        assert!((bounds.min().x - 8.0).abs() < f64::EPSILON);
        assert!((bounds.min().y - 50.0).abs() < f64::EPSILON);
        assert!((bounds.max().x - 12.0).abs() < f64::EPSILON);
        assert!((bounds.max().y - 54.0).abs() < f64::EPSILON);
    }

    #[test]
    fn geojson_export_has_one_feature_per_marker() {
        let mut layer = MarkerLayer::new();
        layer.add(Marker::for_report(&sample_report(), 1, 2));
        layer.add(Marker::draft(1.0, 2.0));

        let collection = layer.to_geojson();
        assert_eq!(collection.features.len(), 2);

        let first = &collection.features[0];
        assert_eq!(first.id, Some(Id::Number(5.into())));
        let props = first.properties.as_ref().unwrap();
        assert_eq!(props["status"], "RECOVERED");
        assert_eq!(props["color"], "green");
        assert_eq!(props["spreadIndex"], 1);
        assert_eq!(props["spreadTotal"], 2);

        let draft = &collection.features[1];
        assert!(draft.id.is_none());
        assert_eq!(draft.properties.as_ref().unwrap()["color"], "grey");
    }

    #[test]
    fn fit_bounds_recentres_view() {
        let mut view = MapView::new("main");
        assert_eq!(view.zoom(), DEFAULT_ZOOM);

        let bounds = Rect::new(geo::coord! { x: 8.0, y: 50.0 }, geo::coord! { x: 12.0, y: 54.0 });
        view.fit_bounds(bounds);

        assert_eq!(view.viewport(), Some(bounds));
        assert!((view.center().x() - 10.0).abs() < f64::EPSILON);
        assert!((view.center().y() - 52.0).abs() < f64::EPSILON);
    }
}
