//! Position picker used by the report form.
//!
//! Two-way binding between a latitude/longitude field pair and a single
//! draggable draft marker. Typing into the fields moves the marker once both
//! values are valid; clicking the map or dropping the marker writes the
//! position back into the fields.

use ghost_net_map_models::{FOCUS_ZOOM, MapView, Marker};
use ghost_net_report_models::parse::parse_decimal;
use ghost_net_report_models::{check_latitude, check_longitude};

/// Text of the latitude and longitude inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldValues {
    /// Latitude input.
    pub latitude: String,
    /// Longitude input.
    pub longitude: String,
}

impl FieldValues {
    /// Formats a position the way the form displays it.
    #[must_use]
    pub fn from_position(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude: format!("{latitude:.5}"),
            longitude: format!("{longitude:.5}"),
        }
    }
}

/// Parses one coordinate input, accepting `,` or `.` as decimal separator.
#[must_use]
pub fn parse_field(raw: &str) -> Option<f64> {
    parse_decimal(raw).filter(|v| v.is_finite())
}

/// Parses both inputs into an in-range position.
#[must_use]
pub fn read_fields(latitude: &str, longitude: &str) -> Option<(f64, f64)> {
    let latitude = check_latitude(parse_field(latitude)?).ok()?;
    let longitude = check_longitude(parse_field(longitude)?).ok()?;
    Some((latitude, longitude))
}

/// Map view plus the one reusable draft marker.
#[derive(Debug, Clone)]
pub struct CoordinatePicker {
    view: MapView,
    draft: Option<Marker>,
    fields: FieldValues,
}

impl CoordinatePicker {
    /// Creates a picker on `view` with no marker placed.
    #[must_use]
    pub fn new(view: MapView) -> Self {
        Self {
            view,
            draft: None,
            fields: FieldValues::default(),
        }
    }

    /// The picker's map view.
    #[must_use]
    pub const fn view(&self) -> &MapView {
        &self.view
    }

    /// The draft marker, once placed.
    #[must_use]
    pub const fn marker(&self) -> Option<&Marker> {
        self.draft.as_ref()
    }

    /// Current field contents.
    #[must_use]
    pub const fn fields(&self) -> &FieldValues {
        &self.fields
    }

    /// The validated position from the fields, if both are valid.
    #[must_use]
    pub fn position(&self) -> Option<(f64, f64)> {
        read_fields(&self.fields.latitude, &self.fields.longitude)
    }

    /// Takes new field text. Moves the marker and zooms in only if both
    /// values are valid; otherwise the marker stays where it is.
    ///
    /// Returns whether the marker moved.
    pub fn set_from_fields(&mut self, latitude: &str, longitude: &str) -> bool {
        self.fields = FieldValues {
            latitude: latitude.to_string(),
            longitude: longitude.to_string(),
        };

        let Some((lat, lng)) = self.position() else {
            return false;
        };

        self.place(lat, lng);
        self.view.set_view(lat, lng, FOCUS_ZOOM);
        true
    }

    /// Handles a map click: moves the marker there, pans to it, and fills
    /// the fields.
    pub fn click(&mut self, latitude: f64, longitude: f64) -> FieldValues {
        self.place(latitude, longitude);
        self.view.pan_to(latitude, longitude);
        self.write_fields(latitude, longitude)
    }

    /// Handles the end of a marker drag: fills the fields with the drop
    /// position.
    pub fn drag_end(&mut self, latitude: f64, longitude: f64) -> FieldValues {
        self.place(latitude, longitude);
        self.write_fields(latitude, longitude)
    }

    /// Removes the marker and empties the fields.
    pub fn reset(&mut self) {
        self.draft = None;
        self.fields = FieldValues::default();
    }

    fn place(&mut self, latitude: f64, longitude: f64) {
        match &mut self.draft {
            Some(marker) => marker.set_position(latitude, longitude),
            None => self.draft = Some(Marker::draft(latitude, longitude)),
        }
    }

    fn write_fields(&mut self, latitude: f64, longitude: f64) -> FieldValues {
        self.fields = FieldValues::from_position(latitude, longitude);
        self.fields.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ghost_net_map_models::MarkerColor;

    #[test]
    fn parse_field_accepts_comma_and_dot() {
        assert_eq!(parse_field("54,3"), Some(54.3));
        assert_eq!(parse_field(" 10.25 "), Some(10.25));
        assert_eq!(parse_field(""), None);
        assert_eq!(parse_field("north"), None);
        assert_eq!(parse_field("NaN"), None);
    }

    #[test]
    fn read_fields_checks_ranges() {
        assert_eq!(read_fields("54,3", "10,1"), Some((54.3, 10.1)));
        assert_eq!(read_fields("91", "10"), None);
        assert_eq!(read_fields("54", "-180.5"), None);
        assert_eq!(read_fields("54", ""), None);
    }

    #[test]
    fn valid_fields_place_marker_and_zoom_in() {
        let mut picker = CoordinatePicker::new(MapView::new("modal"));

        assert!(!picker.set_from_fields("54,3", ""));
        assert!(picker.marker().is_none());
        assert_eq!(picker.view().zoom(), 6);

        assert!(picker.set_from_fields("54,3", "10,1"));
        let marker = picker.marker().unwrap();
        assert!(marker.draggable);
        assert_eq!(marker.style.color, MarkerColor::Grey);
        assert!((marker.latitude() - 54.3).abs() < f64::EPSILON);
        assert_eq!(picker.view().zoom(), 13);
    }

    #[test]
    fn invalid_fields_leave_marker_in_place() {
        let mut picker = CoordinatePicker::new(MapView::new("modal"));
        picker.set_from_fields("54", "10");

        assert!(!picker.set_from_fields("540", "10"));
        let marker = picker.marker().unwrap();
        assert!((marker.latitude() - 54.0).abs() < f64::EPSILON);
        assert_eq!(picker.fields().latitude, "540");
        assert_eq!(picker.position(), None);
    }

    #[test]
    fn click_and_drag_write_five_decimals_and_reuse_marker() {
        let mut picker = CoordinatePicker::new(MapView::new("modal"));

        let fields = picker.click(53.123_456_7, 8.5);
        assert_eq!(fields.latitude, "53.12346");
        assert_eq!(fields.longitude, "8.50000");
        assert!((picker.view().center().y() - 53.123_456_7).abs() < f64::EPSILON);
        assert_eq!(picker.view().zoom(), 6);

        let fields = picker.drag_end(53.2, 8.6);
        assert_eq!(fields, FieldValues::from_position(53.2, 8.6));
        assert_eq!(picker.fields(), &fields);
        assert!((picker.marker().unwrap().longitude() - 8.6).abs() < f64::EPSILON);
        assert_eq!(picker.position(), Some((53.2, 8.6)));

        picker.reset();
        assert!(picker.marker().is_none());
        assert_eq!(picker.position(), None);
    }
}
