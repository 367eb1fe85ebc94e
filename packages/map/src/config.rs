//! Map and application settings.
//!
//! One TOML file carries both the backend connection (`[client]`) and the
//! map behaviour (`[map]`). The built-in file is embedded at compile time;
//! [`CONFIG_PATH_ENV`] points at a replacement.

use std::path::{Path, PathBuf};

use ghost_net_client::ClientConfig;
use ghost_net_client::config::ConfigError;
use ghost_net_map_models::{DEFAULT_CENTER, DEFAULT_ZOOM, MapView};
use ghost_net_report_models::{check_latitude, check_longitude};
use ghost_net_spread::{DEFAULT_PRECISION, DEFAULT_RADIUS_METERS, MAX_PRECISION, SpreadOptions};
use serde::{Deserialize, Serialize};

/// Environment variable naming a settings file.
pub const CONFIG_PATH_ENV: &str = "GHOST_NET_CONFIG";

/// Settings used when no file is given.
const DEFAULT_SETTINGS: &str = include_str!("../config/default.toml");

/// Marker layout and viewport behaviour of a map view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapConfig {
    /// Decimal digits used to group coincident reports.
    #[serde(default = "default_precision")]
    pub precision: u32,
    /// Radius overlapping reports are spread onto.
    #[serde(default = "default_radius_meters")]
    pub radius_meters: f64,
    /// Fit the viewport to the markers after every refresh.
    #[serde(default)]
    pub fit_bounds: bool,
    /// Initial centre as `[latitude, longitude]`.
    #[serde(default = "default_center")]
    pub center: [f64; 2],
    /// Initial zoom level.
    #[serde(default = "default_zoom")]
    pub zoom: u8,
}

const fn default_precision() -> u32 {
    DEFAULT_PRECISION
}

const fn default_radius_meters() -> f64 {
    DEFAULT_RADIUS_METERS
}

const fn default_center() -> [f64; 2] {
    [DEFAULT_CENTER.0, DEFAULT_CENTER.1]
}

const fn default_zoom() -> u8 {
    DEFAULT_ZOOM
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            precision: default_precision(),
            radius_meters: default_radius_meters(),
            fit_bounds: false,
            center: default_center(),
            zoom: default_zoom(),
        }
    }
}

impl MapConfig {
    /// Checks values that parse but cannot be used: a negative or non-finite
    /// radius, a precision beyond [`MAX_PRECISION`], or a centre outside
    /// WGS84 bounds.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.radius_meters.is_finite() || self.radius_meters < 0.0 {
            return Err(ConfigError::Invalid {
                field: "map.radius_meters",
                message: format!("{} is not a non-negative distance", self.radius_meters),
            });
        }
        if self.precision > MAX_PRECISION {
            return Err(ConfigError::Invalid {
                field: "map.precision",
                message: format!("{} exceeds the maximum of {MAX_PRECISION}", self.precision),
            });
        }
        let [latitude, longitude] = self.center;
        if let Err(e) = check_latitude(latitude).and_then(|_| check_longitude(longitude)) {
            return Err(ConfigError::Invalid {
                field: "map.center",
                message: e.to_string(),
            });
        }
        Ok(())
    }

    /// Overlap resolver settings derived from this config.
    #[must_use]
    pub const fn spread_options(&self) -> SpreadOptions {
        SpreadOptions {
            precision: self.precision,
            radius_meters: self.radius_meters,
        }
    }

    /// A fresh view at the configured centre and zoom.
    #[must_use]
    pub fn new_view(&self, name: impl Into<String>) -> MapView {
        MapView::with_view(name, self.center[0], self.center[1], self.zoom)
    }
}

/// Everything read from a settings file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Backend connection.
    #[serde(default)]
    pub client: ClientConfig,
    /// Map behaviour.
    #[serde(default)]
    pub map: MapConfig,
}

impl Settings {
    /// Parses a settings file's contents.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Toml`] if the text is not valid TOML or a
    /// field has the wrong type, and [`ConfigError::Invalid`] if a `[map]`
    /// value is out of range.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let settings: Self = toml::from_str(text)?;
        settings.map.validate()?;
        Ok(settings)
    }

    /// Parses the built-in settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Toml`] if the embedded file is broken.
    pub fn embedded() -> Result<Self, ConfigError> {
        Self::from_toml_str(DEFAULT_SETTINGS)
    }

    /// Loads settings from `path`, else from [`CONFIG_PATH_ENV`], else the
    /// built-in file, then applies environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path.map(Path::to_path_buf).or_else(|| {
            std::env::var_os(CONFIG_PATH_ENV)
                .filter(|p| !p.is_empty())
                .map(PathBuf::from)
        });

        let mut settings = match path {
            Some(path) => {
                log::info!("Loading settings from {}", path.display());
                Self::from_toml_str(&std::fs::read_to_string(&path)?)?
            }
            None => Self::embedded()?,
        };

        settings.client = settings.client.with_env_overrides();
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_settings_match_defaults() {
        assert_eq!(Settings::embedded().unwrap(), Settings::default());
    }

    #[test]
    fn partial_map_table_keeps_remaining_defaults() {
        let settings = Settings::from_toml_str(
            r"
            [map]
            radius_meters = 50.0
            fit_bounds = true
            ",
        )
        .unwrap();

        assert_eq!(settings.client, ClientConfig::default());
        assert!(settings.map.fit_bounds);
        assert_eq!(settings.map.precision, 5);
        assert!((settings.map.radius_meters - 50.0).abs() < f64::EPSILON);
        assert_eq!(settings.map.zoom, 6);
    }

    #[test]
    fn map_config_builds_view_and_spread_options() {
        let config = MapConfig {
            center: [54.0, 9.5],
            zoom: 8,
            precision: 4,
            ..MapConfig::default()
        };

        let view = config.new_view("main");
        assert_eq!(view.name(), "main");
        assert_eq!(view.zoom(), 8);
        assert!((view.center().y() - 54.0).abs() < f64::EPSILON);
        assert!((view.center().x() - 9.5).abs() < f64::EPSILON);

        let options = config.spread_options();
        assert_eq!(options.precision, 4);
        assert!((options.radius_meters - 30.0).abs() < f64::EPSILON);
    }

    #[test]
    fn unusable_map_values_are_rejected() {
        for (text, expected) in [
            ("[map]\nradius_meters = nan", "map.radius_meters"),
            ("[map]\nradius_meters = inf", "map.radius_meters"),
            ("[map]\nradius_meters = -5.0", "map.radius_meters"),
            ("[map]\nprecision = 99", "map.precision"),
            ("[map]\ncenter = [95.0, 10.0]", "map.center"),
            ("[map]\ncenter = [54.0, nan]", "map.center"),
        ] {
            match Settings::from_toml_str(text) {
                Err(ConfigError::Invalid { field, .. }) => assert_eq!(field, expected, "{text}"),
                other => panic!("{text}: expected Invalid, got {other:?}"),
            }
        }

        let zero = Settings::from_toml_str("[map]\nradius_meters = 0.0\nprecision = 15").unwrap();
        assert_eq!(zero.map.precision, MAX_PRECISION);
    }

    #[test]
    fn invalid_file_fails_to_load() {
        let path = std::env::temp_dir().join(format!(
            "ghost_net_invalid_settings_{}.toml",
            std::process::id()
        ));
        std::fs::write(&path, "[map]\nradius_meters = nan\n").unwrap();

        let result = Settings::load(Some(&path));
        std::fs::remove_file(&path).unwrap();

        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn explicit_path_is_read() {
        let path = std::env::temp_dir().join(format!(
            "ghost_net_settings_{}.toml",
            std::process::id()
        ));
        std::fs::write(&path, "[client]\nbase_url = \"http://nets.test/api\"\n").unwrap();

        let settings = Settings::load(Some(&path));
        std::fs::remove_file(&path).unwrap();
        let settings = settings.unwrap();

        assert_eq!(settings.client.reports_path, "/reports");
        if std::env::var_os(ghost_net_client::config::API_URL_ENV).is_none() {
            assert_eq!(settings.client.base_url, "http://nets.test/api");
        }
        assert_eq!(settings.map, MapConfig::default());
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let missing = Path::new("/nonexistent/ghost_net/settings.toml");
        assert!(matches!(
            Settings::load(Some(missing)),
            Err(ConfigError::Io(_))
        ));
    }
}
