use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::ConfigError;

/// Highest H3 resolution.
pub const MAX_GRID_RESOLUTION: u8 = 15;

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Add an error
    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Add a warning
    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        if self.errors.is_empty() {
            return String::new();
        }
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub grid: GridConfig,

    #[serde(default)]
    pub seismic: SeismicConfig,

    #[serde(default)]
    pub places: PlacesConfig,

    #[serde(default)]
    pub geocoder: GeocoderConfig,

    #[serde(default)]
    pub endpoints: EndpointsConfig,

    #[serde(default)]
    pub timeouts: TimeoutsConfig,

    #[serde(default)]
    pub dispatch: DispatchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Lifetime of a cached layer in seconds
    pub ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_seconds: 1800 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridConfig {
    /// H3 resolution for country/region scale layers
    pub regional_resolution: u8,

    /// H3 resolution for local weather grids
    pub local_resolution: u8,

    /// Maximum number of cells emitted per layer
    pub max_cells: usize,

    /// Minimum subdivision count before apportionment is preferred over the hex grid
    pub min_subdivisions: usize,

    /// Half-size in degrees of the default box around a regional anchor
    pub regional_box_offset_deg: f64,

    /// Half-size in degrees of the default box around a local anchor
    pub local_box_offset_deg: f64,

    /// Look up administrative subdivisions before falling back to the hex grid
    #[serde(default = "default_true")]
    pub subdivisions: bool,
}

fn default_true() -> bool {
    true
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            regional_resolution: 4,
            local_resolution: 5,
            max_cells: 150,
            min_subdivisions: 3,
            regional_box_offset_deg: 5.0,
            local_box_offset_deg: 1.25,
            subdivisions: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeismicConfig {
    pub radius_km: u32,
    pub window_days: u32,
    pub min_magnitude: f64,
    pub max_events: usize,
}

impl Default for SeismicConfig {
    fn default() -> Self {
        Self {
            radius_km: 500,
            window_days: 30,
            min_magnitude: 2.5,
            max_events: 50,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacesConfig {
    /// Search radius around the anchor in meters
    pub radius_m: u32,

    /// Maximum number of raw elements converted to features
    pub max_elements: usize,

    /// Tag used when the requested data type is not a known place tag
    pub default_tag: String,
}

impl Default for PlacesConfig {
    fn default() -> Self {
        Self {
            radius_m: 5000,
            max_elements: 300,
            default_tag: "buildings".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocoderConfig {
    /// Minimum spacing between upstream geocoding calls
    pub min_interval_ms: u64,

    /// User-Agent sent to the geocoding service
    pub user_agent: String,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: 1000,
            user_agent: "Geolayer/0.1.0".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointsConfig {
    pub nominatim_url: String,
    pub worldbank_url: String,
    pub rest_countries_url: String,
    pub open_meteo_url: String,
    pub usgs_url: String,
    pub overpass_url: String,
    pub natural_earth_url: String,
    /// XYZ template with `{z}`, `{y}` and `{x}` placeholders
    pub imagery_tile_url: String,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            nominatim_url: "https://nominatim.openstreetmap.org".to_string(),
            worldbank_url: "https://api.worldbank.org/v2".to_string(),
            rest_countries_url: "https://restcountries.com/v3.1".to_string(),
            open_meteo_url: "https://api.open-meteo.com/v1".to_string(),
            usgs_url: "https://earthquake.usgs.gov/fdsnws/event/1".to_string(),
            overpass_url: "https://overpass-api.de/api/interpreter".to_string(),
            natural_earth_url:
                "https://raw.githubusercontent.com/nvkelso/natural-earth-vector/master/geojson"
                    .to_string(),
            imagery_tile_url:
                "https://server.arcgisonline.com/ArcGIS/rest/services/World_Imagery/MapServer/tile/{z}/{y}/{x}"
                    .to_string(),
        }
    }
}

/// Per-upstream request timeouts in seconds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutsConfig {
    pub geocoder_secs: u64,
    pub demographic_secs: u64,
    pub weather_secs: u64,
    pub seismic_secs: u64,
    pub places_secs: u64,
    pub subdivision_secs: u64,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            geocoder_secs: 10,
            demographic_secs: 15,
            weather_secs: 10,
            seismic_secs: 15,
            places_secs: 30,
            subdivision_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Report unrecognized sources as errors instead of routing them to the places layer
    #[serde(default)]
    pub strict: bool,
}

impl Config {
    /// Load configuration from file, creating default if it doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            let config = Self::default();
            config.save_to(&config_path)?;
            return Ok(config);
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from an explicit path
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()).into());
        }

        let contents =
            std::fs::read_to_string(path).context("Failed to read config file")?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(e.to_string()))
            .context("Failed to parse config file")?;

        Ok(config)
    }

    /// Validate a loaded configuration
    ///
    /// Logs warnings and returns an error if validation fails with critical errors.
    pub fn into_validated(self) -> Result<(Self, ValidationResult)> {
        let validation = self.validate();

        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()).into());
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((self, validation))
    }

    /// Validate the configuration
    ///
    /// Returns a ValidationResult containing any errors or warnings.
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        let endpoints = [
            ("endpoints.nominatim_url", &self.endpoints.nominatim_url),
            ("endpoints.worldbank_url", &self.endpoints.worldbank_url),
            ("endpoints.rest_countries_url", &self.endpoints.rest_countries_url),
            ("endpoints.open_meteo_url", &self.endpoints.open_meteo_url),
            ("endpoints.usgs_url", &self.endpoints.usgs_url),
            ("endpoints.overpass_url", &self.endpoints.overpass_url),
            ("endpoints.natural_earth_url", &self.endpoints.natural_earth_url),
        ];
        for (field, url) in endpoints {
            self.validate_url(url, field, &mut result);
        }

        let tile = &self.endpoints.imagery_tile_url;
        if !(tile.contains("{z}") && tile.contains("{x}") && tile.contains("{y}")) {
            result.add_error(
                "endpoints.imagery_tile_url",
                "Tile URL must contain {z}, {x} and {y} placeholders",
            );
        }

        if self.cache.ttl_seconds == 0 {
            result.add_warning("cache.ttl_seconds", "Caching disabled (0 seconds)");
        }

        for (field, resolution) in [
            ("grid.regional_resolution", self.grid.regional_resolution),
            ("grid.local_resolution", self.grid.local_resolution),
        ] {
            if resolution > MAX_GRID_RESOLUTION {
                result.add_error(
                    field,
                    format!("Resolution must be 0-{}, got {}", MAX_GRID_RESOLUTION, resolution),
                );
            } else if resolution > 8 {
                result.add_warning(field, "Fine resolutions produce very small cells");
            }
        }

        if self.grid.max_cells == 0 {
            result.add_error("grid.max_cells", "Cell cap must be greater than 0");
        }

        for (field, offset) in [
            ("grid.regional_box_offset_deg", self.grid.regional_box_offset_deg),
            ("grid.local_box_offset_deg", self.grid.local_box_offset_deg),
        ] {
            if !(offset > 0.0 && offset <= 45.0) {
                result.add_error(field, "Box offset must be in (0, 45] degrees");
            }
        }

        if self.seismic.max_events == 0 {
            result.add_error("seismic.max_events", "Event cap must be greater than 0");
        }
        if self.seismic.radius_km == 0 || self.seismic.radius_km > 20_001 {
            result.add_error("seismic.radius_km", "Radius must be 1-20001 km");
        }
        if self.seismic.window_days == 0 {
            result.add_error("seismic.window_days", "Time window must be at least one day");
        }

        if self.places.max_elements == 0 {
            result.add_error("places.max_elements", "Element cap must be greater than 0");
        }
        if self.places.radius_m == 0 {
            result.add_error("places.radius_m", "Radius must be greater than 0");
        }

        if self.geocoder.min_interval_ms < 1000 {
            result.add_warning(
                "geocoder.min_interval_ms",
                "Spacing below 1000 ms violates the Nominatim usage policy",
            );
        }
        if self.geocoder.user_agent.trim().is_empty() {
            result.add_error("geocoder.user_agent", "User-Agent must not be empty");
        }

        result
    }

    /// Validate a URL field
    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Save configuration to the given path
    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(config_path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Get the path to the configuration file
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("geolayer");

        Ok(config_dir.join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_default_config() {
        let config = Config::default();
        let result = config.validate();
        assert!(result.is_valid(), "Default config should be valid: {:?}", result.errors);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_defaults_match_service_contract() {
        let config = Config::default();
        assert_eq!(config.cache.ttl_seconds, 1800);
        assert_eq!(config.grid.regional_resolution, 4);
        assert_eq!(config.grid.local_resolution, 5);
        assert_eq!(config.seismic.max_events, 50);
        assert_eq!(config.seismic.min_magnitude, 2.5);
        assert_eq!(config.places.max_elements, 300);
        assert!(!config.dispatch.strict);
    }

    #[test]
    fn test_invalid_url() {
        let mut config = Config::default();
        config.endpoints.usgs_url = "not-a-url".to_string();
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.field == "endpoints.usgs_url"));
    }

    #[test]
    fn test_invalid_url_scheme() {
        let mut config = Config::default();
        config.endpoints.overpass_url = "ftp://overpass.example".to_string();
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.message.contains("http or https")));
    }

    #[test]
    fn test_resolution_out_of_range() {
        let mut config = Config::default();
        config.grid.local_resolution = 16;
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.field == "grid.local_resolution"));
    }

    #[test]
    fn test_zero_caps_are_errors() {
        let mut config = Config::default();
        config.grid.max_cells = 0;
        config.places.max_elements = 0;
        let result = config.validate();
        assert!(result.errors.iter().any(|e| e.field == "grid.max_cells"));
        assert!(result.errors.iter().any(|e| e.field == "places.max_elements"));
    }

    #[test]
    fn test_fast_geocoder_is_warning() {
        let mut config = Config::default();
        config.geocoder.min_interval_ms = 200;
        let result = config.validate();
        assert!(result.is_valid());
        assert!(result.warnings.iter().any(|w| w.field == "geocoder.min_interval_ms"));
    }

    #[test]
    fn test_tile_url_placeholders() {
        let mut config = Config::default();
        config.endpoints.imagery_tile_url = "https://tiles.example/{z}.png".to_string();
        assert!(!config.validate().is_valid());
    }

    #[test]
    fn test_into_validated_rejects_errors() {
        let mut config = Config::default();
        config.grid.max_cells = 0;
        let err = config.into_validated().unwrap_err();
        assert!(err.to_string().contains("grid.max_cells"));
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.cache.ttl_seconds = 60;
        config.dispatch.strict = true;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.cache.ttl_seconds, 60);
        assert!(loaded.dispatch.strict);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[cache]\nttl_seconds = 10\n").unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.cache.ttl_seconds, 10);
        assert_eq!(loaded.grid.max_cells, 150);
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load_from(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_validation_result_error_summary() {
        let mut result = ValidationResult::default();
        result.add_error("field1", "error1");
        result.add_error("field2", "error2");
        let summary = result.error_summary();
        assert!(summary.contains("field1"));
        assert!(summary.contains("field2"));
    }
}
