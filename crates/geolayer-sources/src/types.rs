use geolayer_core::{BoundingBox, Coordinate, GeoFeature};
use serde::{Deserialize, Serialize};

/// A geocoded anchor for a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub coordinate: Coordinate,
    /// `None` means callers should build their own default box around `coordinate`.
    pub bounding_box: Option<BoundingBox>,
    pub display_name: String,
}

impl Place {
    /// The geocoder's box, or a symmetric box of `offset_deg` around the anchor.
    pub fn region_or(&self, offset_deg: f64) -> BoundingBox {
        self.bounding_box
            .unwrap_or_else(|| BoundingBox::around(self.coordinate, offset_deg))
    }
}

/// Demographic indicator requested from the registries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DemographicMetric {
    #[default]
    Population,
    Density,
}

impl DemographicMetric {
    /// Map a free-form data type onto a metric; anything not about density is population.
    pub fn from_data_type(data_type: &str) -> Self {
        if data_type.to_lowercase().contains("densit") {
            Self::Density
        } else {
            Self::Population
        }
    }

    pub fn layer_type(&self) -> &'static str {
        match self {
            Self::Population => "population",
            Self::Density => "density",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            Self::Population => "people",
            Self::Density => "people/km²",
        }
    }

    /// Extensive values are split across cells; intensive values are replicated.
    pub fn is_extensive(&self) -> bool {
        matches!(self, Self::Population)
    }

    /// Thousands-separated integer for population, one decimal for density.
    pub fn format_value(&self, value: f64) -> String {
        match self {
            Self::Population => group_thousands(value.round() as i64),
            Self::Density => format!("{:.1}", value),
        }
    }
}

fn group_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if value < 0 {
        out.insert(0, '-');
    }
    out
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DemographicQuery {
    pub location: String,
    pub metric: DemographicMetric,
}

impl DemographicQuery {
    pub fn new(location: impl Into<String>, metric: DemographicMetric) -> Self {
        Self {
            location: location.into(),
            metric,
        }
    }
}

/// A single country-level value from a demographic registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemographicRecord {
    pub country: String,
    pub metric: DemographicMetric,
    pub value: f64,
    pub year: String,
    /// Registry that produced the value
    pub source: String,
}

/// Weather condition categories mapped from WMO codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WeatherCondition {
    #[default]
    Clear,
    PartlyCloudy,
    Cloudy,
    Fog,
    Drizzle,
    Rain,
    HeavyRain,
    Snow,
    Sleet,
    Thunderstorm,
}

impl WeatherCondition {
    /// Convert WMO weather code to WeatherCondition
    /// See: https://open-meteo.com/en/docs#weathervariables
    pub fn from_wmo_code(code: i32) -> Self {
        match code {
            0 => Self::Clear,
            1..=2 => Self::PartlyCloudy,
            3 => Self::Cloudy,
            45 | 48 => Self::Fog,
            51 | 53 | 55 => Self::Drizzle,
            56 | 57 => Self::Sleet, // Freezing drizzle
            61 | 63 | 80 => Self::Rain,
            65 | 81 | 82 => Self::HeavyRain,
            66 | 67 => Self::Sleet, // Freezing rain
            71 | 73 | 75 | 77 | 85 | 86 => Self::Snow,
            95 | 96 | 99 => Self::Thunderstorm,
            _ => Self::Clear, // Unknown codes default to clear
        }
    }

    /// Get a human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::Clear => "Clear",
            Self::PartlyCloudy => "Partly Cloudy",
            Self::Cloudy => "Cloudy",
            Self::Fog => "Fog",
            Self::Drizzle => "Drizzle",
            Self::Rain => "Rain",
            Self::HeavyRain => "Heavy Rain",
            Self::Snow => "Snow",
            Self::Sleet => "Sleet",
            Self::Thunderstorm => "Thunderstorm",
        }
    }

    /// Emoji used to annotate layer summaries
    pub fn emoji(&self) -> &'static str {
        match self {
            Self::Clear => "☀️",
            Self::PartlyCloudy => "⛅",
            Self::Cloudy => "☁️",
            Self::Fog => "🌫️",
            Self::Drizzle | Self::Rain | Self::HeavyRain => "🌧️",
            Self::Snow | Self::Sleet => "🌨️",
            Self::Thunderstorm => "⛈️",
        }
    }
}

/// Current conditions at a point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    pub temperature_c: f64,
    pub wind_speed_kmh: f64,
    pub precipitation_mm: f64,
    pub condition: WeatherCondition,
    pub observed_at: Option<String>,
}

/// Earthquake query outcome. An empty `events` list is a valid answer.
#[derive(Debug, Clone, PartialEq)]
pub struct SeismicReport {
    /// Number of matching events before the feature cap was applied
    pub total: usize,
    /// Point features ordered by descending magnitude
    pub events: Vec<GeoFeature>,
}

impl SeismicReport {
    pub fn strongest_magnitude(&self) -> Option<f64> {
        self.events
            .iter()
            .filter_map(|f| f.property("mag").and_then(|v| v.as_f64()))
            .fold(None, |max, mag| Some(max.map_or(mag, |m: f64| m.max(mag))))
    }
}

/// Semantic map-feature categories understood by the places adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaceTag {
    Parks,
    Gardens,
    Forests,
    Water,
    Rivers,
    Lakes,
    Buildings,
    Roads,
    Streets,
    Railway,
    Airports,
    Restaurants,
    Cafes,
    Shops,
    Schools,
    Hospitals,
    Sports,
}

impl PlaceTag {
    pub const ALL: [PlaceTag; 17] = [
        Self::Parks,
        Self::Gardens,
        Self::Forests,
        Self::Water,
        Self::Rivers,
        Self::Lakes,
        Self::Buildings,
        Self::Roads,
        Self::Streets,
        Self::Railway,
        Self::Airports,
        Self::Restaurants,
        Self::Cafes,
        Self::Shops,
        Self::Schools,
        Self::Hospitals,
        Self::Sports,
    ];

    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim().to_lowercase();
        Self::ALL.into_iter().find(|tag| tag.as_str() == value)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Parks => "parks",
            Self::Gardens => "gardens",
            Self::Forests => "forests",
            Self::Water => "water",
            Self::Rivers => "rivers",
            Self::Lakes => "lakes",
            Self::Buildings => "buildings",
            Self::Roads => "roads",
            Self::Streets => "streets",
            Self::Railway => "railway",
            Self::Airports => "airports",
            Self::Restaurants => "restaurants",
            Self::Cafes => "cafes",
            Self::Shops => "shops",
            Self::Schools => "schools",
            Self::Hospitals => "hospitals",
            Self::Sports => "sports",
        }
    }

    /// Overpass QL tag filter
    pub fn filter(&self) -> &'static str {
        match self {
            Self::Parks => "[leisure=park]",
            Self::Gardens => "[leisure=garden]",
            Self::Forests => "[landuse=forest]",
            Self::Water => "[natural=water]",
            Self::Rivers => "[waterway=river]",
            Self::Lakes => "[natural=water][water=lake]",
            Self::Buildings => "[building]",
            Self::Roads => "[highway~\"motorway|trunk|primary|secondary\"]",
            Self::Streets => "[highway~\"residential|service\"]",
            Self::Railway => "[railway=rail]",
            Self::Airports => "[aeroway=aerodrome]",
            Self::Restaurants => "[amenity=restaurant]",
            Self::Cafes => "[amenity=cafe]",
            Self::Shops => "[shop]",
            Self::Schools => "[amenity=school]",
            Self::Hospitals => "[amenity=hospital]",
            Self::Sports => "[leisure=sports_centre]",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlacesQuery {
    pub center: Coordinate,
    pub tag: PlaceTag,
    pub radius_m: u32,
}
