//! Routing of free-form source names onto adapter families.

use geolayer_core::LayerError;
use geolayer_sources::{DemographicMetric, PlaceTag};

/// Adapter family that serves a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Demographic,
    Weather,
    Seismic,
    Imagery,
    Places,
    Geocoding,
}

impl SourceKind {
    /// Recognize a source alias, ignoring case and surrounding whitespace.
    pub fn parse(source: &str) -> Option<Self> {
        let kind = match source.trim().to_lowercase().as_str() {
            "worldbank" | "world_bank" | "rest_countries" | "restcountries" | "population"
            | "density" | "demographic" | "demographics" => Self::Demographic,
            "weather" | "open_meteo" | "openmeteo" => Self::Weather,
            "earthquakes" | "earthquake" | "seismic" | "usgs" => Self::Seismic,
            "satellite" | "imagery" => Self::Imagery,
            "openstreetmap" | "osm" | "overpass" | "places" => Self::Places,
            "geocoding" | "geocode" => Self::Geocoding,
            _ => return None,
        };
        Some(kind)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Demographic => "demographic",
            Self::Weather => "weather",
            Self::Seismic => "seismic",
            Self::Imagery => "imagery",
            Self::Places => "places",
            Self::Geocoding => "geocoding",
        }
    }

    /// `layerType` reported for this family and data type.
    pub fn layer_type(&self, data_type: &str, default_tag: PlaceTag) -> String {
        match self {
            Self::Demographic => DemographicMetric::from_data_type(data_type).layer_type().to_string(),
            Self::Weather => "weather".to_string(),
            Self::Seismic => "earthquakes".to_string(),
            Self::Imagery => "satellite".to_string(),
            Self::Places => PlaceTag::parse(data_type)
                .unwrap_or(default_tag)
                .as_str()
                .to_string(),
            Self::Geocoding => "location".to_string(),
        }
    }
}

/// Outcome of source recognition. Unknown sources stay detectable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    Known(SourceKind),
    Unknown(String),
}

impl Dispatch {
    pub fn resolve(source: &str) -> Self {
        match SourceKind::parse(source) {
            Some(kind) => Self::Known(kind),
            None => Self::Unknown(source.to_string()),
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown(_))
    }

    /// Pick the adapter family. Lenient routing sends unknown sources to the
    /// places layer; strict routing reports them.
    pub fn route(&self, strict: bool) -> Result<SourceKind, LayerError> {
        match self {
            Self::Known(kind) => Ok(*kind),
            Self::Unknown(source) if strict => Err(LayerError::UnknownSource(source.clone())),
            Self::Unknown(source) => {
                tracing::warn!("Unknown source {:?}, routing to places", source);
                Ok(SourceKind::Places)
            }
        }
    }
}
