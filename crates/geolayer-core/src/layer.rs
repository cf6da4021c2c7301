//! Layer model shared by every crate: GeoJSON features plus descriptive metadata.
//!
//! A [`LayerResult`] serializes to the envelope consumed by the presentation
//! layer:
//!
//! ```json
//! {"type": "FeatureCollection", "features": [...], "metadata": {...}}
//! ```
//!
//! When `metadata.error` is true the `type` key is omitted and `features` is
//! always empty.

use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::{LayerError, LayerErrorKind};
use crate::geo::{BoundingBox, Coordinate};

/// GeoJSON position, always `[lon, lat]`.
pub type Position = [f64; 2];

/// Feature properties: string keys to JSON scalars.
pub type Properties = Map<String, Value>;

/// Geometry subset emitted by the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    Point(Position),
    LineString(Vec<Position>),
    Polygon(Vec<Vec<Position>>),
    /// Only produced by administrative subdivision sources.
    MultiPolygon(Vec<Vec<Vec<Position>>>),
}

impl Geometry {
    pub fn point(coordinate: Coordinate) -> Self {
        Geometry::Point(coordinate.to_position())
    }

    /// True when every ring of a polygonal geometry starts and ends on the same vertex.
    pub fn rings_closed(&self) -> bool {
        fn closed(ring: &[Position]) -> bool {
            ring.len() >= 4 && ring.first() == ring.last()
        }
        match self {
            Geometry::Polygon(rings) => rings.iter().all(|r| closed(r)),
            Geometry::MultiPolygon(polys) => polys.iter().flatten().all(|r| closed(r)),
            _ => true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
enum FeatureTag {
    #[default]
    Feature,
}

/// A GeoJSON feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoFeature {
    #[serde(rename = "type", default)]
    kind: FeatureTag,
    pub geometry: Geometry,
    #[serde(default)]
    pub properties: Properties,
}

impl GeoFeature {
    pub fn new(geometry: Geometry) -> Self {
        Self::with_properties(geometry, Properties::new())
    }

    pub fn with_properties(geometry: Geometry, properties: Properties) -> Self {
        Self {
            kind: FeatureTag::Feature,
            geometry,
            properties,
        }
    }

    /// Builder-style property insert.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }
}

/// Extra block attached to imagery layers, which carry no vector features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageryInfo {
    pub tile_url: String,
    pub bbox: BoundingBox,
    pub description: String,
}

/// Descriptive metadata for a layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerMetadata {
    /// Adapter that actually produced the data, not necessarily the requested source.
    pub source: String,
    pub layer_type: String,
    pub feature_count: usize,
    pub summary: String,
    pub center: Option<Coordinate>,
    pub error: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imagery: Option<ImageryInfo>,
}

/// Normalized output of the aggregation pipeline. Read-only once built.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerResult {
    features: Vec<GeoFeature>,
    metadata: LayerMetadata,
    error_kind: Option<LayerErrorKind>,
}

impl LayerResult {
    /// Successful layer; `featureCount` is derived from `features`.
    pub fn success(
        source: impl Into<String>,
        layer_type: impl Into<String>,
        summary: impl Into<String>,
        center: Option<Coordinate>,
        features: Vec<GeoFeature>,
    ) -> Self {
        let metadata = LayerMetadata {
            source: source.into(),
            layer_type: layer_type.into(),
            feature_count: features.len(),
            summary: summary.into(),
            center,
            error: false,
            imagery: None,
        };
        Self {
            features,
            metadata,
            error_kind: None,
        }
    }

    /// Failed layer: no features, `error=true`, summary taken from the error.
    pub fn failure(
        source: impl Into<String>,
        layer_type: impl Into<String>,
        error: &LayerError,
    ) -> Self {
        Self {
            features: Vec::new(),
            metadata: LayerMetadata {
                source: source.into(),
                layer_type: layer_type.into(),
                feature_count: 0,
                summary: error.summary(),
                center: None,
                error: true,
                imagery: None,
            },
            error_kind: Some(error.kind()),
        }
    }

    pub fn with_imagery(mut self, imagery: ImageryInfo) -> Self {
        self.metadata.imagery = Some(imagery);
        self
    }

    pub fn features(&self) -> &[GeoFeature] {
        &self.features
    }

    pub fn metadata(&self) -> &LayerMetadata {
        &self.metadata
    }

    pub fn is_error(&self) -> bool {
        self.metadata.error
    }

    /// Internal taxonomy of the failure, for logging and assertions.
    pub fn error_kind(&self) -> Option<LayerErrorKind> {
        self.error_kind
    }
}

#[derive(Serialize)]
struct Envelope<'a> {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    kind: Option<&'static str>,
    features: &'a [GeoFeature],
    metadata: &'a LayerMetadata,
}

impl Serialize for LayerResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        Envelope {
            kind: (!self.metadata.error).then_some("FeatureCollection"),
            features: &self.features,
            metadata: &self.metadata,
        }
        .serialize(serializer)
    }
}
