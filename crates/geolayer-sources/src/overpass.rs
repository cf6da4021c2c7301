//! OpenStreetMap map features via the Overpass API.

use anyhow::Result;
use async_trait::async_trait;
use geolayer_core::{GeoFeature, Geometry, Position, Properties};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use crate::http::{build_client, send_json, USER_AGENT};
use crate::provider::ProviderAdapter;
use crate::types::PlacesQuery;

pub const OVERPASS_URL: &str = "https://overpass-api.de/api/interpreter";
const SERVER_TIMEOUT_SECS: u64 = 25;
const DEFAULT_MAX_ELEMENTS: usize = 300;

#[derive(Debug, Deserialize)]
struct OverpassResponse {
    #[serde(default)]
    elements: Vec<OsmElement>,
}

/// Raw Overpass element as returned by `out geom`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OsmElement {
    Node {
        lat: f64,
        lon: f64,
        #[serde(default)]
        tags: HashMap<String, String>,
    },
    Way {
        #[serde(default)]
        geometry: Vec<OsmVertex>,
        #[serde(default)]
        tags: HashMap<String, String>,
    },
    Relation {},
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct OsmVertex {
    pub lat: f64,
    pub lon: f64,
}

fn to_properties(tags: HashMap<String, String>) -> Properties {
    tags.into_iter().map(|(k, v)| (k, v.into())).collect()
}

/// Convert at most `cap` elements into features.
///
/// Nodes become points; ways become polygons when closed (at least three
/// vertices, first equals last) and line strings otherwise. Ways with fewer
/// than two vertices and all relations are skipped.
pub fn elements_to_features(elements: Vec<OsmElement>, cap: usize) -> Vec<GeoFeature> {
    elements
        .into_iter()
        .take(cap)
        .filter_map(|element| match element {
            OsmElement::Node { lat, lon, tags } => Some(GeoFeature::with_properties(
                Geometry::Point([lon, lat]),
                to_properties(tags),
            )),
            OsmElement::Way { geometry, tags } => {
                let coords: Vec<Position> = geometry.iter().map(|v| [v.lon, v.lat]).collect();
                if coords.len() < 2 {
                    return None;
                }
                let closed = coords.len() >= 3 && coords.first() == coords.last();
                let geometry = if closed {
                    Geometry::Polygon(vec![coords])
                } else {
                    Geometry::LineString(coords)
                };
                Some(GeoFeature::with_properties(geometry, to_properties(tags)))
            }
            OsmElement::Relation {} => None,
        })
        .collect()
}

pub struct OverpassProvider {
    client: Client,
    url: String,
    max_elements: usize,
}

impl OverpassProvider {
    /// `url` is the full interpreter endpoint.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout, USER_AGENT)?,
            url: url.into(),
            max_elements: DEFAULT_MAX_ELEMENTS,
        })
    }


    pub fn with_max_elements(mut self, max_elements: usize) -> Self {
        self.max_elements = max_elements;
        self
    }

    fn build_query(query: &PlacesQuery) -> String {
        let filter = query.tag.filter();
        let around = format!(
            "(around:{},{},{})",
            query.radius_m, query.center.latitude, query.center.longitude
        );
        format!(
            "[out:json][timeout:{SERVER_TIMEOUT_SECS}];(node{filter}{around};way{filter}{around};relation{filter}{around};);out geom;"
        )
    }
}

#[async_trait]
impl ProviderAdapter for OverpassProvider {
    type Query = PlacesQuery;
    type Record = Vec<GeoFeature>;

    fn name(&self) -> &str {
        "OpenStreetMap"
    }

    async fn fetch(&self, query: &PlacesQuery) -> Option<Vec<GeoFeature>> {
        let body = Self::build_query(query);
        tracing::debug!("Overpass query: {}", body);

        let request = self.client.post(&self.url).body(body);
        match send_json::<OverpassResponse>(request).await {
            Ok(response) => {
                let features = elements_to_features(response.elements, self.max_elements);
                tracing::info!("Overpass: {} {} features", features.len(), query.tag.as_str());
                Some(features)
            }
            Err(e) => {
                tracing::warn!("Overpass query for {} failed: {}", query.tag.as_str(), e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PlaceTag;
    use geolayer_core::Coordinate;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn vertex(lat: f64, lon: f64) -> OsmVertex {
        OsmVertex { lat, lon }
    }

    fn way(points: &[(f64, f64)]) -> OsmElement {
        OsmElement::Way {
            geometry: points.iter().map(|&(lat, lon)| vertex(lat, lon)).collect(),
            tags: HashMap::new(),
        }
    }

    #[test]
    fn test_element_conversion() {
        let mut tags = HashMap::new();
        tags.insert("name".to_string(), "Ueno Park".to_string());
        let elements = vec![
            OsmElement::Node { lat: 35.7, lon: 139.7, tags },
            way(&[(0.0, 0.0), (0.0, 1.0), (1.0, 1.0), (0.0, 0.0)]),
            way(&[(0.0, 0.0), (0.0, 1.0), (1.0, 1.0)]),
            way(&[(0.0, 0.0)]),
            OsmElement::Relation {},
        ];

        let features = elements_to_features(elements, 300);
        assert_eq!(features.len(), 3);
        assert_eq!(features[0].geometry, Geometry::Point([139.7, 35.7]));
        assert_eq!(
            features[0].property("name").and_then(|v| v.as_str()),
            Some("Ueno Park")
        );
        assert!(matches!(features[1].geometry, Geometry::Polygon(_)));
        assert!(features[1].geometry.rings_closed());
        assert!(matches!(&features[2].geometry, Geometry::LineString(c) if c.len() == 3));
    }

    #[test]
    fn test_cap_applies_before_filtering() {
        let elements = vec![OsmElement::Relation {}, OsmElement::Relation {}, way(&[(0.0, 0.0), (1.0, 1.0)])];
        assert!(elements_to_features(elements.clone(), 2).is_empty());
        assert_eq!(elements_to_features(elements, 3).len(), 1);
    }

    #[test]
    fn test_query_text() {
        let query = PlacesQuery {
            center: Coordinate::new(48.85, 2.35).unwrap(),
            tag: PlaceTag::Parks,
            radius_m: 5000,
        };
        let text = OverpassProvider::build_query(&query);
        assert!(text.starts_with("[out:json][timeout:25];"));
        assert!(text.contains("node[leisure=park](around:5000,48.85,2.35);"));
        assert!(text.contains("relation[leisure=park]"));
        assert!(text.ends_with("out geom;"));
    }

    #[tokio::test]
    async fn test_fetch_posts_query() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/interpreter"))
            .and(body_string_contains("[amenity=cafe]"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "version": 0.6,
                "elements": [
                    {"type": "node", "id": 1, "lat": 48.86, "lon": 2.34, "tags": {"amenity": "cafe"}},
                    {"type": "relation", "id": 2, "members": []}
                ]
            })))
            .mount(&server)
            .await;

        let provider = OverpassProvider::new(
            format!("{}/api/interpreter", server.uri()),
            Duration::from_secs(5),
        )
        .unwrap();
        let query = PlacesQuery {
            center: Coordinate::new(48.85, 2.35).unwrap(),
            tag: PlaceTag::Cafes,
            radius_m: 1000,
        };
        let features = provider.fetch(&query).await.unwrap();
        assert_eq!(features.len(), 1);
    }

    #[tokio::test]
    async fn test_rate_limited_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let provider = OverpassProvider::new(server.uri(), Duration::from_secs(5)).unwrap();
        let query = PlacesQuery {
            center: Coordinate::new(48.85, 2.35).unwrap(),
            tag: PlaceTag::Buildings,
            radius_m: 1000,
        };
        assert!(provider.fetch(&query).await.is_none());
    }
}
