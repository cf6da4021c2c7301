//! USGS FDSN event service: recent earthquakes around an anchor point.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use geolayer_core::{Coordinate, GeoFeature, Geometry, SeismicConfig};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::http::{build_client, normalize_base, send_json, USER_AGENT};
use crate::provider::ProviderAdapter;
use crate::types::{Place, SeismicReport};

pub const USGS_URL: &str = "https://earthquake.usgs.gov/fdsnws/event/1";
const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Debug, Deserialize)]
struct EventCollection {
    #[serde(default)]
    features: Vec<EventFeature>,
}

#[derive(Debug, Deserialize)]
struct EventFeature {
    id: Option<String>,
    properties: EventProperties,
    geometry: EventGeometry,
}

#[derive(Debug, Deserialize)]
struct EventProperties {
    mag: Option<f64>,
    place: Option<String>,
    /// Milliseconds since the epoch
    time: Option<i64>,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EventGeometry {
    /// `[lon, lat, depth_km]`
    coordinates: Vec<f64>,
}

impl EventFeature {
    fn into_feature(self) -> Option<GeoFeature> {
        let [lon, lat, rest @ ..] = self.geometry.coordinates.as_slice() else {
            return None;
        };
        let point = Coordinate::new(*lat, *lon).ok()?;

        let mut feature = GeoFeature::new(Geometry::point(point));
        if let Some(id) = self.id {
            feature = feature.with_property("id", id);
        }
        if let Some(mag) = self.properties.mag {
            feature = feature.with_property("mag", mag);
        }
        if let Some(place) = self.properties.place {
            feature = feature.with_property("place", place);
        }
        if let Some(time) = self.properties.time {
            feature = feature.with_property("time", time);
        }
        if let Some(url) = self.properties.url {
            feature = feature.with_property("url", url);
        }
        if let Some(depth) = rest.first() {
            feature = feature.with_property("depth_km", *depth);
        }
        Some(feature)
    }
}

fn magnitude(feature: &GeoFeature) -> f64 {
    feature
        .property("mag")
        .and_then(|v| v.as_f64())
        .unwrap_or(f64::NEG_INFINITY)
}

pub struct UsgsProvider {
    client: Client,
    base_url: String,
    limits: SeismicConfig,
}

impl UsgsProvider {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout, USER_AGENT)?,
            base_url: normalize_base(base_url),
            limits: SeismicConfig::default(),
        })
    }


    /// Override radius, window, magnitude floor and feature cap.
    pub fn with_limits(mut self, limits: SeismicConfig) -> Self {
        self.limits = limits;
        self
    }

}

#[async_trait]
impl ProviderAdapter for UsgsProvider {
    type Query = Place;
    type Record = SeismicReport;

    fn name(&self) -> &str {
        "USGS"
    }

    async fn fetch(&self, place: &Place) -> Option<SeismicReport> {
        let end = Utc::now();
        let start = end - ChronoDuration::days(i64::from(self.limits.window_days));

        let url = format!("{}/query", self.base_url);
        let request = self.client.get(&url).query(&[
            ("format", "geojson".to_string()),
            ("starttime", start.format(TIME_FORMAT).to_string()),
            ("endtime", end.format(TIME_FORMAT).to_string()),
            ("latitude", place.coordinate.latitude.to_string()),
            ("longitude", place.coordinate.longitude.to_string()),
            ("maxradiuskm", self.limits.radius_km.to_string()),
            ("minmagnitude", self.limits.min_magnitude.to_string()),
            ("orderby", "magnitude".to_string()),
        ]);

        let collection: EventCollection = match send_json(request).await {
            Ok(collection) => collection,
            Err(e) => {
                tracing::warn!("USGS query near {} failed: {}", place.display_name, e);
                return None;
            }
        };

        let mut events: Vec<GeoFeature> = collection
            .features
            .into_iter()
            .filter_map(EventFeature::into_feature)
            .collect();
        let total = events.len();

        events.sort_by(|a, b| magnitude(b).total_cmp(&magnitude(a)));
        events.truncate(self.limits.max_events);

        tracing::debug!("USGS: {} events near {}, keeping {}", total, place.display_name, events.len());
        Some(SeismicReport { total, events })
    }
}
