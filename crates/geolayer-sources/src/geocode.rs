//! Forward geocoding: convert place names to an anchor coordinate and box.
//! Uses Nominatim (OpenStreetMap) - free, no API key required, at most one
//! request per second.

use anyhow::Result;
use async_trait::async_trait;
use geolayer_core::{BoundingBox, Coordinate, NetworkError};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::http::{build_client, normalize_base, send_json};
use crate::types::Place;

pub const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("No match for {0:?}")]
    NotFound(String),

    #[error("Geocoding upstream error: {0}")]
    Upstream(#[from] NetworkError),
}

impl GeocodeError {
    /// Stable reason code for logs.
    pub fn reason(&self) -> &'static str {
        match self {
            GeocodeError::NotFound(_) => "not_found",
            GeocodeError::Upstream(_) => "upstream_error",
        }
    }
}

/// Anything that can turn a place name into a [`Place`].
#[async_trait]
pub trait PlaceResolver: Send + Sync {
    async fn resolve(&self, place_name: &str) -> Result<Place, GeocodeError>;
}

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
    /// `[min_lat, max_lat, min_lon, max_lon]` as strings
    #[serde(default)]
    boundingbox: Option<Vec<String>>,
    display_name: Option<String>,
}

impl NominatimPlace {
    fn into_place(self, query: &str) -> Option<Place> {
        let lat = self.lat.parse::<f64>().ok()?;
        let lon = self.lon.parse::<f64>().ok()?;
        let coordinate = Coordinate::new(lat, lon).ok()?;

        let bounding_box = self.boundingbox.and_then(|raw| {
            let values: Vec<f64> = raw.iter().filter_map(|v| v.parse().ok()).collect();
            match values.as_slice() {
                [min_lat, max_lat, min_lon, max_lon] => {
                    BoundingBox::new(*min_lat, *max_lat, *min_lon, *max_lon).ok()
                }
                _ => None,
            }
        });

        Some(Place {
            coordinate,
            bounding_box,
            display_name: self.display_name.unwrap_or_else(|| query.to_string()),
        })
    }
}

/// Rate-limited Nominatim client.
///
/// All callers share one instance; the internal lock serializes requests so
/// that consecutive upstream calls are at least `min_interval` apart.
#[derive(Debug)]
pub struct Geocoder {
    client: Client,
    base_url: String,
    min_interval: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl Geocoder {
    pub fn with_settings(
        base_url: impl Into<String>,
        timeout: Duration,
        min_interval: Duration,
        user_agent: &str,
    ) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout, user_agent)?,
            base_url: normalize_base(base_url),
            min_interval,
            last_call: Mutex::new(None),
        })
    }

    async fn search(&self, place_name: &str) -> Result<Place, GeocodeError> {
        let url = format!("{}/search", self.base_url);
        let request = self.client.get(&url).query(&[
            ("q", place_name),
            ("format", "json"),
            ("limit", "1"),
            ("accept-language", "en"),
        ]);

        let results: Vec<NominatimPlace> = send_json(request).await?;

        results
            .into_iter()
            .next()
            .and_then(|p| p.into_place(place_name))
            .ok_or_else(|| GeocodeError::NotFound(place_name.to_string()))
    }
}

#[async_trait]
impl PlaceResolver for Geocoder {
    async fn resolve(&self, place_name: &str) -> Result<Place, GeocodeError> {
        let query = place_name.trim();
        if query.is_empty() {
            return Err(GeocodeError::NotFound(place_name.to_string()));
        }

        // Held for the whole call so concurrent requests queue behind it.
        let mut last_call = self.last_call.lock().await;
        if let Some(last) = *last_call {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        *last_call = Some(Instant::now());

        tracing::debug!("Geocoding: {}", query);
        match self.search(query).await {
            Ok(place) => {
                tracing::info!("Geocoded {} to {}", query, place.display_name);
                Ok(place)
            }
            Err(e) => {
                tracing::warn!("Geocoding {} failed ({}): {}", query, e.reason(), e);
                Err(e)
            }
        }
    }
}
