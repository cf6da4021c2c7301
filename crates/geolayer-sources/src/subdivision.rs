//! Natural Earth admin-1 subdivisions (states, provinces, prefectures).
//!
//! The upstream file covers the whole world, so it is downloaded once per
//! provider and filtered in memory for each country.

use anyhow::Result;
use async_trait::async_trait;
use geolayer_core::{GeoFeature, Geometry, Properties};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::OnceCell;

use crate::http::{build_client, normalize_base, send_json, USER_AGENT};
use crate::provider::ProviderAdapter;

pub const NATURAL_EARTH_URL: &str =
    "https://raw.githubusercontent.com/nvkelso/natural-earth-vector/master/geojson";
const ADMIN1_FILE: &str = "ne_10m_admin_1_states_provinces.geojson";

#[derive(Debug, Deserialize)]
struct RawCollection {
    #[serde(default)]
    features: Vec<RawFeature>,
}

#[derive(Debug, Deserialize)]
struct RawFeature {
    #[serde(default)]
    properties: serde_json::Map<String, Value>,
    geometry: Option<Value>,
}

#[derive(Debug, Clone)]
struct Subdivision {
    admin: String,
    feature: GeoFeature,
}

impl Subdivision {
    fn from_raw(raw: RawFeature) -> Option<Self> {
        let admin = raw.properties.get("admin")?.as_str()?.to_lowercase();
        if admin.is_empty() {
            return None;
        }
        let geometry: Geometry = serde_json::from_value(raw.geometry?).ok()?;
        if !matches!(geometry, Geometry::Polygon(_) | Geometry::MultiPolygon(_)) {
            return None;
        }

        let mut properties = Properties::new();
        for key in ["name", "admin", "iso_3166_2"] {
            if let Some(value) = raw.properties.get(key) {
                properties.insert(key.to_string(), value.clone());
            }
        }
        Some(Self {
            admin,
            feature: GeoFeature::with_properties(geometry, properties),
        })
    }

    /// Admin name contains the country or the other way around.
    fn matches(&self, country: &str) -> bool {
        self.admin.contains(country) || country.contains(&self.admin)
    }
}

pub struct NaturalEarthSubdivisions {
    client: Client,
    base_url: String,
    catalog: OnceCell<Vec<Subdivision>>,
}

impl NaturalEarthSubdivisions {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout, USER_AGENT)?,
            base_url: normalize_base(base_url),
            catalog: OnceCell::new(),
        })
    }


    async fn catalog(&self) -> Option<&[Subdivision]> {
        let result = self
            .catalog
            .get_or_try_init(|| async {
                let url = format!("{}/{}", self.base_url, ADMIN1_FILE);
                let collection: RawCollection = send_json(self.client.get(&url)).await?;
                let subdivisions: Vec<Subdivision> = collection
                    .features
                    .into_iter()
                    .filter_map(Subdivision::from_raw)
                    .collect();
                tracing::info!("Loaded {} admin-1 subdivisions", subdivisions.len());
                Ok::<_, geolayer_core::NetworkError>(subdivisions)
            })
            .await;

        match result {
            Ok(catalog) => Some(catalog.as_slice()),
            Err(e) => {
                tracing::warn!("Natural Earth subdivisions unavailable: {}", e);
                None
            }
        }
    }
}

#[async_trait]
impl ProviderAdapter for NaturalEarthSubdivisions {
    type Query = String;
    type Record = Vec<GeoFeature>;

    fn name(&self) -> &str {
        "Natural Earth"
    }

    async fn fetch(&self, country: &String) -> Option<Vec<GeoFeature>> {
        let country = country.trim().to_lowercase();
        if country.is_empty() {
            return None;
        }

        let features: Vec<GeoFeature> = self
            .catalog()
            .await?
            .iter()
            .filter(|s| s.matches(&country))
            .map(|s| s.feature.clone())
            .collect();

        tracing::debug!("Natural Earth: {} subdivisions for {}", features.len(), country);
        if features.is_empty() {
            None
        } else {
            Some(features)
        }
    }
}
