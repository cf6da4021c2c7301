//! REST Countries (secondary demographic registry).

use anyhow::Result;
use async_trait::async_trait;
use chrono::Datelike;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::http::{build_client, normalize_base, send_json, USER_AGENT};
use crate::provider::ProviderAdapter;
use crate::types::{DemographicMetric, DemographicQuery, DemographicRecord};

pub const REST_COUNTRIES_URL: &str = "https://restcountries.com/v3.1";
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Deserialize)]
struct CountryEntry {
    name: CountryName,
    #[serde(default)]
    population: f64,
    #[serde(default)]
    area: f64,
}

#[derive(Debug, Deserialize)]
struct CountryName {
    common: String,
}

pub struct RestCountriesProvider {
    client: Client,
    base_url: String,
}

impl RestCountriesProvider {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout, USER_AGENT)?,
            base_url: normalize_base(base_url),
        })
    }

}

#[async_trait]
impl ProviderAdapter for RestCountriesProvider {
    type Query = DemographicQuery;
    type Record = DemographicRecord;

    fn name(&self) -> &str {
        "REST Countries"
    }

    async fn fetch(&self, query: &DemographicQuery) -> Option<DemographicRecord> {
        let location = query.location.trim();
        if location.is_empty() {
            return None;
        }

        let url = format!("{}/name/{}", self.base_url, urlencoding::encode(location));
        let request = self
            .client
            .get(&url)
            .query(&[("fields", "name,population,area,capital,latlng")]);

        let entries: Vec<CountryEntry> = match send_json(request).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("REST Countries lookup for {} failed: {}", location, e);
                return None;
            }
        };

        let country = entries.into_iter().next()?;
        let value = match query.metric {
            DemographicMetric::Population => country.population,
            DemographicMetric::Density if country.area > 0.0 => country.population / country.area,
            DemographicMetric::Density => 0.0,
        };
        if value <= 0.0 {
            tracing::warn!("REST Countries: no usable {} for {}", query.metric.layer_type(), location);
            return None;
        }

        tracing::info!("REST Countries: {} {} = {}", country.name.common, query.metric.layer_type(), value);
        Some(DemographicRecord {
            country: country.name.common,
            metric: query.metric,
            value,
            year: chrono::Utc::now().year().to_string(),
            source: self.name().to_string(),
        })
    }
}
