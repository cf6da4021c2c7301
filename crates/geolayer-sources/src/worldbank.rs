//! World Bank indicator API (primary demographic registry).

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

use crate::country::lookup_country_code;
use crate::http::{build_client, normalize_base, send_json, USER_AGENT};
use crate::provider::ProviderAdapter;
use crate::types::{DemographicMetric, DemographicQuery, DemographicRecord};

pub const WORLDBANK_URL: &str = "https://api.worldbank.org/v2";

#[derive(Debug, Deserialize)]
struct IndicatorRow {
    value: Option<f64>,
    date: String,
    country: IndicatorCountry,
}

#[derive(Debug, Deserialize)]
struct IndicatorCountry {
    value: String,
}

fn indicator(metric: DemographicMetric) -> &'static str {
    match metric {
        DemographicMetric::Population => "SP.POP.TOTL",
        DemographicMetric::Density => "EN.POP.DNST",
    }
}

/// The API answers `[paging, rows]`; an error payload is `[{"message": ..}]`.
fn first_row(body: Value) -> Option<IndicatorRow> {
    let rows = body.as_array()?.get(1)?.as_array()?.first()?.clone();
    serde_json::from_value(rows).ok()
}

pub struct WorldBankProvider {
    client: Client,
    base_url: String,
}

impl WorldBankProvider {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout, USER_AGENT)?,
            base_url: normalize_base(base_url),
        })
    }

}

#[async_trait]
impl ProviderAdapter for WorldBankProvider {
    type Query = DemographicQuery;
    type Record = DemographicRecord;

    fn name(&self) -> &str {
        "World Bank"
    }

    async fn fetch(&self, query: &DemographicQuery) -> Option<DemographicRecord> {
        let Some(code) = lookup_country_code(&query.location) else {
            tracing::debug!("World Bank: no country code for {}", query.location);
            return None;
        };

        let url = format!(
            "{}/country/{}/indicator/{}",
            self.base_url,
            code,
            indicator(query.metric)
        );
        let request = self.client.get(&url).query(&[
            ("format", "json"),
            ("date", "MRV:1"),
            ("per_page", "1"),
        ]);

        let body: Value = match send_json(request).await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!("World Bank request for {} failed: {}", code, e);
                return None;
            }
        };

        let row = first_row(body)?;
        let Some(value) = row.value.filter(|v| *v > 0.0) else {
            tracing::warn!("World Bank: no {} value for {}", query.metric.layer_type(), code);
            return None;
        };

        tracing::info!("World Bank {} for {}: {} ({})", query.metric.layer_type(), code, value, row.date);
        Some(DemographicRecord {
            country: row.country.value,
            metric: query.metric,
            value,
            year: row.date,
            source: self.name().to_string(),
        })
    }
}
