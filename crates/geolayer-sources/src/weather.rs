//! Open-Meteo current conditions. Free, no API key required.

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::http::{build_client, normalize_base, send_json, USER_AGENT};
use crate::provider::ProviderAdapter;
use crate::types::{Place, WeatherCondition, WeatherReport};

pub const OPEN_METEO_URL: &str = "https://api.open-meteo.com/v1";
const CURRENT_FIELDS: &str = "temperature_2m,precipitation,wind_speed_10m,weather_code";

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    current: CurrentBlock,
}

#[derive(Debug, Deserialize)]
struct CurrentBlock {
    time: Option<String>,
    temperature_2m: f64,
    #[serde(default)]
    precipitation: f64,
    #[serde(default)]
    wind_speed_10m: f64,
    #[serde(default)]
    weather_code: i32,
}

pub struct OpenMeteoProvider {
    client: Client,
    base_url: String,
}

impl OpenMeteoProvider {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout, USER_AGENT)?,
            base_url: normalize_base(base_url),
        })
    }

}

#[async_trait]
impl ProviderAdapter for OpenMeteoProvider {
    type Query = Place;
    type Record = WeatherReport;

    fn name(&self) -> &str {
        "Open-Meteo"
    }

    async fn fetch(&self, place: &Place) -> Option<WeatherReport> {
        let url = format!("{}/forecast", self.base_url);
        let request = self.client.get(&url).query(&[
            ("latitude", place.coordinate.latitude.to_string()),
            ("longitude", place.coordinate.longitude.to_string()),
            ("current", CURRENT_FIELDS.to_string()),
            ("timezone", "auto".to_string()),
        ]);

        match send_json::<ForecastResponse>(request).await {
            Ok(body) => {
                let current = body.current;
                tracing::debug!(
                    "Open-Meteo at {}: {}°C, code {}",
                    place.display_name,
                    current.temperature_2m,
                    current.weather_code
                );
                Some(WeatherReport {
                    temperature_c: current.temperature_2m,
                    wind_speed_kmh: current.wind_speed_10m,
                    precipitation_mm: current.precipitation,
                    condition: WeatherCondition::from_wmo_code(current.weather_code),
                    observed_at: current.time,
                })
            }
            Err(e) => {
                tracing::warn!("Open-Meteo request for {} failed: {}", place.display_name, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geolayer_core::Coordinate;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn tokyo() -> Place {
        Place {
            coordinate: Coordinate::new(35.68, 139.69).unwrap(),
            bounding_box: None,
            display_name: "Tokyo".into(),
        }
    }

    #[tokio::test]
    async fn test_current_conditions() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/forecast"))
            .and(query_param("latitude", "35.68"))
            .and(query_param("current", CURRENT_FIELDS))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "latitude": 35.7,
                "longitude": 139.7,
                "current": {
                    "time": "2024-05-01T12:00",
                    "temperature_2m": 21.4,
                    "precipitation": 0.2,
                    "wind_speed_10m": 11.5,
                    "weather_code": 61
                }
            })))
            .mount(&server)
            .await;

        let provider = OpenMeteoProvider::new(server.uri(), Duration::from_secs(5)).unwrap();
        let report = provider.fetch(&tokyo()).await.unwrap();

        assert_eq!(report.temperature_c, 21.4);
        assert_eq!(report.wind_speed_kmh, 11.5);
        assert_eq!(report.condition, WeatherCondition::Rain);
        assert_eq!(report.observed_at.as_deref(), Some("2024-05-01T12:00"));
    }

    #[tokio::test]
    async fn test_missing_current_block_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/forecast"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "error": true,
                "reason": "Latitude must be in range of -90 to 90°."
            })))
            .mount(&server)
            .await;

        let provider = OpenMeteoProvider::new(server.uri(), Duration::from_secs(5)).unwrap();
        assert!(provider.fetch(&tokyo()).await.is_none());
    }
}
