//! Aggregation service: geocode, pick providers, synthesize geometry.
//!
//! [`AggregationService::fetch_layer`] never fails. Every fault is folded
//! into a [`LayerResult`] with `metadata.error = true`.

use anyhow::Result;
use geolayer_core::{BoundingBox, Config, GeoFeature, Geometry, ImageryInfo, LayerError, LayerResult, Properties};
use geolayer_sources::{
    rest_countries, DemographicMetric, DemographicQuery, DemographicRecord, FallbackChain, Geocoder,
    ImageryProvider, NaturalEarthSubdivisions, OpenMeteoProvider, OverpassProvider, Place, PlaceResolver,
    PlaceTag, PlacesQuery, ProviderAdapter, RestCountriesProvider, SeismicReport, SyntheticEstimator,
    UsgsProvider, WeatherReport, WorldBankProvider,
};
use geolayer_synth::{GridScale, SpatialSynthesizer, SynthesisMethod, SynthesisRequest};
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

use crate::dispatch::{Dispatch, SourceKind};

pub type DynAdapter<Q, R> = Box<dyn ProviderAdapter<Query = Q, Record = R>>;

/// Every upstream collaborator of the service.
pub struct Providers {
    pub geocoder: Arc<dyn PlaceResolver>,
    pub demographic: FallbackChain<DemographicQuery, DemographicRecord>,
    pub weather: DynAdapter<Place, WeatherReport>,
    pub seismic: DynAdapter<Place, SeismicReport>,
    pub places: DynAdapter<PlacesQuery, Vec<GeoFeature>>,
    pub imagery: DynAdapter<BoundingBox, ImageryInfo>,
    /// Optional; without it scalar layers always use the hex grid.
    pub subdivisions: Option<DynAdapter<String, Vec<GeoFeature>>>,
}

impl Providers {
    /// Live adapters pointed at the configured endpoints.
    pub fn from_config(config: &Config) -> Result<Self> {
        let endpoints = &config.endpoints;
        let timeouts = &config.timeouts;
        let secs = Duration::from_secs;

        let geocoder = Geocoder::with_settings(
            endpoints.nominatim_url.as_str(),
            secs(timeouts.geocoder_secs),
            Duration::from_millis(config.geocoder.min_interval_ms),
            &config.geocoder.user_agent,
        )?;

        let demographic = FallbackChain::new(SyntheticEstimator::new())
            .with_adapter(WorldBankProvider::new(
                endpoints.worldbank_url.as_str(),
                secs(timeouts.demographic_secs),
            )?)
            .with_adapter(RestCountriesProvider::new(
                endpoints.rest_countries_url.as_str(),
                secs(rest_countries::REQUEST_TIMEOUT_SECS),
            )?);
        tracing::debug!("Demographic chain: {}", demographic.provider_names().join(" -> "));

        let subdivisions: Option<DynAdapter<String, Vec<GeoFeature>>> = if config.grid.subdivisions {
            Some(Box::new(NaturalEarthSubdivisions::new(
                endpoints.natural_earth_url.as_str(),
                secs(timeouts.subdivision_secs),
            )?))
        } else {
            None
        };

        Ok(Self {
            geocoder: Arc::new(geocoder),
            demographic,
            weather: Box::new(OpenMeteoProvider::new(
                endpoints.open_meteo_url.as_str(),
                secs(timeouts.weather_secs),
            )?),
            seismic: Box::new(
                UsgsProvider::new(endpoints.usgs_url.as_str(), secs(timeouts.seismic_secs))?
                    .with_limits(config.seismic.clone()),
            ),
            places: Box::new(
                OverpassProvider::new(endpoints.overpass_url.as_str(), secs(timeouts.places_secs))?
                    .with_max_elements(config.places.max_elements),
            ),
            imagery: Box::new(ImageryProvider::new(endpoints.imagery_tile_url.as_str())),
            subdivisions,
        })
    }
}

pub struct AggregationService {
    providers: Providers,
    synthesizer: SpatialSynthesizer,
    config: Config,
    default_tag: PlaceTag,
}

impl AggregationService {
    pub fn new(providers: Providers, synthesizer: SpatialSynthesizer, config: Config) -> Self {
        let default_tag = PlaceTag::parse(&config.places.default_tag).unwrap_or(PlaceTag::Buildings);
        Self {
            providers,
            synthesizer,
            config,
            default_tag,
        }
    }

    /// Live providers and an OS-seeded synthesizer.
    pub fn from_config(config: Config) -> Result<Self> {
        let providers = Providers::from_config(&config)?;
        let synthesizer = SpatialSynthesizer::new(config.grid.clone());
        Ok(Self::new(providers, synthesizer, config))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Produce a layer for `(source, location, data_type)`. Never fails.
    #[instrument(skip(self))]
    pub async fn fetch_layer(&self, source: &str, location: &str, data_type: &str) -> LayerResult {
        let dispatch = Dispatch::resolve(source);
        let kind = match dispatch.route(self.config.dispatch.strict) {
            Ok(kind) => kind,
            Err(e) => {
                tracing::warn!("Rejected request: {}", e);
                return LayerResult::failure(source, data_type, &e);
            }
        };

        // Unknown sources get the default tag whatever the data type says.
        let data_type = if dispatch.is_unknown() {
            self.default_tag.as_str()
        } else {
            data_type
        };
        let layer_type = kind.layer_type(data_type, self.default_tag);

        let outcome = match kind {
            SourceKind::Demographic => self.demographic_layer(location, data_type).await,
            SourceKind::Weather => self.weather_layer(location).await,
            SourceKind::Seismic => self.seismic_layer(location).await,
            SourceKind::Imagery => self.imagery_layer(location).await,
            SourceKind::Places => self.places_layer(location, data_type).await,
            SourceKind::Geocoding => self.geocoding_layer(location).await,
        };

        match outcome {
            Ok(layer) => {
                tracing::info!(
                    "{} layer for {}: {} features from {}",
                    layer_type,
                    location,
                    layer.metadata().feature_count,
                    layer.metadata().source
                );
                layer
            }
            Err((provider, e)) => {
                tracing::warn!("{} layer for {} failed: {}", layer_type, location, e);
                LayerResult::failure(provider, layer_type, &e)
            }
        }
    }

    async fn locate(&self, location: &str) -> Result<Place, Failure> {
        self.providers.geocoder.resolve(location).await.map_err(|e| {
            tracing::debug!("Geocoder reason: {}", e.reason());
            ("Nominatim".to_string(), LayerError::LocationNotFound(location.to_string()))
        })
    }

    async fn demographic_layer(&self, location: &str, data_type: &str) -> Result<LayerResult, Failure> {
        let metric = DemographicMetric::from_data_type(data_type);
        let resolved = self
            .providers
            .demographic
            .resolve(&DemographicQuery::new(location, metric))
            .await;
        let record = resolved.record;
        let provider = resolved.provider;

        let place = self.locate(location).await?;
        let region = place.region_or(self.config.grid.regional_box_offset_deg);

        let subdivisions = match &self.providers.subdivisions {
            Some(adapter) => adapter.fetch(&record.country).await,
            None => None,
        };

        let mut properties = Properties::new();
        properties.insert("unit".into(), metric.unit().into());
        properties.insert("layer".into(), metric.layer_type().into());
        properties.insert("country".into(), record.country.clone().into());
        properties.insert("year".into(), record.year.clone().into());
        properties.insert("source".into(), provider.clone().into());

        let request = SynthesisRequest {
            region,
            anchor: place.coordinate,
            value: record.value,
            extensive: metric.is_extensive(),
            scale: GridScale::Regional,
            subdivisions: subdivisions.as_deref(),
            properties,
        };
        let features = self.synthesize(&request, &provider, location)?;

        let summary = format!(
            "👥 {} {}: {} {} ({}, {})",
            record.country,
            metric.layer_type(),
            metric.format_value(record.value),
            metric.unit(),
            record.year,
            provider
        );
        Ok(LayerResult::success(
            provider,
            metric.layer_type(),
            summary,
            Some(place.coordinate),
            features,
        ))
    }

    async fn weather_layer(&self, location: &str) -> Result<LayerResult, Failure> {
        let place = self.locate(location).await?;
        let adapter = &self.providers.weather;
        let provider = adapter.name().to_string();

        let Some(report) = adapter.fetch(&place).await else {
            return Err((provider.clone(), LayerError::upstream(provider, "no weather data")));
        };

        let region = BoundingBox::around(place.coordinate, self.config.grid.local_box_offset_deg);
        let mut properties = Properties::new();
        properties.insert("unit".into(), "°C".into());
        properties.insert("layer".into(), "weather".into());
        properties.insert("condition".into(), report.condition.description().into());
        properties.insert("wind_speed_kmh".into(), report.wind_speed_kmh.into());
        properties.insert("precipitation_mm".into(), report.precipitation_mm.into());

        let request = SynthesisRequest {
            region,
            anchor: place.coordinate,
            value: report.temperature_c,
            extensive: false,
            scale: GridScale::Local,
            subdivisions: None,
            properties,
        };
        let features = self.synthesize(&request, &provider, location)?;

        let summary = format!(
            "{} {}: {:.1}°C, {}, wind {:.1} km/h, precipitation {:.1} mm ({})",
            report.condition.emoji(),
            place.display_name,
            report.temperature_c,
            report.condition.description(),
            report.wind_speed_kmh,
            report.precipitation_mm,
            provider
        );
        Ok(LayerResult::success(
            provider,
            "weather",
            summary,
            Some(place.coordinate),
            features,
        ))
    }

    async fn seismic_layer(&self, location: &str) -> Result<LayerResult, Failure> {
        let place = self.locate(location).await?;
        let adapter = &self.providers.seismic;
        let provider = adapter.name().to_string();

        let Some(report) = adapter.fetch(&place).await else {
            return Err((provider.clone(), LayerError::upstream(provider, "earthquake feed unavailable")));
        };

        let limits = &self.config.seismic;
        let summary = match report.strongest_magnitude() {
            Some(strongest) if report.total > 0 => format!(
                "🌋 {} earthquakes near {} (last {} days). Strongest: M{:.1}",
                report.total, location, limits.window_days, strongest
            ),
            _ => {
                let empty = LayerError::NoDataForRegion(location.to_string());
                tracing::info!("{}", empty);
                format!(
                    "✅ No significant earthquakes (M{:.1}+) near {} in the last {} days",
                    limits.min_magnitude, location, limits.window_days
                )
            }
        };

        Ok(LayerResult::success(
            provider,
            "earthquakes",
            summary,
            Some(place.coordinate),
            report.events,
        ))
    }

    async fn imagery_layer(&self, location: &str) -> Result<LayerResult, Failure> {
        let place = self.locate(location).await?;
        let region = place.region_or(self.config.grid.local_box_offset_deg);
        let adapter = &self.providers.imagery;
        let provider = adapter.name().to_string();

        let Some(info) = adapter.fetch(&region).await else {
            return Err((provider.clone(), LayerError::upstream(provider, "no imagery")));
        };

        let summary = format!("🛰️ Satellite imagery of {} ({})", place.display_name, provider);
        Ok(
            LayerResult::success(provider, "satellite", summary, Some(place.coordinate), Vec::new())
                .with_imagery(info),
        )
    }

    async fn places_layer(&self, location: &str, data_type: &str) -> Result<LayerResult, Failure> {
        let place = self.locate(location).await?;
        let tag = PlaceTag::parse(data_type).unwrap_or(self.default_tag);
        let adapter = &self.providers.places;
        let provider = adapter.name().to_string();

        let query = PlacesQuery {
            center: place.coordinate,
            tag,
            radius_m: self.config.places.radius_m,
        };
        let Some(features) = adapter.fetch(&query).await else {
            return Err((provider.clone(), LayerError::upstream(provider, "map query failed")));
        };

        let summary = if features.is_empty() {
            format!("🗺️ No {} found near {} ({})", tag.as_str(), place.display_name, provider)
        } else {
            format!(
                "🗺️ {} {} near {} ({})",
                features.len(),
                tag.as_str(),
                place.display_name,
                provider
            )
        };
        Ok(LayerResult::success(
            provider,
            tag.as_str(),
            summary,
            Some(place.coordinate),
            features,
        ))
    }

    async fn geocoding_layer(&self, location: &str) -> Result<LayerResult, Failure> {
        let place = self.locate(location).await?;
        let feature = GeoFeature::new(Geometry::point(place.coordinate))
            .with_property("name", place.display_name.clone());

        let summary = format!(
            "📍 {}: {:.4}, {:.4}",
            place.display_name, place.coordinate.latitude, place.coordinate.longitude
        );
        Ok(LayerResult::success(
            "Nominatim",
            "location",
            summary,
            Some(place.coordinate),
            vec![feature],
        ))
    }

    fn synthesize(
        &self,
        request: &SynthesisRequest<'_>,
        provider: &str,
        location: &str,
    ) -> Result<Vec<GeoFeature>, Failure> {
        let no_data = || (provider.to_string(), LayerError::NoDataForRegion(location.to_string()));

        let synthesis = self.synthesizer.synthesize(request).map_err(|e| {
            tracing::warn!("Synthesis failed for {}: {}", location, e);
            no_data()
        })?;
        if synthesis.features.is_empty() {
            return Err(no_data());
        }
        if let SynthesisMethod::HexGrid { resolution } = synthesis.method {
            tracing::debug!("{} hex cells at resolution {}", synthesis.features.len(), resolution);
        }
        Ok(synthesis.features)
    }
}

/// Provider to blame plus the terminal error.
type Failure = (String, LayerError);
