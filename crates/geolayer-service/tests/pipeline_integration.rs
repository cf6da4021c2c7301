//! End-to-end tests for LayerPipeline with stubbed geocoding and a mocked
//! earthquake feed.

use async_trait::async_trait;
use geolayer_core::{BoundingBox, Config, Coordinate, GeoFeature, LayerErrorKind};
use geolayer_service::{AggregationService, LayerCache, LayerPipeline, LayerRequest, Providers};
use geolayer_sources::{
    FallbackChain, GeocodeError, ImageryProvider, Place, PlaceResolver, PlacesQuery, ProviderAdapter,
    SyntheticEstimator, UsgsProvider, WeatherReport,
};
use geolayer_synth::SpatialSynthesizer;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Resolves anything except "Atlantis" to central Japan and counts calls.
#[derive(Default)]
struct CountingResolver {
    calls: AtomicUsize,
}

#[async_trait]
impl PlaceResolver for CountingResolver {
    async fn resolve(&self, place_name: &str) -> Result<Place, GeocodeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if place_name == "Atlantis" {
            return Err(GeocodeError::NotFound(place_name.to_string()));
        }
        Ok(Place {
            coordinate: Coordinate::new(36.2, 138.25).unwrap(),
            bounding_box: Some(BoundingBox::new(30.0, 40.0, 129.0, 146.0).unwrap()),
            display_name: place_name.to_string(),
        })
    }
}

struct Unavailable<Q, R>(std::marker::PhantomData<fn(&Q) -> R>);

#[async_trait]
impl<Q: Send + Sync, R: Send + Sync> ProviderAdapter for Unavailable<Q, R> {
    type Query = Q;
    type Record = R;

    fn name(&self) -> &str {
        "Offline"
    }

    async fn fetch(&self, _query: &Q) -> Option<R> {
        None
    }
}

fn unavailable<Q, R>() -> Box<Unavailable<Q, R>> {
    Box::new(Unavailable(std::marker::PhantomData))
}

async fn quiet_usgs() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "type": "FeatureCollection",
            "features": []
        })))
        .mount(&server)
        .await;
    server
}

fn pipeline(usgs_url: &str, resolver: Arc<CountingResolver>) -> LayerPipeline {
    let config = Config::default();
    let providers = Providers {
        geocoder: resolver,
        demographic: FallbackChain::new(SyntheticEstimator::seeded(42)),
        weather: unavailable::<Place, WeatherReport>(),
        seismic: Box::new(UsgsProvider::new(usgs_url, Duration::from_secs(5)).unwrap()),
        places: unavailable::<PlacesQuery, Vec<GeoFeature>>(),
        imagery: Box::new(ImageryProvider::default()),
        subdivisions: None,
    };
    let synthesizer = SpatialSynthesizer::seeded(config.grid.clone(), 7);
    let service = Arc::new(AggregationService::new(providers, synthesizer, config));
    LayerPipeline::new(service, Arc::new(LayerCache::default())).unwrap()
}

#[tokio::test]
async fn test_population_of_japan() {
    let server = quiet_usgs().await;
    let pipeline = pipeline(&server.uri(), Arc::default());

    let layer = pipeline
        .fetch_layer(&LayerRequest::new("worldbank", "Japan", "population"))
        .await;

    assert!(!layer.is_error());
    let metadata = layer.metadata();
    assert_eq!(metadata.layer_type, "population");
    assert_eq!(metadata.source, "Estimated Data");
    assert_eq!(metadata.feature_count, layer.features().len());
    assert!(!layer.features().is_empty());
    assert!(layer.features().len() <= 150);
    for feature in layer.features() {
        assert_eq!(feature.property("unit"), Some(&serde_json::json!("people")));
        assert!(feature.geometry.rings_closed());
    }

    let envelope = serde_json::to_value(&*layer).unwrap();
    assert_eq!(envelope["type"], "FeatureCollection");
    assert_eq!(envelope["metadata"]["layerType"], "population");
}

#[tokio::test]
async fn test_no_earthquakes_is_success() {
    let server = quiet_usgs().await;
    let pipeline = pipeline(&server.uri(), Arc::default());

    let layer = pipeline
        .fetch_layer(&LayerRequest::new("earthquakes", "Japan", "seismic"))
        .await;

    assert!(!layer.is_error());
    assert!(layer.features().is_empty());
    assert_eq!(layer.metadata().feature_count, 0);
    assert!(layer.metadata().summary.contains("No significant earthquakes"));
}

#[tokio::test]
async fn test_cache_keys_are_case_sensitive() {
    let server = quiet_usgs().await;
    let resolver = Arc::new(CountingResolver::default());
    let pipeline = pipeline(&server.uri(), resolver.clone());

    let first = pipeline
        .fetch_layer(&LayerRequest::new("earthquakes", "Japan", "seismic"))
        .await;
    let second = pipeline
        .fetch_layer(&LayerRequest::new("earthquakes", "Japan", "seismic"))
        .await;
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(resolver.calls.load(Ordering::SeqCst), 1);

    pipeline
        .fetch_layer(&LayerRequest::new("earthquakes", "japan", "seismic"))
        .await;
    assert_eq!(resolver.calls.load(Ordering::SeqCst), 2);
    assert_eq!(pipeline.cache().len(), 2);
}

#[tokio::test]
async fn test_failures_are_not_cached() {
    let server = quiet_usgs().await;
    let resolver = Arc::new(CountingResolver::default());
    let pipeline = pipeline(&server.uri(), resolver.clone());
    let request = LayerRequest::new("earthquakes", "Atlantis", "seismic");

    let layer = pipeline.fetch_layer(&request).await;
    assert!(layer.is_error());
    assert_eq!(layer.error_kind(), Some(LayerErrorKind::LocationNotFound));
    assert!(pipeline.cache().is_empty());

    pipeline.fetch_layer(&request).await;
    assert_eq!(resolver.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_weather_outage_reports_provider() {
    let server = quiet_usgs().await;
    let pipeline = pipeline(&server.uri(), Arc::default());

    let layer = pipeline
        .fetch_layer(&LayerRequest::new("weather", "Japan", "current"))
        .await;
    assert!(layer.is_error());
    assert_eq!(layer.error_kind(), Some(LayerErrorKind::UpstreamUnavailable));
    assert!(layer.features().is_empty());

    let envelope = serde_json::to_value(&*layer).unwrap();
    assert!(envelope.get("type").is_none());
    assert_eq!(envelope["metadata"]["error"], true);
}

#[tokio::test]
async fn test_message_round_trip() {
    let server = quiet_usgs().await;
    let pipeline = pipeline(&server.uri(), Arc::default());

    let response = pipeline.handle_message("population of Japan").await;
    assert!(response.success);
    assert!(response.message.starts_with("Showing population for Japan."));
    assert!(response.message.contains("people"));
    assert_eq!(response.view_position, Some(Coordinate::new(36.2, 138.25).unwrap()));
    assert!(response.layer_data.is_some());

    let failed = pipeline.handle_message("earthquakes near Atlantis").await;
    assert!(!failed.success);
    assert_eq!(failed.message, "location not found: Atlantis");
    assert!(failed.layer_data.is_none());
}
