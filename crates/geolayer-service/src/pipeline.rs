//! Request pipeline: intent classification, cache, aggregation.

use anyhow::Result;
use geolayer_core::{Config, Coordinate, LayerResult};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

use crate::aggregator::AggregationService;
use crate::cache::LayerCache;
use crate::intent::{Intent, IntentClassifier, LayerRequest};

/// Reply to a free-text message.
#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    pub success: bool,
    pub message: String,
    pub layer_data: Option<Arc<LayerResult>>,
    pub view_position: Option<Coordinate>,
}

impl ChatResponse {
    fn chat(message: String) -> Self {
        Self {
            success: true,
            message,
            layer_data: None,
            view_position: None,
        }
    }
}

pub struct LayerPipeline {
    cache: Arc<LayerCache>,
    service: Arc<AggregationService>,
    classifier: IntentClassifier,
}

impl LayerPipeline {
    pub fn new(service: Arc<AggregationService>, cache: Arc<LayerCache>) -> Result<Self> {
        Ok(Self {
            cache,
            service,
            classifier: IntentClassifier::new()?,
        })
    }

    /// Live providers with the cache TTL taken from the config.
    pub fn from_config(config: Config) -> Result<Self> {
        let cache = Arc::new(LayerCache::new(Duration::from_secs(config.cache.ttl_seconds)));
        let service = Arc::new(AggregationService::from_config(config)?);
        Self::new(service, cache)
    }

    pub fn cache(&self) -> &LayerCache {
        &self.cache
    }

    pub fn service(&self) -> &AggregationService {
        &self.service
    }

    /// Cached layer if fresh, otherwise a new one. Failed layers are not cached.
    #[instrument(skip(self))]
    pub async fn fetch_layer(&self, request: &LayerRequest) -> Arc<LayerResult> {
        let LayerRequest {
            source,
            location,
            data_type,
        } = request;

        if let Some(hit) = self.cache.get(source, location, data_type) {
            tracing::info!("Serving cached {} layer for {}", data_type, location);
            return hit;
        }

        let layer = Arc::new(self.service.fetch_layer(source, location, data_type).await);
        if !layer.is_error() {
            self.cache.set(source, location, data_type, layer.clone());
        }
        layer
    }

    pub async fn handle_message(&self, text: &str) -> ChatResponse {
        let request = match self.classifier.classify(text) {
            Intent::Chat(message) => return ChatResponse::chat(message),
            Intent::Data(request) => request,
        };
        tracing::info!(
            "Classified as {}/{} for {}",
            request.source,
            request.data_type,
            request.location
        );

        let layer = self.fetch_layer(&request).await;
        let metadata = layer.metadata();
        if layer.is_error() {
            return ChatResponse {
                success: false,
                message: metadata.summary.clone(),
                layer_data: None,
                view_position: None,
            };
        }

        ChatResponse {
            success: true,
            message: format!("{}\n\n{}", request.describe(), metadata.summary),
            view_position: metadata.center,
            layer_data: Some(layer),
        }
    }

    pub fn clear_cache(&self) -> usize {
        self.cache.clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pipeline() -> LayerPipeline {
        LayerPipeline::from_config(Config::default()).unwrap()
    }

    #[tokio::test]
    async fn test_chat_message_skips_fetch() {
        let pipeline = pipeline();
        let response = pipeline.handle_message("hello").await;
        assert!(response.success);
        assert!(response.layer_data.is_none());
        assert!(response.view_position.is_none());
        assert!(pipeline.cache().is_empty());
    }

    #[tokio::test]
    async fn test_cache_ttl_from_config() {
        let mut config = Config::default();
        config.cache.ttl_seconds = 120;
        let pipeline = LayerPipeline::from_config(config).unwrap();
        assert_eq!(pipeline.cache().ttl(), Duration::from_secs(120));
    }

    #[tokio::test]
    async fn test_cached_layer_is_served() {
        let pipeline = pipeline();
        let request = LayerRequest::new("earthquakes", "Japan", "seismic");
        let cached = Arc::new(LayerResult::success(
            "USGS",
            "earthquakes",
            "cached",
            None,
            Vec::new(),
        ));
        pipeline
            .cache()
            .set("earthquakes", "Japan", "seismic", cached.clone());

        let layer = pipeline.fetch_layer(&request).await;
        assert!(Arc::ptr_eq(&layer, &cached));

        assert_eq!(pipeline.clear_cache(), 1);
    }

    #[test]
    fn test_response_serializes_snake_case() {
        let response = ChatResponse::chat("hi".into());
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["success"], true);
        assert!(value.get("layer_data").is_some());
        assert!(value["view_position"].is_null());
    }
}
