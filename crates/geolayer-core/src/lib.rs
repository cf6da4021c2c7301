pub mod config;
pub mod error;
pub mod geo;
pub mod layer;

pub use config::{
    CacheConfig, Config, DispatchConfig, EndpointsConfig, GeocoderConfig, GridConfig,
    PlacesConfig, SeismicConfig, TimeoutsConfig, ValidationResult,
};
pub use error::{ConfigError, LayerError, LayerErrorKind, NetworkError, ReqwestErrorExt};
pub use geo::{BoundingBox, Coordinate, CoordinateError};
pub use layer::{GeoFeature, Geometry, ImageryInfo, LayerMetadata, LayerResult, Position, Properties};

use anyhow::Result;

/// Initialize tracing/logging for binaries
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?;

    tracing::info!("Geolayer core initialized");
    Ok(())
}
