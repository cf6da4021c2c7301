//! Upstream data sources for geolayer
//!
//! Provides the rate-limited geocoder plus one adapter per external API,
//! all behind the uniform [`ProviderAdapter`] contract.

pub mod country;
pub mod geocode;
pub mod http;
pub mod imagery;
pub mod overpass;
pub mod provider;
pub mod rest_countries;
pub mod subdivision;
pub mod synthetic;
pub mod types;
pub mod usgs;
pub mod weather;
pub mod worldbank;

pub use types::*;
pub use geocode::{GeocodeError, Geocoder, PlaceResolver};
pub use imagery::ImageryProvider;
pub use overpass::OverpassProvider;
pub use provider::{Estimator, FallbackChain, ProviderAdapter, Resolved};
pub use rest_countries::RestCountriesProvider;
pub use subdivision::NaturalEarthSubdivisions;
pub use synthetic::SyntheticEstimator;
pub use usgs::UsgsProvider;
pub use weather::OpenMeteoProvider;
pub use worldbank::WorldBankProvider;
