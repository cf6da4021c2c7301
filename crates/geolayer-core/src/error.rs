//! Error types for geolayer.
//!
//! [`LayerError`] is the terminal taxonomy folded into layer metadata;
//! [`NetworkError`] classifies HTTP faults inside the adapters.

use thiserror::Error;

/// Terminal failures of a layer request.
///
/// All variants collapse into the same observable shape
/// (`metadata.error = true` plus a summary string); the variant itself is
/// only used internally.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayerError {
    #[error("Location not found: {0}")]
    LocationNotFound(String),

    #[error("Upstream {provider} unavailable: {reason}")]
    UpstreamUnavailable { provider: String, reason: String },

    #[error("No data for region: {0}")]
    NoDataForRegion(String),

    #[error("Unknown data source: {0}")]
    UnknownSource(String),
}

/// Fieldless mirror of [`LayerError`] for cheap comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerErrorKind {
    LocationNotFound,
    UpstreamUnavailable,
    NoDataForRegion,
    UnknownSource,
}

impl LayerError {
    pub fn upstream(provider: impl Into<String>, reason: impl Into<String>) -> Self {
        LayerError::UpstreamUnavailable {
            provider: provider.into(),
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> LayerErrorKind {
        match self {
            LayerError::LocationNotFound(_) => LayerErrorKind::LocationNotFound,
            LayerError::UpstreamUnavailable { .. } => LayerErrorKind::UpstreamUnavailable,
            LayerError::NoDataForRegion(_) => LayerErrorKind::NoDataForRegion,
            LayerError::UnknownSource(_) => LayerErrorKind::UnknownSource,
        }
    }

    /// Human-readable summary placed in `metadata.summary`.
    pub fn summary(&self) -> String {
        match self {
            LayerError::LocationNotFound(location) => {
                format!("location not found: {}", location)
            }
            LayerError::UpstreamUnavailable { provider, .. } => {
                format!("{} is unavailable right now. Please try again later.", provider)
            }
            LayerError::NoDataForRegion(region) => format!("No data available for {}", region),
            LayerError::UnknownSource(source) => format!("Unknown data source: {}", source),
        }
    }
}

/// Network-related errors (HTTP, connectivity).
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Configuration parse error: {0}")]
    ParseError(String),
}

/// Extension trait for converting reqwest errors to our error types.
pub trait ReqwestErrorExt {
    fn into_network_error(self) -> NetworkError;
}

impl ReqwestErrorExt for reqwest::Error {
    fn into_network_error(self) -> NetworkError {
        if self.is_timeout() {
            NetworkError::Timeout
        } else if self.is_connect() {
            NetworkError::ConnectionFailed(self.to_string())
        } else if self.is_decode() {
            NetworkError::InvalidResponse(self.to_string())
        } else if let Some(status) = self.status() {
            NetworkError::ServerError {
                status: status.as_u16(),
                message: self.to_string(),
            }
        } else {
            NetworkError::ConnectionFailed(self.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mirrors_variant() {
        assert_eq!(
            LayerError::LocationNotFound("x".into()).kind(),
            LayerErrorKind::LocationNotFound
        );
        assert_eq!(
            LayerError::upstream("USGS", "HTTP 503").kind(),
            LayerErrorKind::UpstreamUnavailable
        );
        assert_eq!(
            LayerError::NoDataForRegion("Japan".into()).kind(),
            LayerErrorKind::NoDataForRegion
        );
        assert_eq!(
            LayerError::UnknownSource("astrology".into()).kind(),
            LayerErrorKind::UnknownSource
        );
    }

    #[test]
    fn test_summaries_are_user_facing() {
        assert_eq!(
            LayerError::LocationNotFound("Atlantis".into()).summary(),
            "location not found: Atlantis"
        );
        // Upstream reasons stay out of the summary.
        let summary = LayerError::upstream("Open-Meteo", "HTTP 502 Bad Gateway").summary();
        assert!(summary.contains("Open-Meteo"));
        assert!(!summary.contains("502"));
        assert!(LayerError::UnknownSource("astrology".into())
            .summary()
            .contains("astrology"));
    }
}
