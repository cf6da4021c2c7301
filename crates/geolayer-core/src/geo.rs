//! Geographic primitives: WGS84 coordinates and axis-aligned bounding boxes.
//!
//! Boxes never wrap the antimeridian; `min_lon <= max_lon` always holds.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation failures for coordinates and boxes.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordinateError {
    #[error("Latitude out of range: {0}")]
    LatitudeOutOfRange(f64),

    #[error("Longitude out of range: {0}")]
    LongitudeOutOfRange(f64),

    #[error("Inverted bounding box: {0}")]
    InvertedBox(String),
}

/// A WGS84 point in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    /// Create a coordinate, rejecting values outside the WGS84 ranges.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, CoordinateError> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(CoordinateError::LatitudeOutOfRange(latitude));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(CoordinateError::LongitudeOutOfRange(longitude));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// GeoJSON position order: `[lon, lat]`.
    pub fn to_position(self) -> [f64; 2] {
        [self.longitude, self.latitude]
    }
}

/// Axis-aligned box in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    pub fn new(
        min_lat: f64,
        max_lat: f64,
        min_lon: f64,
        max_lon: f64,
    ) -> Result<Self, CoordinateError> {
        if min_lat > max_lat || min_lon > max_lon {
            return Err(CoordinateError::InvertedBox(format!(
                "lat [{}, {}], lon [{}, {}]",
                min_lat, max_lat, min_lon, max_lon
            )));
        }
        Coordinate::new(min_lat, min_lon)?;
        Coordinate::new(max_lat, max_lon)?;
        Ok(Self {
            min_lat,
            max_lat,
            min_lon,
            max_lon,
        })
    }

    /// Symmetric box of `offset_deg` around `center`, clamped to valid ranges.
    ///
    /// This is the default region used whenever the geocoder returns no box.
    pub fn around(center: Coordinate, offset_deg: f64) -> Self {
        let offset = offset_deg.abs();
        Self {
            min_lat: (center.latitude - offset).max(-90.0),
            max_lat: (center.latitude + offset).min(90.0),
            min_lon: (center.longitude - offset).max(-180.0),
            max_lon: (center.longitude + offset).min(180.0),
        }
    }

    pub fn center(&self) -> Coordinate {
        Coordinate {
            latitude: (self.min_lat + self.max_lat) / 2.0,
            longitude: (self.min_lon + self.max_lon) / 2.0,
        }
    }

    pub fn height(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    pub fn width(&self) -> f64 {
        self.max_lon - self.min_lon
    }
}
