use geolayer_core::{BoundingBox, Coordinate, GeoFeature, GridConfig, Properties};
use h3o::Resolution;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use thiserror::Error;

use crate::apportion::apportion;
use crate::hexgrid::{cell_to_feature, distance_factor, generate_grid, interpolate_value};

#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("Invalid H3 resolution: {0}")]
    InvalidResolution(u8),
}

/// Grid density: countries and regions versus a city-sized weather grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridScale {
    Regional,
    Local,
}

/// What to spread, and where.
#[derive(Debug, Clone)]
pub struct SynthesisRequest<'a> {
    pub region: BoundingBox,
    /// Point the grid grows out from; its cell survives any cap.
    pub anchor: Coordinate,
    pub value: f64,
    /// Extensive quantities (counts) are split across cells; intensive ones
    /// (densities, temperatures) are perturbed around the same base.
    pub extensive: bool,
    pub scale: GridScale,
    pub subdivisions: Option<&'a [GeoFeature]>,
    /// Copied onto every emitted feature.
    pub properties: Properties,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynthesisMethod {
    Subdivisions,
    HexGrid { resolution: u8 },
}

#[derive(Debug, Clone)]
pub struct Synthesis {
    pub features: Vec<GeoFeature>,
    pub method: SynthesisMethod,
}

/// Turns a single scalar into a renderable polygon layer.
///
/// The RNG lock is only held for the synchronous body of [`synthesize`](Self::synthesize).
pub struct SpatialSynthesizer {
    settings: GridConfig,
    rng: Mutex<StdRng>,
}

impl SpatialSynthesizer {
    pub fn new(settings: GridConfig) -> Self {
        Self::with_rng(settings, StdRng::from_os_rng())
    }

    pub fn with_rng(settings: GridConfig, rng: StdRng) -> Self {
        Self {
            settings,
            rng: Mutex::new(rng),
        }
    }

    pub fn seeded(settings: GridConfig, seed: u64) -> Self {
        Self::with_rng(settings, StdRng::seed_from_u64(seed))
    }

    fn resolution(&self, scale: GridScale) -> Result<Resolution, SynthesisError> {
        let raw = match scale {
            GridScale::Regional => self.settings.regional_resolution,
            GridScale::Local => self.settings.local_resolution,
        };
        Resolution::try_from(raw).map_err(|_| SynthesisError::InvalidResolution(raw))
    }

    /// Apportion across subdivisions when more than `min_subdivisions` are
    /// given, otherwise interpolate over a capped hex grid.
    pub fn synthesize(&self, request: &SynthesisRequest<'_>) -> Result<Synthesis, SynthesisError> {
        let mut rng = self.rng.lock();

        if let Some(subdivisions) = request
            .subdivisions
            .filter(|s| s.len() > self.settings.min_subdivisions)
        {
            let share = if request.extensive {
                request.value / subdivisions.len() as f64
            } else {
                request.value
            };
            tracing::debug!("Apportioning across {} subdivisions", subdivisions.len());
            return Ok(Synthesis {
                features: apportion(subdivisions, share, &request.properties, &mut *rng),
                method: SynthesisMethod::Subdivisions,
            });
        }

        let resolution = self.resolution(request.scale)?;
        let mut cells = generate_grid(&request.region, request.anchor, resolution);
        cells.truncate(self.settings.max_cells);
        if cells.is_empty() {
            return Ok(Synthesis {
                features: Vec::new(),
                method: SynthesisMethod::HexGrid {
                    resolution: u8::from(resolution),
                },
            });
        }

        let base = if request.extensive {
            request.value / cells.len() as f64
        } else {
            request.value
        };

        let features = cells
            .into_iter()
            .map(|cell| {
                let d = distance_factor(cell, &request.region, &mut *rng);
                let mut properties = request.properties.clone();
                properties.insert("h3_index".into(), cell.to_string().into());
                properties.insert("value".into(), interpolate_value(base, d).into());
                cell_to_feature(cell, properties)
            })
            .collect::<Vec<_>>();

        tracing::debug!(
            "Synthesized {} cells at resolution {}",
            features.len(),
            u8::from(resolution)
        );
        Ok(Synthesis {
            features,
            method: SynthesisMethod::HexGrid {
                resolution: u8::from(resolution),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn japan() -> BoundingBox {
        BoundingBox::new(30.0, 46.0, 128.0, 146.0).unwrap()
    }

    fn request<'a>(value: f64, extensive: bool) -> SynthesisRequest<'a> {
        let mut properties = Properties::new();
        properties.insert("unit".into(), "people".into());
        SynthesisRequest {
            region: japan(),
            anchor: Coordinate::new(35.68, 139.69).unwrap(),
            value,
            extensive,
            scale: GridScale::Regional,
            subdivisions: None,
            properties,
        }
    }

    fn values(synthesis: &Synthesis) -> Vec<f64> {
        synthesis
            .features
            .iter()
            .map(|f| f.property("value").and_then(|v| v.as_f64()).unwrap())
            .collect()
    }

    #[test]
    fn test_hex_grid_capped_and_closed() {
        let synth = SpatialSynthesizer::seeded(GridConfig::default(), 1);
        let synthesis = synth.synthesize(&request(1_000_000.0, true)).unwrap();

        assert_eq!(synthesis.method, SynthesisMethod::HexGrid { resolution: 4 });
        assert!(!synthesis.features.is_empty());
        assert!(synthesis.features.len() <= 150);
        assert!(synthesis.features.iter().all(|f| f.geometry.rings_closed()));

        let ids: HashSet<_> = synthesis
            .features
            .iter()
            .filter_map(|f| f.property("h3_index").and_then(|v| v.as_str()))
            .collect();
        assert_eq!(ids.len(), synthesis.features.len());
    }

    #[test]
    fn test_anchor_cell_survives_cap() {
        let tokyo = Coordinate::new(35.68, 139.69).unwrap();
        let mut req = request(1_000_000.0, true);
        req.region = BoundingBox::around(tokyo, 5.0);
        req.anchor = tokyo;

        let synth = SpatialSynthesizer::seeded(GridConfig::default(), 6);
        let synthesis = synth.synthesize(&req).unwrap();
        assert_eq!(synthesis.features.len(), 150);

        let anchor_cell = h3o::LatLng::new(35.68, 139.69)
            .unwrap()
            .to_cell(Resolution::Four)
            .to_string();
        assert_eq!(
            synthesis.features[0].property("h3_index").and_then(|v| v.as_str()),
            Some(anchor_cell.as_str())
        );

        // The kept band straddles the anchor instead of hugging the southern edge.
        let lats: Vec<f64> = synthesis
            .features
            .iter()
            .filter_map(|f| match &f.geometry {
                geolayer_core::Geometry::Polygon(rings) => rings[0].first().map(|p| p[1]),
                _ => None,
            })
            .collect();
        assert!(lats.iter().any(|&lat| lat > 35.68));
        assert!(lats.iter().any(|&lat| lat < 35.68));
    }

    #[test]
    fn test_extensive_values_bounded_by_share() {
        let synth = SpatialSynthesizer::seeded(GridConfig::default(), 2);
        let synthesis = synth.synthesize(&request(1_000_000.0, true)).unwrap();
        let base = 1_000_000.0 / synthesis.features.len() as f64;
        for value in values(&synthesis) {
            assert!(value >= base * 0.85 - 1e-6 && value <= base * 1.15 + 1e-6);
        }
    }

    #[test]
    fn test_intensive_values_bounded_by_scalar() {
        let synth = SpatialSynthesizer::seeded(GridConfig::default(), 3);
        let synthesis = synth.synthesize(&request(20.0, false)).unwrap();
        for value in values(&synthesis) {
            assert!((17.0 - 1e-9..=23.0 + 1e-9).contains(&value));
        }
    }

    #[test]
    fn test_front_truncation() {
        let settings = GridConfig {
            max_cells: 5,
            ..GridConfig::default()
        };
        let full = SpatialSynthesizer::seeded(GridConfig::default(), 4)
            .synthesize(&request(10.0, true))
            .unwrap();
        let capped = SpatialSynthesizer::seeded(settings, 4)
            .synthesize(&request(10.0, true))
            .unwrap();

        assert_eq!(capped.features.len(), 5);
        for (a, b) in capped.features.iter().zip(&full.features) {
            assert_eq!(a.property("h3_index"), b.property("h3_index"));
        }
    }

    #[test]
    fn test_same_seed_same_layer() {
        let a = SpatialSynthesizer::seeded(GridConfig::default(), 9)
            .synthesize(&request(5_000.0, true))
            .unwrap();
        let b = SpatialSynthesizer::seeded(GridConfig::default(), 9)
            .synthesize(&request(5_000.0, true))
            .unwrap();
        assert_eq!(values(&a), values(&b));
    }

    #[test]
    fn test_subdivisions_used_above_threshold() {
        use geolayer_core::Geometry;
        let square = |x: f64| {
            GeoFeature::new(Geometry::Polygon(vec![vec![
                [x, 0.0],
                [x + 1.0, 0.0],
                [x + 1.0, 1.0],
                [x, 0.0],
            ]]))
        };
        let four: Vec<GeoFeature> = (0..4).map(|i| square(i as f64)).collect();
        let three = &four[..3];

        let synth = SpatialSynthesizer::seeded(GridConfig::default(), 5);
        let mut req = request(400.0, true);
        req.subdivisions = Some(&four);
        let synthesis = synth.synthesize(&req).unwrap();
        assert_eq!(synthesis.method, SynthesisMethod::Subdivisions);
        assert_eq!(synthesis.features.len(), 4);
        for value in values(&synthesis) {
            assert!((70.0..=130.0).contains(&value));
        }

        req.subdivisions = Some(three);
        let synthesis = synth.synthesize(&req).unwrap();
        assert!(matches!(synthesis.method, SynthesisMethod::HexGrid { .. }));
    }

    #[test]
    fn test_invalid_resolution() {
        let settings = GridConfig {
            regional_resolution: 16,
            ..GridConfig::default()
        };
        let synth = SpatialSynthesizer::seeded(settings, 0);
        assert!(matches!(
            synth.synthesize(&request(1.0, true)),
            Err(SynthesisError::InvalidResolution(16))
        ));
    }
}
