//! Spread a scalar across administrative subdivisions.
//!
//! Each subdivision receives `share × w` with `w` drawn from `U[0.7, 1.3]`.
//! Weights are not renormalized, so the values do not sum to the original
//! scalar. This is a visual approximation, not demographic modeling.

use geolayer_core::{GeoFeature, Properties};
use rand::Rng;
use std::ops::RangeInclusive;

pub const WEIGHT_RANGE: RangeInclusive<f64> = 0.7..=1.3;

/// Copy each subdivision with `properties` merged in and `value`/`weight` set.
pub fn apportion<R: Rng + ?Sized>(
    subdivisions: &[GeoFeature],
    share: f64,
    properties: &Properties,
    rng: &mut R,
) -> Vec<GeoFeature> {
    subdivisions
        .iter()
        .map(|subdivision| {
            let weight = rng.random_range(WEIGHT_RANGE);
            let mut feature = subdivision.clone();
            feature
                .properties
                .extend(properties.iter().map(|(k, v)| (k.clone(), v.clone())));
            feature
                .with_property("value", share * weight)
                .with_property("weight", weight)
        })
        .collect()
}
