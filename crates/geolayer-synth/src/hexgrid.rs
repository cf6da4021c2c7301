//! H3 hexagon coverage of a bounding box.

use geolayer_core::{BoundingBox, Coordinate, GeoFeature, Geometry, Position, Properties};
use h3o::{CellIndex, LatLng, Resolution};
use rand::Rng;
use std::collections::HashSet;

/// Lattice intervals per axis; the lattice has `LATTICE_STEPS + 1` samples per side.
pub const LATTICE_STEPS: usize = 20;

/// Relative amplitude of the per-cell perturbation.
pub const VARIANCE_SCALE: f64 = 0.3;

/// Cells covering `region`, nearest to `focus` first, duplicates removed.
///
/// Samples a 21×21 lattice spanning the box (edges included) and maps each
/// sample to its enclosing cell. The cell containing `focus` always comes
/// first, so truncating the list keeps the neighbourhood of the anchor.
/// This is a sampling, not a tiling: when the lattice step is wider than a
/// cell, cells between samples are skipped.
pub fn generate_grid(region: &BoundingBox, focus: Coordinate, resolution: Resolution) -> Vec<CellIndex> {
    let steps = LATTICE_STEPS as f64;
    let lat_step = region.height() / steps;
    let lon_step = region.width() / steps;

    let mut samples = Vec::with_capacity((LATTICE_STEPS + 1) * (LATTICE_STEPS + 1));
    for i in 0..=LATTICE_STEPS {
        let lat = region.min_lat + i as f64 * lat_step;
        for j in 0..=LATTICE_STEPS {
            samples.push((lat, region.min_lon + j as f64 * lon_step));
        }
    }

    // Longitude degrees shrink towards the poles.
    let lon_scale = focus.latitude.to_radians().cos();
    let distance = |(lat, lon): (f64, f64)| {
        let dy = lat - focus.latitude;
        let dx = (lon - focus.longitude) * lon_scale;
        dx * dx + dy * dy
    };
    samples.sort_by(|a, b| distance(*a).total_cmp(&distance(*b)));

    let mut seen = HashSet::new();
    let mut cells = Vec::new();
    let focus_sample = (focus.latitude, focus.longitude);
    for (lat, lon) in std::iter::once(focus_sample).chain(samples) {
        let Ok(sample) = LatLng::new(lat, lon) else {
            continue;
        };
        let cell = sample.to_cell(resolution);
        if seen.insert(cell) {
            cells.push(cell);
        }
    }
    cells
}

/// Polygon feature for a cell with a closed outer ring.
pub fn cell_to_feature(cell: CellIndex, properties: Properties) -> GeoFeature {
    let mut ring: Vec<Position> = cell.boundary().iter().map(|v| [v.lng(), v.lat()]).collect();
    if let Some(first) = ring.first().copied() {
        ring.push(first);
    }
    GeoFeature::with_properties(Geometry::Polygon(vec![ring]), properties)
}

/// `center_value + (0.5 - distance_factor) * center_value * 0.3`
///
/// With `distance_factor` in `[0, 1]` the result stays within
/// `[0.85, 1.15] * center_value`.
pub fn interpolate_value(center_value: f64, distance_factor: f64) -> f64 {
    let variance = (0.5 - distance_factor) * center_value * VARIANCE_SCALE;
    center_value + variance
}

/// Blend of the cell's normalized distance from the box center and a random draw.
///
/// Distance is measured in box-relative units so that a corner is 1.0; the
/// result is always in `[0, 1]`.
pub fn distance_factor<R: Rng + ?Sized>(cell: CellIndex, region: &BoundingBox, rng: &mut R) -> f64 {
    let point = LatLng::from(cell);
    let center = region.center();

    let relative = |offset: f64, half_extent: f64| {
        if half_extent > 0.0 {
            offset / half_extent
        } else {
            0.0
        }
    };
    let dy = relative(point.lat() - center.latitude, region.height() / 2.0);
    let dx = relative(point.lng() - center.longitude, region.width() / 2.0);
    let radial = ((dx * dx + dy * dy).sqrt() / std::f64::consts::SQRT_2).clamp(0.0, 1.0);

    0.5 * radial + 0.5 * rng.random::<f64>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn japan() -> BoundingBox {
        BoundingBox::new(30.0, 40.0, 130.0, 140.0).unwrap()
    }

    fn tokyo() -> Coordinate {
        Coordinate::new(35.68, 139.69).unwrap()
    }

    #[test]
    fn test_grid_is_distinct_and_nonempty() {
        let cells = generate_grid(&japan(), tokyo(), Resolution::Four);
        assert!(!cells.is_empty());
        let unique: HashSet<_> = cells.iter().collect();
        assert_eq!(unique.len(), cells.len());
        assert!(cells.iter().all(|c| c.resolution() == Resolution::Four));
    }

    #[test]
    fn test_grid_bounded_by_lattice() {
        let cells = generate_grid(&japan(), tokyo(), Resolution::Two);
        assert!(cells.len() <= (LATTICE_STEPS + 1) * (LATTICE_STEPS + 1) + 1);
    }

    #[test]
    fn test_degenerate_box_yields_single_cell() {
        let point = BoundingBox::new(35.0, 35.0, 139.0, 139.0).unwrap();
        let focus = Coordinate::new(35.0, 139.0).unwrap();
        assert_eq!(generate_grid(&point, focus, Resolution::Five).len(), 1);
    }

    #[test]
    fn test_grid_starts_at_focus() {
        let cells = generate_grid(&japan(), tokyo(), Resolution::Four);
        let anchor = LatLng::new(35.68, 139.69).unwrap().to_cell(Resolution::Four);
        assert_eq!(cells[0], anchor);

        // Cells fan out from the focus: the first few sit closer to it than the last.
        let lat_of = |cell: CellIndex| LatLng::from(cell).lat();
        let near = (lat_of(cells[1]) - 35.68).abs();
        let far = (lat_of(cells[cells.len() - 1]) - 35.68).abs();
        assert!(near < far);
    }

    #[test]
    fn test_cell_ring_closed() {
        let cell = generate_grid(&japan(), tokyo(), Resolution::Four)[0];
        let feature = cell_to_feature(cell, Properties::new());
        assert!(feature.geometry.rings_closed());
        match &feature.geometry {
            Geometry::Polygon(rings) => assert!(rings[0].len() >= 6),
            other => panic!("expected polygon, got {:?}", other),
        }
    }

    #[test]
    fn test_interpolate_value() {
        assert_eq!(interpolate_value(100.0, 0.5), 100.0);
        assert!((interpolate_value(100.0, 0.0) - 115.0).abs() < 1e-9);
        assert!((interpolate_value(100.0, 1.0) - 85.0).abs() < 1e-9);
    }

    #[test]
    fn test_distance_factor_range() {
        let region = japan();
        let mut rng = StdRng::seed_from_u64(3);
        for cell in generate_grid(&region, tokyo(), Resolution::Four) {
            let d = distance_factor(cell, &region, &mut rng);
            assert!((0.0..=1.0).contains(&d));
        }
    }
}
