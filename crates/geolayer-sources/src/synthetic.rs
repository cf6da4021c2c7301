//! Offline demographic estimates; the terminal link of the demographic chain.

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::country::{country_name, lookup_country_code};
use crate::provider::Estimator;
use crate::types::{DemographicMetric, DemographicQuery, DemographicRecord};

const ESTIMATE_YEAR: &str = "2024";
const DEFAULT_POPULATION: f64 = 50_000_000.0;
const DEFAULT_DENSITY: f64 = 100.0;

struct CountryEstimate {
    name: &'static str,
    population: f64,
    density: f64,
}

const ESTIMATES: &[CountryEstimate] = &[
    CountryEstimate { name: "Brazil", population: 215_313_498.0, density: 25.4 },
    CountryEstimate { name: "China", population: 1_439_323_776.0, density: 153.0 },
    CountryEstimate { name: "India", population: 1_380_004_385.0, density: 464.0 },
    CountryEstimate { name: "USA", population: 331_002_651.0, density: 36.0 },
    CountryEstimate { name: "Russia", population: 145_934_462.0, density: 8.8 },
    CountryEstimate { name: "Japan", population: 126_476_461.0, density: 347.0 },
    CountryEstimate { name: "Germany", population: 83_783_942.0, density: 240.0 },
    CountryEstimate { name: "UK", population: 67_886_011.0, density: 281.0 },
    CountryEstimate { name: "France", population: 65_273_511.0, density: 119.0 },
    CountryEstimate { name: "Italy", population: 60_461_826.0, density: 206.0 },
    CountryEstimate { name: "Spain", population: 46_754_778.0, density: 94.0 },
    CountryEstimate { name: "Canada", population: 37_742_154.0, density: 4.2 },
    CountryEstimate { name: "Australia", population: 25_499_884.0, density: 3.3 },
    CountryEstimate { name: "Mexico", population: 128_932_753.0, density: 66.0 },
    CountryEstimate { name: "South Korea", population: 51_269_185.0, density: 527.0 },
];

fn find_estimate(location: &str) -> Option<&'static CountryEstimate> {
    let lowered = location.to_lowercase();
    ESTIMATES
        .iter()
        .find(|e| lowered.contains(&e.name.to_lowercase()))
        .or_else(|| {
            let name = lookup_country_code(location).and_then(country_name)?;
            ESTIMATES.iter().find(|e| e.name == name)
        })
}

/// Total estimator with a ±2 % jitter drawn from its own RNG.
pub struct SyntheticEstimator {
    rng: Mutex<StdRng>,
}

impl SyntheticEstimator {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }

    pub fn with_rng(rng: StdRng) -> Self {
        Self { rng: Mutex::new(rng) }
    }

    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }
}

impl Default for SyntheticEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl Estimator for SyntheticEstimator {
    type Query = DemographicQuery;
    type Record = DemographicRecord;

    fn name(&self) -> &str {
        "Estimated Data"
    }

    fn estimate(&self, query: &DemographicQuery) -> DemographicRecord {
        let (country, value) = match find_estimate(&query.location) {
            Some(estimate) => {
                let variance = self.rng.lock().random_range(0.98..=1.02);
                let base = match query.metric {
                    DemographicMetric::Population => estimate.population,
                    DemographicMetric::Density => estimate.density,
                };
                (estimate.name.to_string(), base * variance)
            }
            None => {
                let base = match query.metric {
                    DemographicMetric::Population => DEFAULT_POPULATION,
                    DemographicMetric::Density => DEFAULT_DENSITY,
                };
                (query.location.clone(), base)
            }
        };

        let value = match query.metric {
            DemographicMetric::Population => value.round(),
            DemographicMetric::Density => value,
        };

        DemographicRecord {
            country,
            metric: query.metric,
            value,
            year: ESTIMATE_YEAR.to_string(),
            source: self.name().to_string(),
        }
    }
}
