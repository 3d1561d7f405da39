use super::ReadingSource;
use crate::error::Result;
use crate::models::{Sample, SimulationSettings};

const BASE_TEMPERATURE: f64 = 24.0;
const BASE_AIR_HUMIDITY: f64 = 50.0;
const BASE_SOIL_HUMIDITY: f64 = 45.0;

/// Uniform noise around fixed greenhouse baselines.
///
/// - temperature: 24.0 ± `temp_variance`
/// - air humidity: 50.0 ± `humidity_variance`
/// - soil humidity: 45.0 ± 2 × `humidity_variance`
///
/// Every value is rounded to two decimals.
pub struct Simulator {
    rng: fastrand::Rng,
}

impl Simulator {
    pub fn new() -> Self {
        Self {
            rng: fastrand::Rng::new(),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: fastrand::Rng::with_seed(seed),
        }
    }

    fn uniform(&mut self, center: f64, spread: f64) -> f64 {
        let spread = spread.abs();
        round2(center - spread + self.rng.f64() * 2.0 * spread)
    }
}

impl Default for Simulator {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadingSource for Simulator {
    fn name(&self) -> &'static str {
        "simulator"
    }

    fn read(&mut self, settings: &SimulationSettings) -> Result<Sample> {
        let temperature = self.uniform(BASE_TEMPERATURE, settings.temp_variance);
        let air_humidity = self.uniform(BASE_AIR_HUMIDITY, settings.humidity_variance);
        let soil_humidity = self.uniform(BASE_SOIL_HUMIDITY, 2.0 * settings.humidity_variance);

        Ok(Sample::new(temperature, air_humidity, soil_humidity))
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
