use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One environmental reading as produced by a reading source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub temperature: f64,
    pub air_humidity: f64,
    pub soil_humidity: f64,
}

impl Sample {
    pub fn new(temperature: f64, air_humidity: f64, soil_humidity: f64) -> Self {
        Self {
            temperature,
            air_humidity,
            soil_humidity,
        }
    }
}

/// A persisted sample together with the pump state of its cycle.
///
/// The JSON form is the export record: `{id, timestamp, temperature,
/// airHumidity, soilHumidity, pumpActive}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Measurement {
    pub id: Option<i64>,
    pub timestamp: DateTime<Utc>,
    pub temperature: f64,
    pub air_humidity: f64,
    pub soil_humidity: f64,
    pub pump_active: bool,
}

impl Measurement {
    pub fn new(sample: Sample, pump_active: bool) -> Self {
        Self::captured_at(sample, pump_active, Utc::now())
    }

    pub fn captured_at(sample: Sample, pump_active: bool, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: None,
            timestamp,
            temperature: sample.temperature,
            air_humidity: sample.air_humidity,
            soil_humidity: sample.soil_humidity,
            pump_active,
        }
    }
}
