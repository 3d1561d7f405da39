use super::{AlertDraft, Decision, Rule};
use crate::models::{AlertKind, Sample, Thresholds};

/// Temperature band rule
///
/// Raises a single alert when the reading leaves `[temp_min, temp_max]`.
/// Does not touch the pump.
pub struct TemperatureRule;

impl Rule for TemperatureRule {
    fn id(&self) -> &'static str {
        "temperature"
    }

    fn name(&self) -> &'static str {
        "Temperature Band"
    }

    fn apply(&self, sample: &Sample, thresholds: &Thresholds, decision: &mut Decision) {
        let temp = sample.temperature;

        let message = if temp > thresholds.temp_max {
            format!(
                "Temperature high: {:.2}°C (allowed {:.1}°C to {:.1}°C)",
                temp, thresholds.temp_min, thresholds.temp_max
            )
        } else if temp < thresholds.temp_min {
            format!(
                "Temperature low: {:.2}°C (allowed {:.1}°C to {:.1}°C)",
                temp, thresholds.temp_min, thresholds.temp_max
            )
        } else {
            return;
        };

        decision.raise(AlertDraft::new(AlertKind::Temperature, message, temp));
    }
}
