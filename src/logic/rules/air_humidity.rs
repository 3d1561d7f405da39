use super::{AlertDraft, Decision, Rule};
use crate::models::{AlertKind, Sample, Thresholds};

pub struct AirHumidityRule;

impl Rule for AirHumidityRule {
    fn id(&self) -> &'static str {
        "air_humidity"
    }

    fn name(&self) -> &'static str {
        "Air Humidity Minimum"
    }

    fn apply(&self, sample: &Sample, thresholds: &Thresholds, decision: &mut Decision) {
        let air = sample.air_humidity;

        if air < thresholds.air_humidity_min {
            decision.raise(AlertDraft::new(
                AlertKind::AirHumidity,
                format!(
                    "Air humidity low: {:.2}% (minimum {:.1}%)",
                    air, thresholds.air_humidity_min
                ),
                air,
            ));
        }
    }
}
