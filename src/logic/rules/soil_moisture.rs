use super::{AlertDraft, Decision, Rule};
use crate::models::{AlertKind, Sample, Thresholds};

/// Soil moisture / irrigation rule
///
/// Dry soil raises an irrigation alert and, with `regra_auto_bomba` enabled,
/// switches the pump on. With the auto rule disabled the pump keeps whatever
/// state it had. Soil at or above the minimum always switches the pump off.
pub struct SoilMoistureRule;

impl Rule for SoilMoistureRule {
    fn id(&self) -> &'static str {
        "soil_moisture"
    }

    fn name(&self) -> &'static str {
        "Soil Moisture Irrigation"
    }

    fn apply(&self, sample: &Sample, thresholds: &Thresholds, decision: &mut Decision) {
        let soil = sample.soil_humidity;

        if soil < thresholds.soil_humidity_min {
            decision.raise(AlertDraft::new(
                AlertKind::Irrigation,
                format!(
                    "Soil humidity low: {:.2}% (minimum {:.1}%)",
                    soil, thresholds.soil_humidity_min
                ),
                soil,
            ));
            if thresholds.auto_pump {
                decision.pump_active = true;
            }
        } else {
            decision.pump_active = false;
        }
    }
}
