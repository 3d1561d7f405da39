use super::{
    air_humidity::AirHumidityRule, soil_moisture::SoilMoistureRule,
    temperature::TemperatureRule, Rule,
};
use crate::models::{Alert, AlertKind, Sample, Thresholds};
use chrono::{DateTime, Utc};

/// An alert raised by a rule, before it is stamped and stored.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertDraft {
    pub kind: AlertKind,
    pub message: String,
    pub measured_value: Option<f64>,
}

impl AlertDraft {
    pub fn new(kind: AlertKind, message: impl Into<String>, value: f64) -> Self {
        Self {
            kind,
            message: message.into(),
            measured_value: Some(value),
        }
    }

    pub fn into_alert(self, timestamp: DateTime<Utc>) -> Alert {
        Alert {
            id: None,
            timestamp,
            kind: self.kind,
            message: self.message,
            measured_value: self.measured_value,
        }
    }
}

/// Outcome of one evaluation: alerts to raise and the pump state to apply.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub alerts: Vec<AlertDraft>,
    pub pump_active: bool,
}

impl Decision {
    fn starting_from(pump_active: bool) -> Self {
        Self {
            alerts: Vec::new(),
            pump_active,
        }
    }

    pub fn raise(&mut self, alert: AlertDraft) {
        self.alerts.push(alert);
    }

    /// `Some(new_state)` when the pump flips relative to `before`.
    pub fn pump_changed(&self, before: bool) -> Option<bool> {
        (self.pump_active != before).then_some(self.pump_active)
    }
}

pub struct RulesEngine {
    rules: Vec<Box<dyn Rule>>,
}

impl RulesEngine {
    pub fn new() -> Self {
        // Order matters: soil moisture owns the pump and runs after temperature.
        let rules: Vec<Box<dyn Rule>> = vec![
            Box::new(TemperatureRule),
            Box::new(SoilMoistureRule),
            Box::new(AirHumidityRule),
        ];

        Self { rules }
    }

    /// Pure: identical inputs always give identical decisions.
    pub fn evaluate(&self, sample: &Sample, thresholds: &Thresholds, pump_before: bool) -> Decision {
        let mut decision = Decision::starting_from(pump_before);
        for rule in &self.rules {
            rule.apply(sample, thresholds, &mut decision);
        }
        decision
    }

    pub fn list_rules(&self) -> Vec<(&'static str, &'static str)> {
        self.rules.iter().map(|r| (r.id(), r.name())).collect()
    }
}

impl Default for RulesEngine {
    fn default() -> Self {
        Self::new()
    }
}
