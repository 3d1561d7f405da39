pub mod air_humidity;
pub mod engine;
pub mod soil_moisture;
pub mod temperature;

pub use engine::{AlertDraft, Decision, RulesEngine};

use crate::models::{Sample, Thresholds};

/// Trait for threshold rules.
///
/// Rules run in a fixed order against one shared [`Decision`]. They may add
/// alerts and overwrite the pump state; a later rule sees the pump state left
/// by earlier ones but never reacts to their alerts.
pub trait Rule: Send + Sync {
    /// Unique identifier for this rule
    fn id(&self) -> &'static str;

    /// Human-readable name
    fn name(&self) -> &'static str;

    fn apply(&self, sample: &Sample, thresholds: &Thresholds, decision: &mut Decision);
}
