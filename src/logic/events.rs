//! Observable control-loop events.
//!
//! The loop never writes log lines itself; it emits [`LoopEvent`]s through a
//! [`LoopObserver`]. The default [`TracingObserver`] forwards them to
//! `tracing`, tests record them.

use crate::models::{Alert, Sample};

#[derive(Debug, Clone, PartialEq)]
pub enum LoopEvent {
    Started,
    /// A start request arrived while the loop was already running.
    AlreadyRunning,
    CycleCompleted {
        measurement_id: i64,
        sample: Sample,
        pump_active: bool,
        alerts: usize,
    },
    AlertRaised(Alert),
    /// Fires only when the pump actually changes state.
    PumpSwitched { active: bool, manual: bool },
    CycleFailed { message: String, alert_persisted: bool },
    /// The loop gave up after repeated storage failures.
    Aborted { consecutive_failures: u32 },
    Stopped,
    /// The loop task died; its state is lost.
    Crashed { message: String },
    /// The loop task did not finish within the stop timeout, or crashed.
    Abandoned,
}

pub trait LoopObserver: Send + Sync {
    fn emit(&self, event: &LoopEvent);
}

pub struct TracingObserver;

impl LoopObserver for TracingObserver {
    fn emit(&self, event: &LoopEvent) {
        match event {
            LoopEvent::Started => tracing::info!("Control loop started"),
            LoopEvent::AlreadyRunning => {
                tracing::warn!("Control loop already running, ignoring start request")
            }
            LoopEvent::CycleCompleted {
                measurement_id,
                sample,
                pump_active,
                alerts,
            } => tracing::info!(
                id = measurement_id,
                temperature = sample.temperature,
                air_humidity = sample.air_humidity,
                soil_humidity = sample.soil_humidity,
                pump = pump_active,
                alerts,
                "Measurement recorded"
            ),
            LoopEvent::AlertRaised(alert) => tracing::warn!(
                kind = %alert.kind,
                value = ?alert.measured_value,
                "{}",
                alert.message
            ),
            LoopEvent::PumpSwitched { active, manual } => {
                let how = if *manual { "manually" } else { "by rule" };
                if *active {
                    tracing::info!("Pump switched on {}", how);
                } else {
                    tracing::info!("Pump switched off {}", how);
                }
            }
            LoopEvent::CycleFailed {
                message,
                alert_persisted,
            } => tracing::error!(alert_persisted, "Cycle failed: {}", message),
            LoopEvent::Aborted {
                consecutive_failures,
            } => tracing::error!(
                consecutive_failures,
                "Storage keeps failing, control loop aborted"
            ),
            LoopEvent::Stopped => tracing::info!("Control loop stopped"),
            LoopEvent::Crashed { message } => {
                tracing::error!("Control loop task failed: {}", message)
            }
            LoopEvent::Abandoned => tracing::warn!(
                "Control loop did not stop in time and was abandoned; the task may still be finishing"
            ),
        }
    }
}
