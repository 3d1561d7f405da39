pub mod simulator;

pub use simulator::Simulator;

use crate::error::Result;
use crate::models::{Sample, SimulationSettings};

/// Produces one environmental sample per call.
///
/// The control loop only sees this trait, so a hardware-backed source can
/// replace the simulator without touching the rules or the loop.
pub trait ReadingSource: Send {
    fn name(&self) -> &'static str;

    fn read(&mut self, settings: &SimulationSettings) -> Result<Sample>;
}
