pub mod control_loop;
pub mod events;
pub mod rules;

pub use control_loop::{ControlLoop, LoopOptions, LoopState, StopOutcome};
pub use rules::RulesEngine;
