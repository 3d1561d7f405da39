pub mod alert;
pub mod measurement;
pub mod settings;

pub use alert::*;
pub use measurement::*;
pub use settings::*;
