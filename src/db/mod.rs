pub mod connection;
pub mod export;
pub mod migrations;
pub mod queries;
pub mod settings;

pub use connection::Database;
pub use queries::MeasurementSink;
