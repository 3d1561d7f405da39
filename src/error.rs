use thiserror::Error;

#[derive(Error, Debug)]
pub enum GreenhouseError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Sensor read failed: {0}")]
    Sensor(String),

    #[error("Export failed: {0}")]
    Export(String),

    #[error("Database connection lock poisoned")]
    LockPoisoned,

    #[error("Control loop was abandoned after a stop timeout and cannot be restarted")]
    LoopAbandoned,
}

impl GreenhouseError {
    /// Storage-side failures, counted towards the consecutive-failure limit
    /// of the control loop.
    pub fn is_persistence(&self) -> bool {
        matches!(
            self,
            GreenhouseError::Database(_) | GreenhouseError::LockPoisoned
        )
    }
}

pub type Result<T> = std::result::Result<T, GreenhouseError>;
