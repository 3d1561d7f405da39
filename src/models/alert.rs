use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertKind {
    Temperature,
    Irrigation,
    AirHumidity,
    Error,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::Temperature => "Temperature",
            AlertKind::Irrigation => "Irrigation",
            AlertKind::AirHumidity => "Air Humidity",
            AlertKind::Error => "Error",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "temperature" => Some(AlertKind::Temperature),
            "irrigation" => Some(AlertKind::Irrigation),
            "airhumidity" | "air humidity" | "air_humidity" => Some(AlertKind::AirHumidity),
            "error" => Some(AlertKind::Error),
            _ => None,
        }
    }
}

impl std::fmt::Display for AlertKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: Option<i64>,
    pub timestamp: DateTime<Utc>,
    pub kind: AlertKind,
    pub message: String,
    /// The exact reading that triggered the alert, when there is one.
    pub measured_value: Option<f64>,
}

impl Alert {
    pub fn new(kind: AlertKind, message: impl Into<String>) -> Self {
        Self {
            id: None,
            timestamp: Utc::now(),
            kind,
            message: message.into(),
            measured_value: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(AlertKind::Error, message)
    }

    pub fn with_value(mut self, value: f64) -> Self {
        self.measured_value = Some(value);
        self
    }
}
