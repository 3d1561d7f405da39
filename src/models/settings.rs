use std::time::Duration;

/// Parameter names as stored in the `config` table.
pub mod keys {
    pub const INTERVAL_SECONDS: &str = "intervalo_segundos";
    pub const TEMP_MIN: &str = "temp_min";
    pub const TEMP_MAX: &str = "temp_max";
    pub const SOIL_HUMIDITY_MIN: &str = "umidade_solo_min";
    pub const AIR_HUMIDITY_MIN: &str = "umidade_ar_min";
    pub const AUTO_PUMP_RULE: &str = "regra_auto_bomba";
    pub const SIM_TEMP_VARIANCE: &str = "sim_variacao_temp";
    pub const SIM_HUMIDITY_VARIANCE: &str = "sim_variacao_umidade";
}

/// Typed view of a stored text parameter.
///
/// `parse_setting` returns `None` for malformed text; callers fall back to
/// their own default.
pub trait FromSetting: Sized {
    fn parse_setting(raw: &str) -> Option<Self>;
}

impl FromSetting for String {
    fn parse_setting(raw: &str) -> Option<Self> {
        Some(raw.to_string())
    }
}

impl FromSetting for f64 {
    fn parse_setting(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let digits = raw.strip_prefix(|c: char| c == '-' || c == '+').unwrap_or(raw);
        let valid = digits.chars().any(|c| c.is_ascii_digit())
            && digits.chars().all(|c| c.is_ascii_digit() || c == '.')
            && digits.chars().filter(|&c| c == '.').count() <= 1;
        if !valid {
            return None;
        }
        // Long digit strings overflow to infinity rather than failing.
        raw.parse().ok().filter(|v: &f64| v.is_finite())
    }
}

impl FromSetting for i64 {
    fn parse_setting(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let digits = raw.strip_prefix(|c: char| c == '-' || c == '+').unwrap_or(raw);
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        raw.parse().ok()
    }
}

impl FromSetting for bool {
    fn parse_setting(raw: &str) -> Option<Self> {
        Some(matches!(
            raw.trim().to_lowercase().as_str(),
            "1" | "true" | "yes" | "sim" | "y"
        ))
    }
}

/// Numeric boundaries consumed by the rules engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub temp_min: f64,
    pub temp_max: f64,
    pub soil_humidity_min: f64,
    pub air_humidity_min: f64,
    pub auto_pump: bool,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            temp_min: 18.0,
            temp_max: 30.0,
            soil_humidity_min: 30.0,
            air_humidity_min: 30.0,
            auto_pump: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationSettings {
    pub temp_variance: f64,
    pub humidity_variance: f64,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            temp_variance: 0.8,
            humidity_variance: 1.5,
        }
    }
}

/// Snapshot of every parameter one control cycle needs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopSettings {
    pub interval: Duration,
    pub thresholds: Thresholds,
    pub simulation: SimulationSettings,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            thresholds: Thresholds::default(),
            simulation: SimulationSettings::default(),
        }
    }
}

impl LoopSettings {
    /// Builds a snapshot from raw stored values. Absent or malformed values
    /// take the built-in default.
    pub fn from_lookup<F>(mut lookup: F) -> Self
    where
        F: FnMut(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let mut typed = |name: &str| -> Option<f64> {
            let raw = lookup(name)?;
            let value = f64::parse_setting(&raw);
            if value.is_none() {
                tracing::debug!(name, value = %raw, "Ignoring malformed parameter");
            }
            value
        };

        // Sub-second intervals are accepted; non-positive or unrepresentable
        // values fall back.
        let interval = typed(keys::INTERVAL_SECONDS)
            .filter(|secs| *secs > 0.0)
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
            .unwrap_or(defaults.interval);

        let thresholds = Thresholds {
            temp_min: typed(keys::TEMP_MIN).unwrap_or(defaults.thresholds.temp_min),
            temp_max: typed(keys::TEMP_MAX).unwrap_or(defaults.thresholds.temp_max),
            soil_humidity_min: typed(keys::SOIL_HUMIDITY_MIN)
                .unwrap_or(defaults.thresholds.soil_humidity_min),
            air_humidity_min: typed(keys::AIR_HUMIDITY_MIN)
                .unwrap_or(defaults.thresholds.air_humidity_min),
            auto_pump: defaults.thresholds.auto_pump,
        };

        let simulation = SimulationSettings {
            temp_variance: typed(keys::SIM_TEMP_VARIANCE)
                .unwrap_or(defaults.simulation.temp_variance),
            humidity_variance: typed(keys::SIM_HUMIDITY_VARIANCE)
                .unwrap_or(defaults.simulation.humidity_variance),
        };

        let auto_pump = lookup(keys::AUTO_PUMP_RULE)
            .and_then(|raw| bool::parse_setting(&raw))
            .unwrap_or(defaults.thresholds.auto_pump);

        Self {
            interval,
            thresholds: Thresholds {
                auto_pump,
                ..thresholds
            },
            simulation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn bool_accepts_truthy_words_case_insensitively() {
        for raw in ["1", "true", "TRUE", "Yes", "sim", "SIM", "y", " y "] {
            assert_eq!(bool::parse_setting(raw), Some(true), "{raw}");
        }
        for raw in ["0", "false", "no", "nao", "", "on"] {
            assert_eq!(bool::parse_setting(raw), Some(false), "{raw}");
        }
    }

    #[test]
    fn float_parsing_is_strict() {
        assert_eq!(f64::parse_setting("30.0"), Some(30.0));
        assert_eq!(f64::parse_setting("18"), Some(18.0));
        assert_eq!(f64::parse_setting("-2.5"), Some(-2.5));
        assert_eq!(f64::parse_setting(".5"), Some(0.5));
        assert_eq!(f64::parse_setting("1.2.3"), None);
        assert_eq!(f64::parse_setting("abc"), None);
        assert_eq!(f64::parse_setting("1e3"), None);
        assert_eq!(f64::parse_setting("inf"), None);
        assert_eq!(f64::parse_setting("."), None);
        assert_eq!(f64::parse_setting(""), None);
        assert_eq!(f64::parse_setting(&"9".repeat(400)), None);
    }

    #[test]
    fn int_parsing_is_strict() {
        assert_eq!(i64::parse_setting("5"), Some(5));
        assert_eq!(i64::parse_setting("-3"), Some(-3));
        assert_eq!(i64::parse_setting("5.0"), None);
        assert_eq!(i64::parse_setting("five"), None);
        assert_eq!(i64::parse_setting("-"), None);
    }

    #[test]
    fn snapshot_uses_defaults_when_nothing_is_stored() {
        let settings = LoopSettings::from_lookup(|_| None);
        assert_eq!(settings, LoopSettings::default());
    }

    #[test]
    fn snapshot_reads_stored_values_and_skips_malformed_ones() {
        let stored: HashMap<&str, &str> = [
            (keys::INTERVAL_SECONDS, "0.25"),
            (keys::TEMP_MIN, "12.5"),
            (keys::TEMP_MAX, "not-a-number"),
            (keys::AUTO_PUMP_RULE, "no"),
            (keys::SIM_HUMIDITY_VARIANCE, "3"),
        ]
        .into_iter()
        .collect();

        let settings = LoopSettings::from_lookup(|name| stored.get(name).map(|v| v.to_string()));
        assert_eq!(settings.interval, Duration::from_millis(250));
        assert_eq!(settings.thresholds.temp_min, 12.5);
        assert_eq!(settings.thresholds.temp_max, 30.0);
        assert!(!settings.thresholds.auto_pump);
        assert_eq!(settings.simulation.humidity_variance, 3.0);
        assert_eq!(settings.simulation.temp_variance, 0.8);
    }

    #[test]
    fn non_positive_interval_falls_back() {
        let settings = LoopSettings::from_lookup(|name| {
            (name == keys::INTERVAL_SECONDS).then(|| "0".to_string())
        });
        assert_eq!(settings.interval, Duration::from_secs(5));
    }

    #[test]
    fn oversized_interval_falls_back_instead_of_panicking() {
        let settings = LoopSettings::from_lookup(|name| {
            (name == keys::INTERVAL_SECONDS).then(|| "100000000000000000000".to_string())
        });
        assert_eq!(settings.interval, Duration::from_secs(5));
    }

    #[test]
    fn overflowing_variance_falls_back() {
        let huge = "9".repeat(400);
        let settings = LoopSettings::from_lookup(|name| {
            (name == keys::SIM_TEMP_VARIANCE).then(|| huge.clone())
        });
        assert_eq!(settings.simulation.temp_variance, 0.8);
    }
}
