use crate::error::{GreenhouseError, Result};
use crate::models::settings::keys;
use dialoguer::Input;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub storage: StorageConfig,
    pub export: ExportConfig,
    pub control: ControlConfig,
    pub defaults: ParameterDefaults,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Relative paths are resolved against the data directory.
    pub path: PathBuf,
    pub limit: usize,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("measurements.json"),
            limit: 200,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ControlConfig {
    pub stop_timeout_secs: u64,
    pub max_persistence_failures: u32,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            stop_timeout_secs: 5,
            max_persistence_failures: 5,
        }
    }
}

/// Values seeded into the parameter store when a key is absent.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ParameterDefaults {
    pub intervalo_segundos: u64,
    pub temp_min: f64,
    pub temp_max: f64,
    pub umidade_solo_min: f64,
    pub umidade_ar_min: f64,
    pub regra_auto_bomba: bool,
    pub sim_variacao_temp: f64,
    pub sim_variacao_umidade: f64,
}

impl Default for ParameterDefaults {
    fn default() -> Self {
        Self {
            intervalo_segundos: 5,
            temp_min: 18.0,
            temp_max: 30.0,
            umidade_solo_min: 30.0,
            umidade_ar_min: 30.0,
            regra_auto_bomba: true,
            sim_variacao_temp: 0.8,
            sim_variacao_umidade: 1.5,
        }
    }
}

impl ParameterDefaults {
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        vec![
            (keys::INTERVAL_SECONDS, self.intervalo_segundos.to_string()),
            (keys::TEMP_MIN, self.temp_min.to_string()),
            (keys::TEMP_MAX, self.temp_max.to_string()),
            (keys::SOIL_HUMIDITY_MIN, self.umidade_solo_min.to_string()),
            (keys::AIR_HUMIDITY_MIN, self.umidade_ar_min.to_string()),
            (keys::AUTO_PUMP_RULE, self.regra_auto_bomba.to_string()),
            (keys::SIM_TEMP_VARIANCE, self.sim_variacao_temp.to_string()),
            (
                keys::SIM_HUMIDITY_VARIANCE,
                self.sim_variacao_umidade.to_string(),
            ),
        ]
    }
}

impl AppConfig {
    /// Loads the config file if one exists. A missing file yields defaults.
    pub fn load(config_override: Option<&PathBuf>) -> Result<Self> {
        let config_path = match config_override {
            Some(p) => {
                if !p.exists() {
                    return Err(GreenhouseError::Config(format!(
                        "Config file not found at {:?}",
                        p
                    )));
                }
                p.clone()
            }
            None => match Self::find_config_path() {
                Some(p) => p,
                None => {
                    tracing::debug!("No config file found, using built-in defaults");
                    return Ok(Self::default());
                }
            },
        };

        let config_str = std::fs::read_to_string(&config_path)
            .map_err(|e| GreenhouseError::Config(format!("Failed to read config: {}", e)))?;

        let config = Self::parse(&config_str)?;
        tracing::debug!(path = %config_path.display(), "Loaded configuration");
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let content = Self::substitute_env_vars(content);
        serde_yaml::from_str(&content)
            .map_err(|e| GreenhouseError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Search for the config file in standard locations.
    fn find_config_path() -> Option<PathBuf> {
        let local_config = PathBuf::from("config/greenhouse.yaml");
        if local_config.exists() {
            return Some(local_config);
        }

        dirs::config_dir()
            .map(|dir| dir.join("greenhouse").join("config.yaml"))
            .filter(|p| p.exists())
    }

    /// Default path for writing new config files (~/.config/greenhouse/config.yaml).
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| GreenhouseError::Config("Cannot determine config directory".into()))?
            .join("greenhouse");
        Ok(config_dir.join("config.yaml"))
    }

    /// Run interactive setup prompts and write config to disk.
    pub fn setup_interactive(target: Option<&PathBuf>) -> Result<(Self, PathBuf)> {
        println!();
        println!("Greenhouse monitor setup");
        println!();

        let defaults = ParameterDefaults::default();
        let mut config = AppConfig::default();

        println!("Sampling");
        config.defaults.intervalo_segundos =
            prompt("  Interval between cycles (seconds)", defaults.intervalo_segundos)?;
        println!();

        println!("Thresholds");
        config.defaults.temp_min = prompt("  Minimum temperature (°C)", defaults.temp_min)?;
        config.defaults.temp_max = prompt("  Maximum temperature (°C)", defaults.temp_max)?;
        config.defaults.umidade_solo_min =
            prompt("  Minimum soil humidity (%)", defaults.umidade_solo_min)?;
        config.defaults.umidade_ar_min =
            prompt("  Minimum air humidity (%)", defaults.umidade_ar_min)?;
        config.defaults.regra_auto_bomba = prompt(
            "  Switch pump on automatically when soil is dry",
            defaults.regra_auto_bomba,
        )?;
        println!();

        println!("Export");
        config.export.limit = prompt("  Measurements exported on shutdown", 200usize)?;
        println!();

        let config_path = match target {
            Some(p) => p.clone(),
            None => Self::default_config_path()?,
        };
        config.write_to(&config_path)?;

        println!("Configuration saved to {}", config_path.display());
        println!();

        Ok((config, config_path))
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let yaml = serde_yaml::to_string(self)
            .map_err(|e| GreenhouseError::Config(format!("Failed to serialize config: {}", e)))?;

        let content = format!(
            "# Greenhouse monitor configuration\n# Generated by `greenhouse init`\n# Environment variable substitution (${{VAR}}) is supported.\n\n{}",
            yaml
        );
        std::fs::write(path, content)?;
        Ok(())
    }

    fn substitute_env_vars(content: &str) -> String {
        let re = match regex_lite::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}") {
            Ok(re) => re,
            Err(_) => return content.to_string(),
        };

        let mut result = content.to_string();
        for cap in re.captures_iter(content) {
            let var_name = &cap[1];
            let placeholder = &cap[0];
            if let Ok(value) = std::env::var(var_name) {
                result = result.replace(placeholder, &value);
            }
        }

        result
    }

    pub fn data_dir(&self, data_dir_override: Option<&PathBuf>) -> Result<PathBuf> {
        // CLI override takes priority, then the config file
        if let Some(dir) = data_dir_override.or(self.storage.data_dir.as_ref()) {
            std::fs::create_dir_all(dir)?;
            return Ok(dir.clone());
        }

        if let Ok(dir) = std::env::var("GREENHOUSE_DATA_DIR") {
            let p = PathBuf::from(dir);
            std::fs::create_dir_all(&p)?;
            return Ok(p);
        }

        let data_dir = dirs::data_dir()
            .ok_or_else(|| GreenhouseError::Config("Cannot determine data directory".into()))?
            .join("greenhouse");

        std::fs::create_dir_all(&data_dir)?;
        Ok(data_dir)
    }

    pub fn db_path(&self, data_dir_override: Option<&PathBuf>) -> Result<PathBuf> {
        Ok(self.data_dir(data_dir_override)?.join("greenhouse.db"))
    }

    pub fn export_path(&self, data_dir_override: Option<&PathBuf>) -> Result<PathBuf> {
        if self.export.path.is_absolute() {
            return Ok(self.export.path.clone());
        }
        Ok(self.data_dir(data_dir_override)?.join(&self.export.path))
    }
}

fn prompt<T>(label: &str, default: T) -> Result<T>
where
    T: Clone + std::fmt::Display + std::str::FromStr,
    T::Err: std::fmt::Display + std::fmt::Debug,
{
    Input::new()
        .with_prompt(label)
        .default(default)
        .interact_text()
        .map_err(|e| GreenhouseError::Config(format!("Input error: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = AppConfig::parse("{}").unwrap();
        assert_eq!(config.export.limit, 200);
        assert_eq!(config.control.stop_timeout_secs, 5);
        assert_eq!(config.defaults, ParameterDefaults::default());
        assert!(config.storage.data_dir.is_none());
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let yaml = r#"
defaults:
  temp_max: 35.5
  regra_auto_bomba: false
export:
  limit: 50
"#;
        let config = AppConfig::parse(yaml).unwrap();
        assert_eq!(config.defaults.temp_max, 35.5);
        assert!(!config.defaults.regra_auto_bomba);
        assert_eq!(config.defaults.temp_min, 18.0);
        assert_eq!(config.export.limit, 50);
        assert_eq!(config.export.path, PathBuf::from("measurements.json"));
    }

    #[test]
    fn env_vars_are_substituted() {
        std::env::set_var("GREENHOUSE_TEST_EXPORT_LIMIT", "17");
        let config = AppConfig::parse("export:\n  limit: ${GREENHOUSE_TEST_EXPORT_LIMIT}\n").unwrap();
        assert_eq!(config.export.limit, 17);
    }

    #[test]
    fn unknown_env_var_is_left_in_place() {
        let out = AppConfig::substitute_env_vars("path: ${GREENHOUSE_TEST_SURELY_UNSET}");
        assert_eq!(out, "path: ${GREENHOUSE_TEST_SURELY_UNSET}");
    }

    #[test]
    fn malformed_yaml_is_a_config_error() {
        let err = AppConfig::parse("export: [unclosed").unwrap_err();
        assert!(matches!(err, GreenhouseError::Config(_)));
    }

    #[test]
    fn default_entries_cover_every_seeded_key() {
        let entries = ParameterDefaults::default().entries();
        let names: Vec<_> = entries.iter().map(|(k, _)| *k).collect();
        assert_eq!(names.len(), 8);
        assert!(names.contains(&keys::INTERVAL_SECONDS));
        assert!(names.contains(&keys::AUTO_PUMP_RULE));
        assert!(entries.contains(&(keys::AUTO_PUMP_RULE, "true".to_string())));
        assert!(entries.contains(&(keys::TEMP_MIN, "18".to_string())));
    }

    #[test]
    fn write_then_load_from_explicit_path() {
        let path = std::env::temp_dir().join(format!(
            "greenhouse-config-test-{}.yaml",
            std::process::id()
        ));
        let mut config = AppConfig::default();
        config.defaults.umidade_solo_min = 42.0;
        config.write_to(&path).unwrap();

        let loaded = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(loaded.defaults.umidade_solo_min, 42.0);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn shipped_example_parses() {
        let config = AppConfig::parse(include_str!("../config/greenhouse.yaml.example")).unwrap();
        assert_eq!(config.defaults, ParameterDefaults::default());
        assert_eq!(config.export.limit, 200);
    }

    #[test]
    fn explicit_missing_path_is_an_error() {
        let path = PathBuf::from("/definitely/not/here/greenhouse.yaml");
        assert!(AppConfig::load(Some(&path)).is_err());
    }
}
