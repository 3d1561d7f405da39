use crate::db::Database;
use crate::error::Result;
use crate::models::{FromSetting, LoopSettings};
use rusqlite::{params, OptionalExtension};
use std::fmt::Display;

// Parameter store: text values keyed by unique name, typed on read.

impl Database {
    pub fn get_setting(&self, name: &str) -> Result<Option<String>> {
        self.with_conn(|conn| {
            conn.query_row("SELECT value FROM config WHERE name = ?1", [name], |row| {
                row.get(0)
            })
            .optional()
            .map_err(Into::into)
        })
    }

    /// Upsert; last write wins.
    pub fn set_setting(&self, name: &str, value: impl Display) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                r#"
                INSERT INTO config (name, value) VALUES (?1, ?2)
                ON CONFLICT(name) DO UPDATE SET value = excluded.value
                "#,
                params![name, value.to_string()],
            )?;
            Ok(())
        })
    }

    /// Parses the stored text as `T`. Missing and malformed values are both
    /// `None`.
    pub fn get_typed<T: FromSetting>(&self, name: &str) -> Result<Option<T>> {
        let Some(raw) = self.get_setting(name)? else {
            return Ok(None);
        };
        let value = T::parse_setting(&raw);
        if value.is_none() {
            tracing::debug!(name, value = %raw, "Stored parameter is malformed, treating as unset");
        }
        Ok(value)
    }

    /// Writes the value only if the name has never been set. Returns whether
    /// a row was inserted.
    pub fn set_default_if_absent(&self, name: &str, value: impl Display) -> Result<bool> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO config (name, value) VALUES (?1, ?2)",
                params![name, value.to_string()],
            )?;
            Ok(inserted > 0)
        })
    }

    pub fn list_settings(&self) -> Result<Vec<(String, String)>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT name, value FROM config ORDER BY name")?;
            let settings = stmt
                .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(settings)
        })
    }

    /// Seeds every entry that is not yet stored.
    pub fn seed_defaults<I, V>(&self, entries: I) -> Result<usize>
    where
        I: IntoIterator<Item = (&'static str, V)>,
        V: Display,
    {
        let mut seeded = 0;
        for (name, value) in entries {
            if self.set_default_if_absent(name, &value)? {
                tracing::debug!(name, value = %value, "Seeded default parameter");
                seeded += 1;
            }
        }
        Ok(seeded)
    }

    /// Typed snapshot used by one control cycle.
    pub fn load_loop_settings(&self) -> Result<LoopSettings> {
        let stored = self.list_settings()?;
        Ok(LoopSettings::from_lookup(|name| {
            stored
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.clone())
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParameterDefaults;
    use crate::models::keys;
    use std::time::Duration;

    #[test]
    fn get_missing_is_none() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.get_setting("temp_max").unwrap(), None);
        assert_eq!(db.get_typed::<f64>("temp_max").unwrap(), None);
    }

    #[test]
    fn set_is_upsert() {
        let db = Database::open_in_memory().unwrap();
        db.set_setting("temp_max", 30.0).unwrap();
        db.set_setting("temp_max", 28.5).unwrap();
        assert_eq!(db.get_setting("temp_max").unwrap().as_deref(), Some("28.5"));
        assert_eq!(db.list_settings().unwrap().len(), 1);
    }

    #[test]
    fn typed_reads() {
        let db = Database::open_in_memory().unwrap();
        db.set_setting("intervalo_segundos", 5).unwrap();
        db.set_setting("regra_auto_bomba", "Sim").unwrap();
        db.set_setting("temp_min", "eighteen").unwrap();

        assert_eq!(db.get_typed::<i64>("intervalo_segundos").unwrap(), Some(5));
        assert_eq!(db.get_typed::<f64>("intervalo_segundos").unwrap(), Some(5.0));
        assert_eq!(db.get_typed::<bool>("regra_auto_bomba").unwrap(), Some(true));
        assert_eq!(db.get_typed::<f64>("temp_min").unwrap(), None);
        assert_eq!(
            db.get_typed::<String>("temp_min").unwrap().as_deref(),
            Some("eighteen")
        );
    }

    #[test]
    fn default_only_applies_once() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.set_default_if_absent("temp_min", 18.0).unwrap());
        assert!(!db.set_default_if_absent("temp_min", 5.0).unwrap());
        assert_eq!(db.get_typed::<f64>("temp_min").unwrap(), Some(18.0));
    }

    #[test]
    fn seeding_keeps_operator_overrides() {
        let db = Database::open_in_memory().unwrap();
        db.set_setting(keys::TEMP_MAX, 35).unwrap();

        let seeded = db.seed_defaults(ParameterDefaults::default().entries()).unwrap();
        assert_eq!(seeded, 7);
        assert_eq!(db.get_typed::<f64>(keys::TEMP_MAX).unwrap(), Some(35.0));

        assert_eq!(db.seed_defaults(ParameterDefaults::default().entries()).unwrap(), 0);
    }

    #[test]
    fn loop_settings_follow_the_store() {
        let db = Database::open_in_memory().unwrap();
        db.seed_defaults(ParameterDefaults::default().entries()).unwrap();
        db.set_setting(keys::AUTO_PUMP_RULE, false).unwrap();
        db.set_setting(keys::INTERVAL_SECONDS, "2").unwrap();

        let settings = db.load_loop_settings().unwrap();
        assert!(!settings.thresholds.auto_pump);
        assert_eq!(settings.interval, Duration::from_secs(2));
        assert_eq!(settings.thresholds.soil_humidity_min, 30.0);
    }
}
