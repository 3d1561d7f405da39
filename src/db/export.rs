use crate::db::Database;
use crate::error::{GreenhouseError, Result};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

impl Database {
    /// Writes the most recent `limit` measurements (all when `None`) to
    /// `destination` as a JSON array, oldest first. Returns the destination.
    ///
    /// The file is written next to the target and renamed into place, so a
    /// failed export never leaves a truncated file behind.
    pub fn export_json(&self, destination: &Path, limit: Option<usize>) -> Result<PathBuf> {
        let measurements = self.list_measurements(limit)?;

        if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                GreenhouseError::Export(format!("cannot create {}: {}", parent.display(), e))
            })?;
        }

        let staging = destination.with_extension("json.tmp");
        let write = || -> Result<()> {
            let file = std::fs::File::create(&staging)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, &measurements)?;
            writer.flush()?;
            writer
                .into_inner()
                .map_err(|e| GreenhouseError::Io(e.into_error()))?
                .sync_all()?;
            std::fs::rename(&staging, destination)?;
            Ok(())
        };

        if let Err(e) = write() {
            let _ = std::fs::remove_file(&staging);
            return Err(GreenhouseError::Export(format!(
                "{}: {}",
                destination.display(),
                e
            )));
        }

        tracing::info!(
            count = measurements.len(),
            path = %destination.display(),
            "Exported measurements"
        );

        Ok(destination.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MeasurementSink;
    use crate::models::{Measurement, Sample};

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("greenhouse-export-{}-{}", std::process::id(), name))
            .join("measurements.json")
    }

    fn read_array(path: &Path) -> Vec<serde_json::Value> {
        let content = std::fs::read_to_string(path).unwrap();
        serde_json::from_str::<serde_json::Value>(&content)
            .unwrap()
            .as_array()
            .unwrap()
            .clone()
    }

    #[test]
    fn exports_min_of_limit_and_count_in_ascending_order() {
        let db = Database::open_in_memory().unwrap();
        for i in 0..5 {
            db.append_measurement(&Measurement::new(
                Sample::new(20.0 + i as f64, 50.0, 40.0),
                i == 4,
            ))
            .unwrap();
        }

        let path = temp_path("limit");
        let returned = db.export_json(&path, Some(3)).unwrap();
        assert_eq!(returned, path);

        let items = read_array(&path);
        assert_eq!(items.len(), 3);
        let ids: Vec<i64> = items.iter().map(|v| v["id"].as_i64().unwrap()).collect();
        assert_eq!(ids, vec![3, 4, 5]);
        assert_eq!(items[2]["pumpActive"], serde_json::Value::Bool(true));
        assert_eq!(items[0]["pumpActive"], serde_json::Value::Bool(false));
        assert_eq!(items[0]["temperature"], 22.0);
        assert!(items[0]["timestamp"].is_string());

        let path_all = temp_path("all");
        db.export_json(&path_all, Some(200)).unwrap();
        assert_eq!(read_array(&path_all).len(), 5);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
        let _ = std::fs::remove_dir_all(path_all.parent().unwrap());
    }

    #[test]
    fn empty_store_exports_empty_array() {
        let db = Database::open_in_memory().unwrap();
        let path = temp_path("empty");
        db.export_json(&path, None).unwrap();
        assert!(read_array(&path).is_empty());
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn unwritable_destination_is_an_export_error() {
        let db = Database::open_in_memory().unwrap();
        let blocker = std::env::temp_dir().join(format!(
            "greenhouse-export-blocker-{}",
            std::process::id()
        ));
        std::fs::write(&blocker, b"not a directory").unwrap();

        let err = db
            .export_json(&blocker.join("measurements.json"), None)
            .unwrap_err();
        assert!(matches!(err, GreenhouseError::Export(_)));
        let _ = std::fs::remove_file(&blocker);
    }
}
