use crate::db::Database;
use crate::error::Result;
use crate::models::{Alert, AlertKind, Measurement};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Row};
use tracing::warn;

/// Append-only persistence used by the control loop.
///
/// Each call is durable when it returns: implementations must not batch
/// writes across calls.
pub trait MeasurementSink: Send + Sync {
    /// Persists a measurement and returns the id assigned by the store.
    fn append_measurement(&self, measurement: &Measurement) -> Result<i64>;

    /// Persists an alert and returns the id assigned by the store.
    fn append_alert(&self, alert: &Alert) -> Result<i64>;
}

impl MeasurementSink for Database {
    fn append_measurement(&self, measurement: &Measurement) -> Result<i64> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                r#"
                INSERT INTO measurements
                    (timestamp, temperature, air_humidity, soil_humidity, pump_active)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
                params![
                    format_timestamp(&measurement.timestamp),
                    measurement.temperature,
                    measurement.air_humidity,
                    measurement.soil_humidity,
                    measurement.pump_active,
                ],
            )?;
            let id = tx.last_insert_rowid();
            tx.commit()?;
            Ok(id)
        })
    }

    fn append_alert(&self, alert: &Alert) -> Result<i64> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                r#"
                INSERT INTO alerts (timestamp, kind, message, measured_value)
                VALUES (?1, ?2, ?3, ?4)
                "#,
                params![
                    format_timestamp(&alert.timestamp),
                    format!("{:?}", alert.kind),
                    alert.message,
                    alert.measured_value,
                ],
            )?;
            let id = tx.last_insert_rowid();
            tx.commit()?;
            Ok(id)
        })
    }
}

// Measurement Queries

impl Database {
    /// Measurements in ascending order. With a limit, only the most recent
    /// `limit` rows are returned, still oldest first.
    pub fn list_measurements(&self, limit: Option<usize>) -> Result<Vec<Measurement>> {
        self.with_conn(|conn| {
            let rows = match limit {
                Some(n) => {
                    let mut stmt = conn.prepare(
                        r#"
                        SELECT * FROM (
                            SELECT * FROM measurements ORDER BY id DESC LIMIT ?1
                        ) ORDER BY id ASC
                        "#,
                    )?;
                    let rows = stmt
                        .query_map([n as i64], row_to_measurement)?
                        .collect::<rusqlite::Result<Vec<_>>>()?;
                    rows
                }
                None => {
                    let mut stmt = conn.prepare("SELECT * FROM measurements ORDER BY id ASC")?;
                    let rows = stmt
                        .query_map([], row_to_measurement)?
                        .collect::<rusqlite::Result<Vec<_>>>()?;
                    rows
                }
            };
            Ok(rows)
        })
    }

    pub fn count_measurements(&self) -> Result<usize> {
        self.with_conn(|conn| {
            let count: i64 =
                conn.query_row("SELECT COUNT(*) FROM measurements", [], |row| row.get(0))?;
            Ok(count as usize)
        })
    }
}

fn row_to_measurement(row: &Row) -> rusqlite::Result<Measurement> {
    let timestamp_str: String = row.get("timestamp")?;

    Ok(Measurement {
        id: Some(row.get("id")?),
        timestamp: parse_timestamp(&timestamp_str),
        temperature: row.get("temperature")?,
        air_humidity: row.get("air_humidity")?,
        soil_humidity: row.get("soil_humidity")?,
        pump_active: row.get("pump_active")?,
    })
}

// Alert Queries

impl Database {
    /// Alerts in ascending order, same limit semantics as
    /// [`Database::list_measurements`].
    pub fn list_alerts(&self, limit: Option<usize>) -> Result<Vec<Alert>> {
        self.with_conn(|conn| {
            let limit = limit.map(|n| n as i64).unwrap_or(-1);
            let mut stmt = conn.prepare(
                r#"
                SELECT * FROM (
                    SELECT * FROM alerts ORDER BY id DESC LIMIT ?1
                ) ORDER BY id ASC
                "#,
            )?;
            let alerts = stmt
                .query_map([limit], row_to_alert)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(alerts)
        })
    }
}

fn row_to_alert(row: &Row) -> rusqlite::Result<Alert> {
    let kind_str: String = row.get("kind")?;
    let timestamp_str: String = row.get("timestamp")?;

    let kind = AlertKind::from_str(&kind_str).unwrap_or_else(|| {
        warn!(kind = %kind_str, "Unknown alert kind in database, defaulting to Error");
        AlertKind::Error
    });

    Ok(Alert {
        id: Some(row.get("id")?),
        timestamp: parse_timestamp(&timestamp_str),
        kind,
        message: row.get("message")?,
        measured_value: row.get("measured_value")?,
    })
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| {
            warn!(timestamp = %s, "Unparseable timestamp in database");
            DateTime::<Utc>::UNIX_EPOCH
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Sample;
    use chrono::{Duration, TimeZone};

    fn seed(db: &Database, count: usize) -> Vec<Measurement> {
        let start = Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap();
        (0..count)
            .map(|i| {
                let m = Measurement::captured_at(
                    Sample::new(20.0 + i as f64, 50.0, 40.0 - i as f64),
                    i % 2 == 0,
                    start + Duration::seconds(5 * i as i64),
                );
                let id = db.append_measurement(&m).unwrap();
                Measurement { id: Some(id), ..m }
            })
            .collect()
    }

    #[test]
    fn appended_measurements_read_back_unchanged() {
        let db = Database::open_in_memory().unwrap();
        let written = seed(&db, 3);

        let read = db.list_measurements(None).unwrap();
        assert_eq!(read, written);
    }

    #[test]
    fn ids_increase_monotonically() {
        let db = Database::open_in_memory().unwrap();
        let written = seed(&db, 4);
        let ids: Vec<i64> = written.iter().map(|m| m.id.unwrap()).collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn limit_returns_most_recent_rows_oldest_first() {
        let db = Database::open_in_memory().unwrap();
        let written = seed(&db, 5);

        let recent = db.list_measurements(Some(2)).unwrap();
        assert_eq!(recent, written[3..].to_vec());

        let all = db.list_measurements(Some(50)).unwrap();
        assert_eq!(all.len(), 5);
        assert!(db.list_measurements(Some(0)).unwrap().is_empty());
        assert_eq!(db.count_measurements().unwrap(), 5);
    }

    #[test]
    fn alerts_keep_kind_and_optional_value() {
        let db = Database::open_in_memory().unwrap();
        db.append_alert(&Alert::new(AlertKind::Temperature, "hot").with_value(32.0))
            .unwrap();
        db.append_alert(&Alert::error("sensor offline")).unwrap();
        db.append_alert(&Alert::new(AlertKind::AirHumidity, "dry air").with_value(21.5))
            .unwrap();

        let alerts = db.list_alerts(None).unwrap();
        assert_eq!(alerts.len(), 3);
        assert_eq!(alerts[0].kind, AlertKind::Temperature);
        assert_eq!(alerts[0].measured_value, Some(32.0));
        assert_eq!(alerts[1].kind, AlertKind::Error);
        assert_eq!(alerts[1].measured_value, None);
        assert_eq!(alerts[1].message, "sensor offline");

        let last = db.list_alerts(Some(1)).unwrap();
        assert_eq!(last.len(), 1);
        assert_eq!(last[0].kind, AlertKind::AirHumidity);
    }

    #[test]
    fn empty_store_lists_nothing() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.list_measurements(Some(10)).unwrap().is_empty());
        assert!(db.list_alerts(None).unwrap().is_empty());
        assert_eq!(db.count_measurements().unwrap(), 0);
    }
}
