use crate::error::{GreenhouseError, Result};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Shared handle to the SQLite store.
///
/// Every clone points at the same connection; the mutex serializes writers
/// coming from the control loop and from the foreground (export, CLI).
pub struct Database {
    conn: Arc<Mutex<Connection>>,
    path: PathBuf,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // WAL keeps readers off the writer's back; FULL syncs on every commit.
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = FULL;",
        )?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
            path: path.to_path_buf(),
        };

        super::migrations::run(&db)?;

        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
            path: PathBuf::from(":memory:"),
        };

        super::migrations::run(&db)?;

        Ok(db)
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.conn.lock().map_err(|_| GreenhouseError::LockPoisoned)?;
        f(&conn)
    }

    pub fn with_conn_mut<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T>,
    {
        let mut conn = self.conn.lock().map_err(|_| GreenhouseError::LockPoisoned)?;
        f(&mut conn)
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: Arc::clone(&self.conn),
            path: self.path.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_database_survives_reopen() {
        let path = std::env::temp_dir().join(format!(
            "greenhouse-conn-test-{}.db",
            std::process::id()
        ));
        {
            let db = Database::open(&path).unwrap();
            db.set_setting("temp_max", 31.5).unwrap();
        }
        let db = Database::open(&path).unwrap();
        assert_eq!(db.get_setting("temp_max").unwrap().as_deref(), Some("31.5"));
        assert_eq!(db.path(), &path);

        drop(db);
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{}", path.display(), suffix));
        }
    }

    #[test]
    fn clones_share_the_connection() {
        let db = Database::open_in_memory().unwrap();
        let other = db.clone();
        other.set_setting("temp_min", 10).unwrap();
        assert_eq!(db.get_setting("temp_min").unwrap().as_deref(), Some("10"));
    }
}
