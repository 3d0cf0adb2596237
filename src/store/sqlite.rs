use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::Local;
use rusqlite::{params, Connection, OptionalExtension};

use super::{Standing, StoreError, TotalsStore, MAX_TOTAL};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS participants (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        total INTEGER NOT NULL DEFAULT 0,
        updated_at TEXT NOT NULL,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP
    )
"#;

/// Durable totals backed by a single SQLite table.
///
/// `id` order is creation order. rusqlite connections are not `Sync`, so the
/// connection sits behind a mutex; the increment itself is a single upsert
/// statement and does not depend on the mutex for atomicity.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database file, creating parent directories
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute(SCHEMA, [])?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl TotalsStore for SqliteStore {
    fn get(&self, name: &str) -> Result<Option<u64>, StoreError> {
        let total = self
            .conn()?
            .query_row(
                "SELECT total FROM participants WHERE name = ?1",
                [name],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        Ok(total.map(|t| t.max(0) as u64))
    }

    fn atomic_increment(&self, name: &str, delta: u64) -> Result<u64, StoreError> {
        let delta = i64::try_from(delta.min(MAX_TOTAL)).unwrap_or(i64::MAX);
        let total: i64 = self.conn()?.query_row(
            r#"
            INSERT INTO participants (name, total, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(name) DO UPDATE SET
                total = CASE
                    WHEN excluded.total > 9223372036854775807 - total THEN 9223372036854775807
                    ELSE total + excluded.total
                END,
                updated_at = excluded.updated_at
            RETURNING total
            "#,
            params![name, delta, Local::now().to_rfc3339()],
            |row| row.get(0),
        )?;
        Ok(total.max(0) as u64)
    }

    fn list_all(&self) -> Result<Vec<Standing>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT name, total FROM participants ORDER BY id ASC")?;

        let rows = stmt.query_map([], |row| {
            let total: i64 = row.get(1)?;
            Ok(Standing {
                name: row.get(0)?,
                total: total.max(0) as u64,
            })
        })?;

        let mut standings = Vec::new();
        for row in rows {
            standings.push(row?);
        }
        Ok(standings)
    }

    fn ensure(&self, name: &str) -> Result<(), StoreError> {
        self.conn()?.execute(
            "INSERT OR IGNORE INTO participants (name, total, updated_at) VALUES (?1, 0, ?2)",
            params![name, Local::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn reset_all(&self) -> Result<(), StoreError> {
        self.conn()?.execute(
            "UPDATE participants SET total = 0, updated_at = ?1",
            [Local::now().to_rfc3339()],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn upsert_creates_and_accumulates() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert_eq!(store.atomic_increment("Arno", 65).unwrap(), 65);
        assert_eq!(store.atomic_increment("Arno", 35).unwrap(), 100);
        assert_eq!(store.get("Arno").unwrap(), Some(100));
        assert_eq!(store.get("Orso").unwrap(), None);
    }

    #[test]
    fn list_all_is_creation_order() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.ensure("Charles").unwrap();
        store.ensure("Arno").unwrap();
        store.atomic_increment("Martin", 3).unwrap();
        store.ensure("Charles").unwrap();

        let names: Vec<_> = store
            .list_all()
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["Charles", "Arno", "Martin"]);
    }

    #[test]
    fn reset_keeps_participants() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.atomic_increment("Arno", 10).unwrap();
        store.reset_all().unwrap();
        assert_eq!(store.list_all().unwrap(), vec![Standing::new("Arno", 0)]);
    }

    #[test]
    fn upsert_saturates_instead_of_going_real() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.ensure("Orso").unwrap();
        assert_eq!(store.atomic_increment("Arno", MAX_TOTAL - 1).unwrap(), MAX_TOTAL - 1);
        assert_eq!(store.atomic_increment("Arno", 5).unwrap(), MAX_TOTAL);
        assert_eq!(store.atomic_increment("Arno", u64::MAX).unwrap(), MAX_TOTAL);

        assert_eq!(
            store.list_all().unwrap(),
            vec![Standing::new("Orso", 0), Standing::new("Arno", MAX_TOTAL)]
        );
        assert_eq!(store.atomic_increment("Orso", 1).unwrap(), 1);
    }

    #[test]
    fn totals_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("focus.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            store.atomic_increment("Simon", 42).unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.get("Simon").unwrap(), Some(42));
    }
}
