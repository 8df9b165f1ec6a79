use async_trait::async_trait;
use rusqlite::{params, OptionalExtension};

use super::{RepositoryError, SnapshotBackend};
use crate::db::DbPool;

/// Stores each blob as one row of the `snapshots` table.
pub struct SqliteBackend {
    pool: DbPool,
}

impl SqliteBackend {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SnapshotBackend for SqliteBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, RepositoryError> {
        let conn = self.pool.get()?;

        let value = conn
            .query_row(
                "SELECT value FROM snapshots WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;

        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), RepositoryError> {
        let conn = self.pool.get()?;

        conn.execute(
            "INSERT INTO snapshots (key, value, updated_at)
             VALUES (?1, ?2, datetime('now'))
             ON CONFLICT(key) DO UPDATE SET
               value = excluded.value,
               updated_at = excluded.updated_at",
            params![key, value],
        )?;

        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool, RepositoryError> {
        let conn = self.pool.get()?;
        let rows = conn.execute("DELETE FROM snapshots WHERE key = ?1", params![key])?;
        Ok(rows > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use tempfile::TempDir;

    fn create_test_backend() -> (SqliteBackend, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let pool = db::open(&db_path).unwrap();

        (SqliteBackend::new(pool), temp_dir)
    }

    #[tokio::test]
    async fn test_set_and_get() {
        let (backend, _temp) = create_test_backend();

        backend.set("posts", "[]").await.unwrap();
        assert_eq!(backend.get("posts").await.unwrap().as_deref(), Some("[]"));
        assert_eq!(backend.get("user").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_overwrites() {
        let (backend, _temp) = create_test_backend();

        backend.set("user", r#"{"id":1}"#).await.unwrap();
        backend.set("user", r#"{"id":2}"#).await.unwrap();

        assert_eq!(
            backend.get("user").await.unwrap().as_deref(),
            Some(r#"{"id":2}"#)
        );

        let conn = backend.pool.get().unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM snapshots", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_remove() {
        let (backend, _temp) = create_test_backend();

        backend.set("user", "{}").await.unwrap();
        assert!(backend.remove("user").await.unwrap());
        assert!(!backend.remove("user").await.unwrap());
        assert_eq!(backend.get("user").await.unwrap(), None);
    }
}
