pub mod models;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection};
use std::path::Path;

pub type DbPool = Pool<SqliteConnectionManager>;

struct Migration {
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    name: "001_snapshots",
    sql: include_str!("../../migrations/001_snapshots.sql"),
}];

/// Open the snapshot database at `db_path` and bring its schema up to date.
pub fn open(db_path: &Path) -> anyhow::Result<DbPool> {
    let pool = create_pool(db_path)?;
    run_migrations(&pool)?;
    Ok(pool)
}

pub fn create_pool(db_path: &Path) -> anyhow::Result<DbPool> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Snapshots are written one store at a time, so a handful of connections is plenty
    let manager = SqliteConnectionManager::file(db_path).with_init(|conn| {
        conn.execute_batch("PRAGMA synchronous = NORMAL; PRAGMA busy_timeout = 5000;")
    });
    let pool = Pool::builder().max_size(4).build(manager)?;

    pool.get()?.execute_batch("PRAGMA journal_mode = WAL;")?;
    Ok(pool)
}

pub fn run_migrations(pool: &DbPool) -> anyhow::Result<()> {
    let conn = pool.get()?;
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            name TEXT PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )?;

    let mut applied = 0;
    for migration in MIGRATIONS {
        if is_applied(&conn, migration.name)? {
            continue;
        }
        tracing::info!("Applying migration: {}", migration.name);
        conn.execute_batch(migration.sql)?;
        conn.execute(
            "INSERT INTO schema_version (name) VALUES (?1)",
            params![migration.name],
        )?;
        applied += 1;
    }

    tracing::debug!(applied, "Snapshot schema is current");
    Ok(())
}

fn is_applied(conn: &Connection, name: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM schema_version WHERE name = ?1)",
        params![name],
        |row| row.get(0),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_pool() -> DbPool {
        Pool::builder()
            .max_size(1)
            .build(SqliteConnectionManager::memory())
            .unwrap()
    }

    #[test]
    fn open_creates_parent_dirs_in_wal_mode() {
        let tmp = tempfile::tempdir().unwrap();
        let db_path = tmp.path().join("nested/board.db");
        let pool = open(&db_path).unwrap();
        assert!(db_path.exists());

        let mode: String = pool
            .get()
            .unwrap()
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .unwrap();
        assert_eq!(mode, "wal");
    }

    #[test]
    fn snapshot_table_accepts_upserts() {
        let pool = memory_pool();
        run_migrations(&pool).unwrap();

        let conn = pool.get().unwrap();
        for value in ["[]", "[1]"] {
            conn.execute(
                "INSERT INTO snapshots (key, value) VALUES ('posts', ?1)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![value],
            )
            .unwrap();
        }
        let stored: String = conn
            .query_row("SELECT value FROM snapshots WHERE key = 'posts'", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(stored, "[1]");
    }

    #[test]
    fn rerunning_migrations_applies_nothing_new() {
        let pool = memory_pool();
        run_migrations(&pool).unwrap();
        run_migrations(&pool).unwrap();

        let conn = pool.get().unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, MIGRATIONS.len() as i64);
        assert!(is_applied(&conn, "001_snapshots").unwrap());
    }
}
