use std::collections::HashSet;
use std::path::Path;

use rusqlite::Connection;

use crate::error::AppError;

const MIGRATIONS: &[(&str, &str)] = &[(
    "0001_init.sql",
    include_str!(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/../../migrations/0001_init.sql"
    )),
)];

pub fn open(path: &Path) -> Result<Connection, AppError> {
    Connection::open(path).map_err(|e| {
        AppError::store("DB_OPEN_FAILED", "Failed to open SQLite database")
            .with_details(format!("path={}; err={e}", path.display()))
    })
}

pub fn open_in_memory() -> Result<Connection, AppError> {
    Connection::open_in_memory().map_err(|e| {
        AppError::store("DB_OPEN_FAILED", "Failed to open in-memory SQLite database")
            .with_details(e.to_string())
    })
}

/// Open the database at `path` and bring its schema up to date.
pub fn open_and_migrate(path: &Path) -> Result<Connection, AppError> {
    let mut conn = open(path)?;
    migrate(&mut conn)?;
    Ok(conn)
}

fn applied_migrations(conn: &Connection) -> rusqlite::Result<HashSet<String>> {
    let mut stmt = conn.prepare("SELECT name FROM _migrations")?;
    let names = stmt.query_map([], |row| row.get::<_, String>(0))?;
    names.collect()
}

fn apply_migration(conn: &mut Connection, name: &str, sql: &str) -> rusqlite::Result<()> {
    let tx = conn.transaction()?;
    tx.execute_batch(sql)?;
    tx.execute(
        "INSERT INTO _migrations(name, applied_at) VALUES (?1, strftime('%Y-%m-%dT%H:%M:%fZ','now'))",
        [name],
    )?;
    tx.commit()
}

/// Apply every pending migration, each in its own transaction, in file-name order.
pub fn migrate(conn: &mut Connection) -> Result<(), AppError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _migrations (
           name TEXT PRIMARY KEY NOT NULL,
           applied_at TEXT NOT NULL
         );",
    )
    .map_err(|e| {
        AppError::store("DB_MIGRATIONS_TABLE_FAILED", "Failed to ensure migrations table exists")
            .with_details(e.to_string())
    })?;

    let applied = applied_migrations(conn).map_err(|e| {
        AppError::store("DB_MIGRATIONS_QUERY_FAILED", "Failed to read applied migrations")
            .with_details(e.to_string())
    })?;

    for (name, sql) in MIGRATIONS {
        if applied.contains(*name) {
            continue;
        }
        apply_migration(conn, name, sql).map_err(|e| {
            AppError::store("DB_MIGRATION_FAILED", format!("Migration {name} failed"))
                .with_details(e.to_string())
        })?;
        tracing::debug!(migration = name, "applied migration");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::OptionalExtension;

    #[test]
    fn migrations_create_expected_tables() {
        let mut conn = open_in_memory().expect("open");
        migrate(&mut conn).expect("migrate");

        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' AND name='repairs'")
            .unwrap();
        let name: Option<String> = stmt.query_row([], |row| row.get(0)).optional().unwrap();
        assert_eq!(name.as_deref(), Some("repairs"));
    }

    #[test]
    fn migrate_is_idempotent() {
        let mut conn = open_in_memory().expect("open");
        migrate(&mut conn).expect("first");
        migrate(&mut conn).expect("second");

        let applied: i64 = conn
            .query_row("SELECT COUNT(*) FROM _migrations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(applied, 1);
    }

    #[test]
    fn open_fails_for_directory_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = open_and_migrate(dir.path()).expect_err("directory is not a database");
        assert_eq!(err.kind(), crate::error::ErrorKind::StoreUnavailable);
    }
}
