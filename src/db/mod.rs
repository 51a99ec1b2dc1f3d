//! SQLite database initialization, schema, migrations, and health checks.
//!
//! The store is a single file carrying the `memories` table and the
//! `memories_vec` vec0 virtual table. Writer exclusion across processes
//! comes from SQLite's own file locking; WAL keeps readers concurrent.

pub mod migrations;
pub mod schema;

use rusqlite::Connection;
use sqlite_vec::sqlite3_vec_init;
use std::path::Path;
use std::sync::Once;

use crate::error::{MemoryError, Result};

static SQLITE_VEC_INIT: Once = Once::new();

/// Register the sqlite-vec extension globally. Safe to call multiple times.
pub fn load_sqlite_vec() {
    SQLITE_VEC_INIT.call_once(|| unsafe {
        rusqlite::ffi::sqlite3_auto_extension(Some(std::mem::transmute(
            sqlite3_vec_init as *const (),
        )));
    });
}

/// Open (or create) the memory store at the given path, with the extension
/// loaded, schema initialized, and the configured dimension verified
/// against the store's recorded one.
pub fn open_database(path: impl AsRef<Path>, dimensions: usize, model: &str) -> Result<Connection> {
    let path = path.as_ref();

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    load_sqlite_vec();

    let conn = Connection::open(path)?;

    // WAL for concurrent readers; wait for locks instead of failing fast.
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.pragma_update(None, "busy_timeout", "5000")?;

    schema::init_schema(&conn, dimensions)?;
    migrations::run_migrations(&conn, model)?;

    if let Some(stored) = migrations::get_embedding_dimensions(&conn)? {
        if stored != dimensions {
            return Err(MemoryError::DimensionMismatch {
                configured: dimensions,
                stored,
            });
        }
    }
    if let Some(stored_model) = migrations::get_embedding_model(&conn)? {
        if stored_model != model {
            tracing::warn!(
                stored = %stored_model,
                configured = %model,
                "embedding model changed — existing vectors were produced by a different model"
            );
        }
    }

    // Quick integrity check after schema init
    let integrity: String = conn.pragma_query_value(None, "quick_check", |row| row.get(0))?;
    if integrity != "ok" {
        return Err(MemoryError::InvalidInput(format!(
            "database integrity check failed: {integrity}"
        )));
    }

    tracing::info!(path = %path.display(), dimensions, "database initialized");
    Ok(conn)
}

/// Result of a full database health check.
#[derive(Debug)]
pub struct HealthReport {
    pub schema_version: u32,
    pub embedding_model: Option<String>,
    pub embedding_dimensions: Option<usize>,
    pub integrity_ok: bool,
    pub integrity_details: String,
    pub sqlite_vec_version: String,
    pub memory_count: i64,
    pub embedding_count: i64,
}

/// Run a comprehensive health check on the database.
pub fn check_database_health(conn: &Connection) -> Result<HealthReport> {
    let schema_version = migrations::get_schema_version(conn)?;
    let embedding_model = migrations::get_embedding_model(conn)?;
    let embedding_dimensions = migrations::get_embedding_dimensions(conn)?;

    let integrity_details: String =
        conn.pragma_query_value(None, "integrity_check", |row| row.get(0))?;
    let integrity_ok = integrity_details == "ok";

    let sqlite_vec_version: String =
        conn.query_row("SELECT vec_version()", [], |row| row.get(0))?;

    let memory_count: i64 = conn
        .query_row("SELECT COUNT(*) FROM memories", [], |row| row.get(0))
        .unwrap_or(0);
    let embedding_count: i64 = conn
        .query_row("SELECT COUNT(*) FROM memories_vec", [], |row| row.get(0))
        .unwrap_or(0);

    Ok(HealthReport {
        schema_version,
        embedding_model,
        embedding_dimensions,
        integrity_ok,
        integrity_details,
        sqlite_vec_version,
        memory_count,
        embedding_count,
    })
}

/// Open an in-memory database for testing.
pub fn open_memory_database(dimensions: usize) -> Result<Connection> {
    load_sqlite_vec();
    let conn = Connection::open_in_memory()?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    schema::init_schema(&conn, dimensions)?;
    migrations::run_migrations(&conn, "test-model")?;
    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_creates_and_reopens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memories.db");

        let conn = open_database(&path, 8, "test-model").unwrap();
        drop(conn);

        let conn = open_database(&path, 8, "test-model").unwrap();
        let report = check_database_health(&conn).unwrap();
        assert!(report.integrity_ok);
        assert_eq!(report.embedding_dimensions, Some(8));
        assert_eq!(report.memory_count, 0);
    }

    #[test]
    fn dimension_mismatch_is_fatal_on_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memories.db");

        drop(open_database(&path, 8, "test-model").unwrap());

        let err = open_database(&path, 16, "test-model").unwrap_err();
        assert!(matches!(
            err,
            MemoryError::DimensionMismatch {
                configured: 16,
                stored: 8
            }
        ));
    }

    #[test]
    fn health_report_on_fresh_store() {
        let conn = open_memory_database(8).unwrap();
        let report = check_database_health(&conn).unwrap();
        assert_eq!(report.schema_version, migrations::CURRENT_SCHEMA_VERSION);
        assert_eq!(report.embedding_model.as_deref(), Some("test-model"));
        assert!(!report.sqlite_vec_version.is_empty());
        assert_eq!(report.embedding_count, 0);
    }
}
