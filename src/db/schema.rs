//! SQL DDL for the unified memory store.
//!
//! Defines the `memories` table, the `memories_vec` (vec0) virtual table,
//! and the `schema_meta` table. All DDL uses `IF NOT EXISTS` for idempotent
//! initialization. The vector table's dimension is fixed at store creation
//! and recorded in `schema_meta`.

use rusqlite::Connection;

const SCHEMA_SQL: &str = r#"
-- Core memory storage
CREATE TABLE IF NOT EXISTS memories (
    id INTEGER PRIMARY KEY,
    content TEXT NOT NULL,
    type TEXT NOT NULL CHECK(type IN ('decision','preference','fact','pattern','conversation')),
    project TEXT,
    category TEXT,
    reasoning TEXT,
    source TEXT NOT NULL DEFAULT 'manual' CHECK(source IN (
        'manual','auto:session','auto:commit','auto:pattern',
        'auto:bootstrap','auto:ingest','auto:response','auto:precompact')),
    importance INTEGER NOT NULL DEFAULT 3 CHECK(importance BETWEEN 1 AND 5),
    confidence REAL NOT NULL DEFAULT 1.0 CHECK(confidence >= 0.0 AND confidence <= 1.0),
    created_at INTEGER NOT NULL,
    last_accessed INTEGER,
    access_count INTEGER NOT NULL DEFAULT 0,
    expires_at INTEGER,
    supersedes INTEGER,
    is_obsolete INTEGER NOT NULL DEFAULT 0,
    tags TEXT NOT NULL DEFAULT '[]'
);

CREATE INDEX IF NOT EXISTS idx_memories_type ON memories(type);
CREATE INDEX IF NOT EXISTS idx_memories_project ON memories(project);
CREATE INDEX IF NOT EXISTS idx_memories_obsolete ON memories(is_obsolete);
CREATE INDEX IF NOT EXISTS idx_memories_created ON memories(created_at);

-- Schema metadata
CREATE TABLE IF NOT EXISTS schema_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Initialize all schema tables. Idempotent (uses IF NOT EXISTS).
///
/// `dimensions` is baked into the vec0 DDL; once the table exists the value
/// is pinned by `schema_meta` and verified on every open.
pub fn init_schema(conn: &Connection, dimensions: usize) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;

    // vec0 virtual table must be created separately (sqlite-vec syntax).
    conn.execute_batch(&format!(
        "CREATE VIRTUAL TABLE IF NOT EXISTS memories_vec USING vec0(\n\
         id INTEGER PRIMARY KEY,\n\
         embedding FLOAT[{dimensions}]\n)",
    ))?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('schema_version', '1')",
        [],
    )?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('embedding_dimensions', ?1)",
        [dimensions.to_string()],
    )?;

    Ok(())
}
