//! Row-level operations on the unified store.
//!
//! Every function here expects to run inside a transaction owned by the
//! engine; multi-statement operations (insert + vector row, delete + orphan
//! sweep) rely on that to keep the memories ↔ embeddings pairing intact.
//! The vector table returns L2 distance, ascending.

use rusqlite::{params, Connection, OptionalExtension};

use super::types::{Memory, MemoryType, ProjectScope, Source};
use crate::embedding::embedding_to_bytes;
use crate::error::{MemoryError, Result};

/// Fields for a new row. Timestamps and scope are resolved by the engine
/// before this layer sees them.
#[derive(Debug, Clone)]
pub struct NewMemory {
    pub content: String,
    pub memory_type: MemoryType,
    pub project: Option<String>,
    pub category: Option<String>,
    pub reasoning: Option<String>,
    pub source: Source,
    pub importance: i64,
    pub confidence: f64,
    pub created_at: i64,
    pub expires_at: Option<i64>,
    pub supersedes: Option<i64>,
    pub tags: Vec<String>,
}

/// Filters applied to KNN candidates.
#[derive(Debug, Clone)]
pub struct KnnFilters {
    pub now: i64,
    pub include_obsolete: bool,
    pub memory_type: Option<MemoryType>,
    pub min_importance: Option<i64>,
}

/// Insert a memory row and its embedding together. Returns the new id.
pub fn insert(conn: &Connection, row: &NewMemory, embedding: &[f32]) -> Result<i64> {
    let tags_json = serde_json::to_string(&row.tags)
        .map_err(|e| MemoryError::InvalidInput(format!("tags: {e}")))?;

    conn.execute(
        "INSERT INTO memories (content, type, project, category, reasoning, source, \
         importance, confidence, created_at, expires_at, supersedes, tags) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            row.content,
            row.memory_type.as_str(),
            row.project,
            row.category,
            row.reasoning,
            row.source.as_str(),
            row.importance,
            row.confidence,
            row.created_at,
            row.expires_at,
            row.supersedes,
            tags_json,
        ],
    )?;
    let id = conn.last_insert_rowid();

    conn.execute(
        "INSERT INTO memories_vec (id, embedding) VALUES (?1, ?2)",
        params![id, embedding_to_bytes(embedding)],
    )?;

    Ok(id)
}

/// Fetch a single memory by id.
pub fn get(conn: &Connection, id: i64) -> Result<Option<Memory>> {
    conn.query_row(
        &format!("SELECT {MEMORY_COLUMNS} FROM memories WHERE id = ?1"),
        params![id],
        row_to_memory,
    )
    .optional()
    .map_err(Into::into)
}

/// KNN over the vector table with post-filters. Results come back sorted
/// ascending by distance, at most `k` of them.
///
/// The vec0 scan cannot push the filters down, so the candidate pool is
/// oversampled before filtering.
pub fn knn(
    conn: &Connection,
    query: &[f32],
    k: usize,
    filters: &KnnFilters,
) -> Result<Vec<(Memory, f64)>> {
    let candidate_limit = (k * 4).max(k);
    let mut stmt = conn.prepare(
        "SELECT id, distance FROM memories_vec \
         WHERE embedding MATCH ?1 ORDER BY distance LIMIT ?2",
    )?;
    let candidates: Vec<(i64, f64)> = stmt
        .query_map(
            params![embedding_to_bytes(query), candidate_limit as i64],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut out = Vec::new();
    for (id, distance) in candidates {
        let Some(memory) = get(conn, id)? else {
            continue;
        };
        if !filters.include_obsolete && memory.is_obsolete {
            continue;
        }
        if let Some(expires) = memory.expires_at {
            if expires <= filters.now {
                continue;
            }
        }
        if let Some(t) = filters.memory_type {
            if memory.memory_type != t {
                continue;
            }
        }
        if let Some(min) = filters.min_importance {
            if memory.importance < min {
                continue;
            }
        }
        out.push((memory, distance));
        if out.len() >= k {
            break;
        }
    }
    Ok(out)
}

/// Nearest active neighbor of an embedding — the dedup probe.
/// Returns `(id, content, importance, distance)` for the closest
/// non-obsolete row, if any.
pub fn nearest_one(conn: &Connection, query: &[f32]) -> Result<Option<(i64, String, i64, f64)>> {
    let mut stmt = conn.prepare(
        "SELECT id, distance FROM memories_vec \
         WHERE embedding MATCH ?1 ORDER BY distance LIMIT 8",
    )?;
    let candidates: Vec<(i64, f64)> = stmt
        .query_map(params![embedding_to_bytes(query)], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    for (id, distance) in candidates {
        let row: Option<(String, i64, bool)> = conn
            .query_row(
                "SELECT content, importance, is_obsolete FROM memories WHERE id = ?1",
                params![id],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
            )
            .optional()?;
        if let Some((content, importance, is_obsolete)) = row {
            if !is_obsolete {
                return Ok(Some((id, content, importance, distance)));
            }
        }
    }
    Ok(None)
}

/// Replace a memory's content and embedding together.
pub fn update_content(conn: &Connection, id: i64, content: &str, embedding: &[f32]) -> Result<()> {
    let changed = conn.execute(
        "UPDATE memories SET content = ?1 WHERE id = ?2",
        params![content, id],
    )?;
    if changed == 0 {
        return Err(MemoryError::NotFound(format!("memory {id}")));
    }
    // vec0 rows are replaced, not updated in place.
    conn.execute("DELETE FROM memories_vec WHERE id = ?1", params![id])?;
    conn.execute(
        "INSERT INTO memories_vec (id, embedding) VALUES (?1, ?2)",
        params![id, embedding_to_bytes(embedding)],
    )?;
    Ok(())
}

/// Raise a merged row's importance to the max of old and new.
pub fn raise_importance(conn: &Connection, id: i64, importance: i64) -> Result<()> {
    conn.execute(
        "UPDATE memories SET importance = MAX(importance, ?1) WHERE id = ?2",
        params![importance, id],
    )?;
    Ok(())
}

/// Bump access stats for recalled rows: `last_accessed = now`,
/// `access_count += 1`. Runs in the caller's (read) transaction.
pub fn update_stats(conn: &Connection, ids: &[i64], now: i64) -> Result<()> {
    let mut stmt = conn.prepare(
        "UPDATE memories SET last_accessed = ?1, access_count = access_count + 1 WHERE id = ?2",
    )?;
    for id in ids {
        stmt.execute(params![now, id])?;
    }
    Ok(())
}

/// Mark a row obsolete, optionally recording what replaced it.
pub fn set_obsolete(conn: &Connection, id: i64, supersedes: Option<i64>) -> Result<()> {
    let changed = match supersedes {
        Some(target) => conn.execute(
            "UPDATE memories SET is_obsolete = 1, supersedes = ?1 WHERE id = ?2",
            params![target, id],
        )?,
        None => conn.execute(
            "UPDATE memories SET is_obsolete = 1 WHERE id = ?1",
            params![id],
        )?,
    };
    if changed == 0 {
        return Err(MemoryError::NotFound(format!("memory {id}")));
    }
    Ok(())
}

/// Hard-delete rows and their embeddings, then sweep orphans.
pub fn delete(conn: &Connection, ids: &[i64]) -> Result<usize> {
    let mut deleted = 0;
    for id in ids {
        conn.execute("DELETE FROM memories_vec WHERE id = ?1", params![id])?;
        deleted += conn.execute("DELETE FROM memories WHERE id = ?1", params![id])?;
    }
    sweep_orphan_embeddings(conn)?;
    Ok(deleted)
}

/// The predicate side of `forget_by_category` / `forget_by_source`.
#[derive(Debug, Clone)]
pub enum ForgetPredicate {
    Category(String),
    Source(Source),
}

/// Delete (or count, when `dry_run`) rows matching a predicate within a
/// project scope.
pub fn delete_where(
    conn: &Connection,
    predicate: &ForgetPredicate,
    scope: &ProjectScope,
    dry_run: bool,
) -> Result<usize> {
    let (scope_sql, scope_param) = scope.sql_clause();
    let (pred_sql, pred_param): (&str, &str) = match predicate {
        ForgetPredicate::Category(c) => ("category = ?1", c.as_str()),
        ForgetPredicate::Source(s) => ("source = ?1", s.as_str()),
    };

    let where_sql = format!("{pred_sql} AND {}", scope_sql.replace('?', "?2"));

    let ids: Vec<i64> = {
        let sql = format!("SELECT id FROM memories WHERE {where_sql}");
        let mut stmt = conn.prepare(&sql)?;
        let mapper = |row: &rusqlite::Row| row.get::<_, i64>(0);
        let rows = match scope_param {
            Some(p) => stmt.query_map(params![pred_param, p], mapper)?,
            None => stmt.query_map(params![pred_param], mapper)?,
        };
        rows.collect::<std::result::Result<Vec<_>, _>>()?
    };

    if dry_run {
        return Ok(ids.len());
    }
    delete(conn, &ids)
}

/// All non-obsolete, non-expired rows in a scope, ascending id. Feeds
/// consolidation and corruption cleanup.
pub fn scan_active(conn: &Connection, scope: &ProjectScope, now: i64) -> Result<Vec<Memory>> {
    let (scope_sql, scope_param) = scope.sql_clause();
    let sql = format!(
        "SELECT {MEMORY_COLUMNS} FROM memories \
         WHERE is_obsolete = 0 \
           AND (expires_at IS NULL OR expires_at > ?1) \
           AND {} \
         ORDER BY id ASC",
        scope_sql.replace('?', "?2")
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = match scope_param {
        Some(p) => stmt.query_map(params![now, p], row_to_memory)?,
        None => stmt.query_map(params![now], row_to_memory)?,
    };
    rows.collect::<std::result::Result<Vec<_>, _>>()
        .map_err(Into::into)
}

/// Most recently created active rows. With `all_projects`, no project
/// filter applies; otherwise rows are limited to the given project plus
/// globals.
pub fn list_recent(
    conn: &Connection,
    limit: usize,
    project: Option<&str>,
    all_projects: bool,
) -> Result<Vec<Memory>> {
    let mut sql = format!(
        "SELECT {MEMORY_COLUMNS} FROM memories WHERE is_obsolete = 0"
    );
    if !all_projects {
        match project {
            Some(_) => sql.push_str(" AND (project = ?2 OR project IS NULL)"),
            None => sql.push_str(" AND project IS NULL"),
        }
    }
    sql.push_str(" ORDER BY created_at DESC, id DESC LIMIT ?1");

    let mut stmt = conn.prepare(&sql)?;
    let rows = match (all_projects, project) {
        (false, Some(p)) => stmt.query_map(params![limit as i64, p], row_to_memory)?,
        _ => stmt.query_map(params![limit as i64], row_to_memory)?,
    };
    rows.collect::<std::result::Result<Vec<_>, _>>()
        .map_err(Into::into)
}

/// K nearest neighbors of an existing row, excluding the row itself.
pub fn neighbors_of(conn: &Connection, id: i64, k: usize) -> Result<Vec<(i64, f64)>> {
    let embedding: Option<Vec<u8>> = conn
        .query_row(
            "SELECT embedding FROM memories_vec WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )
        .optional()?;
    let Some(embedding) = embedding else {
        return Err(MemoryError::NotFound(format!("embedding for memory {id}")));
    };

    let mut stmt = conn.prepare(
        "SELECT id, distance FROM memories_vec \
         WHERE embedding MATCH ?1 ORDER BY distance LIMIT ?2",
    )?;
    let rows: Vec<(i64, f64)> = stmt
        .query_map(params![embedding, (k + 1) as i64], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows.into_iter().filter(|(n, _)| *n != id).take(k).collect())
}

/// Remove embedding rows whose memory no longer exists. Runs on every
/// delete path as an invariant check.
pub fn sweep_orphan_embeddings(conn: &Connection) -> Result<usize> {
    let swept = conn.execute(
        "DELETE FROM memories_vec WHERE id NOT IN (SELECT id FROM memories)",
        [],
    )?;
    if swept > 0 {
        tracing::warn!(swept, "removed orphan embedding rows");
    }
    Ok(swept)
}

const MEMORY_COLUMNS: &str = "id, content, type, project, category, reasoning, source, \
     importance, confidence, created_at, last_accessed, access_count, \
     expires_at, supersedes, is_obsolete, tags";

fn row_to_memory(row: &rusqlite::Row) -> rusqlite::Result<Memory> {
    let type_str: String = row.get(2)?;
    let source_str: String = row.get(6)?;
    let tags_str: String = row.get(15)?;
    Ok(Memory {
        id: row.get(0)?,
        content: row.get(1)?,
        memory_type: type_str.parse().unwrap_or(MemoryType::Fact),
        project: row.get(3)?,
        category: row.get(4)?,
        reasoning: row.get(5)?,
        source: source_str.parse().unwrap_or(Source::Manual),
        importance: row.get(7)?,
        confidence: row.get(8)?,
        created_at: row.get(9)?,
        last_accessed: row.get(10)?,
        access_count: row.get(11)?,
        expires_at: row.get(12)?,
        supersedes: row.get(13)?,
        is_obsolete: row.get(14)?,
        tags: serde_json::from_str(&tags_str).unwrap_or_default(),
    })
}
