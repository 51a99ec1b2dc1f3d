use rusqlite::{params, Connection};
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;

use crate::error::Result;

/// Store statistics, as surfaced by the `stats` engine call.
#[derive(Debug, Serialize)]
pub struct StatsReport {
    pub total_memories: u64,
    pub active_memories: u64,
    pub obsolete_memories: u64,
    pub by_type: HashMap<String, u64>,
    pub by_source: HashMap<String, u64>,
    pub global_memories: u64,
    pub project_memories: u64,
    pub db_size_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oldest_memory: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub newest_memory: Option<i64>,
}

/// Compute store statistics.
///
/// With a `project`, counts cover that project plus globals. Obsolete rows
/// count toward totals but not actives. `db_path` is only for file size;
/// pass None for in-memory stores.
pub fn stats(
    conn: &Connection,
    project: Option<&str>,
    db_path: Option<&Path>,
) -> Result<StatsReport> {
    let (where_clause, param) = project_filter(project);

    let total = count(conn, &where_clause, &param, "")?;
    let active = count(conn, &where_clause, &param, "AND is_obsolete = 0")?;
    let by_type = group_count(conn, "type", &where_clause, &param)?;
    let by_source = group_count(conn, "source", &where_clause, &param)?;
    let global = count(conn, &where_clause, &param, "AND project IS NULL")?;

    let (oldest, newest): (Option<i64>, Option<i64>) = {
        let sql = format!("SELECT MIN(created_at), MAX(created_at) FROM memories {where_clause}");
        match &param {
            Some(p) => conn.query_row(&sql, params![p], |r| Ok((r.get(0)?, r.get(1)?)))?,
            None => conn.query_row(&sql, [], |r| Ok((r.get(0)?, r.get(1)?)))?,
        }
    };

    let db_size_bytes = db_path
        .and_then(|p| std::fs::metadata(p).ok())
        .map(|m| m.len())
        .unwrap_or(0);

    Ok(StatsReport {
        total_memories: total,
        active_memories: active,
        obsolete_memories: total - active,
        by_type,
        by_source,
        global_memories: global,
        project_memories: total - global,
        db_size_bytes,
        oldest_memory: oldest,
        newest_memory: newest,
    })
}

fn count(
    conn: &Connection,
    where_clause: &str,
    param: &Option<String>,
    extra: &str,
) -> Result<u64> {
    let base = if where_clause.is_empty() && !extra.is_empty() {
        // No project filter: promote the extra condition to a WHERE.
        format!("WHERE {}", extra.trim_start_matches("AND "))
    } else {
        format!("{where_clause} {extra}")
    };
    let sql = format!("SELECT COUNT(*) FROM memories {base}");
    let n: i64 = match param {
        Some(p) => conn.query_row(&sql, params![p], |r| r.get(0))?,
        None => conn.query_row(&sql, [], |r| r.get(0))?,
    };
    Ok(n as u64)
}

fn group_count(
    conn: &Connection,
    column: &str,
    where_clause: &str,
    param: &Option<String>,
) -> Result<HashMap<String, u64>> {
    let sql = format!("SELECT {column}, COUNT(*) FROM memories {where_clause} GROUP BY {column}");
    let mut stmt = conn.prepare(&sql)?;
    let mapper = |row: &rusqlite::Row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
    };
    let rows: Vec<(String, u64)> = match param {
        Some(p) => stmt
            .query_map(params![p], mapper)?
            .collect::<std::result::Result<_, _>>()?,
        None => stmt
            .query_map([], mapper)?
            .collect::<std::result::Result<_, _>>()?,
    };
    Ok(rows.into_iter().collect())
}

/// Project filter: the named project's rows plus globals.
fn project_filter(project: Option<&str>) -> (String, Option<String>) {
    match project {
        Some(p) => (
            "WHERE (project = ?1 OR project IS NULL)".to_string(),
            Some(p.to_string()),
        ),
        None => (String::new(), None),
    }
}
