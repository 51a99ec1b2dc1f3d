//! Store upkeep: garbage collection, consolidation, corruption cleanup.
//!
//! All three run on demand (the CLI exposes them; an external scheduler may
//! call them too) and report what they did. Dry-run variants never mutate.

use rusqlite::Connection;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use super::store;
use super::types::ProjectScope;
use crate::config::{ConsolidationConfig, DedupConfig, GcConfig};
use crate::error::Result;

// ── Garbage collection ───────────────────────────────────────────────────────

/// Delete rows that were never useful: low-confidence, never recalled, and
/// past the unused-age cutoff. Expired rows go regardless of confidence.
/// Returns the total deleted.
pub fn garbage_collect(
    conn: &Connection,
    config: &GcConfig,
    scope: &ProjectScope,
    now: i64,
) -> Result<usize> {
    let cutoff = now - config.max_age_unused_days * 86_400;
    let (scope_sql, scope_param) = scope.sql_clause();
    let mapper = |row: &rusqlite::Row| row.get::<_, i64>(0);

    let mut ids: Vec<i64> = Vec::new();
    {
        let sql = format!(
            "SELECT id FROM memories \
             WHERE (last_accessed IS NULL OR last_accessed < ?1) \
               AND confidence < ?2 \
               AND access_count = 0 \
               AND {}",
            scope_sql.replace('?', "?3")
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = match scope_param {
            Some(p) => {
                stmt.query_map(rusqlite::params![cutoff, config.min_confidence, p], mapper)?
            }
            None => stmt.query_map(rusqlite::params![cutoff, config.min_confidence], mapper)?,
        };
        for id in rows {
            ids.push(id?);
        }
    }
    {
        let sql = format!(
            "SELECT id FROM memories \
             WHERE expires_at IS NOT NULL AND expires_at < ?1 \
               AND {}",
            scope_sql.replace('?', "?2")
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = match scope_param {
            Some(p) => stmt.query_map(rusqlite::params![now, p], mapper)?,
            None => stmt.query_map(rusqlite::params![now], mapper)?,
        };
        for id in rows {
            ids.push(id?);
        }
    }
    ids.sort_unstable();
    ids.dedup();

    let deleted = store::delete(conn, &ids)?;
    tracing::info!(deleted, "garbage collection finished");
    Ok(deleted)
}

// ── Consolidation ────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct Cluster {
    pub kept: i64,
    pub merged: Vec<i64>,
}

#[derive(Debug, Serialize)]
pub struct ConsolidateReport {
    pub clusters: Vec<Cluster>,
    pub obsoleted: usize,
    pub dry_run: bool,
}

/// Merge near-duplicate actives into their best representative.
///
/// Rows are visited in ascending id order. A cluster forms from the
/// neighbors within `threshold_multiplier × dedup.similarity_threshold`
/// that no earlier cluster claimed. The member with the highest
/// `importance · confidence · (1 + access_count)` survives; the rest are
/// marked obsolete pointing at it.
pub fn consolidate(
    conn: &Connection,
    dedup: &DedupConfig,
    config: &ConsolidationConfig,
    scope: &ProjectScope,
    now: i64,
    dry_run: bool,
) -> Result<ConsolidateReport> {
    let radius = config.threshold_multiplier * dedup.similarity_threshold;
    let actives = store::scan_active(conn, scope, now)?;
    let by_id: HashMap<i64, &super::types::Memory> =
        actives.iter().map(|m| (m.id, m)).collect();

    let mut processed: HashSet<i64> = HashSet::new();
    let mut clusters: Vec<Cluster> = Vec::new();
    let mut obsoleted = 0;

    for m in &actives {
        if processed.contains(&m.id) {
            continue;
        }

        let neighbors = store::neighbors_of(conn, m.id, config.neighbors)?;
        let members: Vec<&super::types::Memory> = std::iter::once(m)
            .chain(
                neighbors
                    .iter()
                    .filter(|(id, dist)| *dist < radius && !processed.contains(id))
                    .filter_map(|(id, _)| by_id.get(id).copied()),
            )
            .collect();

        if members.len() < 2 {
            continue;
        }

        let winner = members
            .iter()
            .max_by(|a, b| {
                representative_score(a)
                    .partial_cmp(&representative_score(b))
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(b.id.cmp(&a.id)) // deterministic: lower id wins exact ties
            })
            .expect("members is non-empty");

        let merged: Vec<i64> = members
            .iter()
            .filter(|c| c.id != winner.id)
            .map(|c| c.id)
            .collect();

        if !dry_run {
            for loser in &merged {
                store::set_obsolete(conn, *loser, Some(winner.id))?;
            }
        }
        obsoleted += merged.len();

        for member in &members {
            processed.insert(member.id);
        }
        clusters.push(Cluster {
            kept: winner.id,
            merged,
        });
    }

    tracing::info!(
        clusters = clusters.len(),
        obsoleted,
        dry_run,
        "consolidation finished"
    );
    Ok(ConsolidateReport {
        clusters,
        obsoleted,
        dry_run,
    })
}

fn representative_score(m: &super::types::Memory) -> f64 {
    m.importance as f64 * m.confidence * (1.0 + m.access_count as f64)
}

// ── Corruption cleanup ───────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct CleanupReport {
    pub matched: usize,
    pub deleted: usize,
    pub samples: Vec<String>,
    pub dry_run: bool,
}

/// Prompt fragments that occasionally leak into auto-captured memories.
const LEAKED_FRAGMENTS: &[&str] = &[
    "You are a helpful assistant",
    "You are an AI coding assistant",
    "<system-reminder>",
    "Do not respond to this message",
];

/// A bracketed label like a part marker; content starting this way is not
/// a bare JSON array.
static LABEL_RE: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"^\[[^\]\n]{1,32}\]\s").expect("static regex"));

fn is_corrupted(content: &str) -> bool {
    let trimmed = content.trim();
    if trimmed.chars().count() < 20 {
        return true;
    }
    if trimmed.starts_with('{') {
        return true;
    }
    if trimmed.starts_with('[') && !LABEL_RE.is_match(trimmed) {
        return true;
    }
    LEAKED_FRAGMENTS.iter().any(|f| trimmed.contains(f))
}

/// Delete active rows that are serialization debris or leaked prompt text.
/// Dry-run reports the count plus up to ten truncated samples.
pub fn cleanup_corrupted(
    conn: &Connection,
    scope: &ProjectScope,
    now: i64,
    dry_run: bool,
) -> Result<CleanupReport> {
    let actives = store::scan_active(conn, scope, now)?;
    let corrupted: Vec<&super::types::Memory> = actives
        .iter()
        .filter(|m| is_corrupted(&m.content))
        .collect();

    let matched = corrupted.len();
    let samples: Vec<String> = corrupted
        .iter()
        .take(10)
        .map(|m| truncate(&m.content, 80))
        .collect();

    if dry_run {
        return Ok(CleanupReport {
            matched,
            deleted: 0,
            samples,
            dry_run: true,
        });
    }

    let ids: Vec<i64> = corrupted.iter().map(|m| m.id).collect();
    let deleted = store::delete(conn, &ids)?;
    tracing::info!(deleted, "corruption cleanup finished");
    Ok(CleanupReport {
        matched,
        deleted,
        samples,
        dry_run: false,
    })
}

fn truncate(content: &str, max_chars: usize) -> String {
    if content.chars().count() <= max_chars {
        return content.to_string();
    }
    let cut: String = content.chars().take(max_chars).collect();
    format!("{cut}...")
}
