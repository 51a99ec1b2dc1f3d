//! The public memory API: ingestion, recall, lifecycle, maintenance.
//!
//! One engine per process. It owns the store connection, the embedder, the
//! loaded config, and the project registry; the CLI and hook scripts build
//! one per invocation and rely on SQLite's file locking for cross-process
//! writer exclusion.

use chrono::Utc;
use rusqlite::Connection;
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::maintenance::{self, CleanupReport, ConsolidateReport};
use super::ranker;
use super::stats::{self, StatsReport};
use super::store::{self, ForgetPredicate, KnnFilters, NewMemory};
use super::types::{
    Memory, MemoryType, ProjectScope, RecallOptions, RecallResult, RememberInput, Source,
};
use crate::chunker;
use crate::config::MnemonConfig;
use crate::embedding::Embedder;
use crate::error::{MemoryError, Result};
use crate::project::ProjectRegistry;
use crate::redact::Redactor;

/// Scope boost for rows belonging to the caller's project.
const PROJECT_BOOST: f64 = 1.3;
/// Scope boost for global preferences recalled from inside a project.
const GLOBAL_PREFERENCE_BOOST: f64 = 1.1;
/// Scores closer than this are tied and fall through to distance, then id.
const SCORE_EPSILON: f64 = 1e-9;

pub struct MemoryEngine {
    conn: Connection,
    embedder: Box<dyn Embedder>,
    config: MnemonConfig,
    registry: ProjectRegistry,
    redactor: Redactor,
    cwd: PathBuf,
    db_path: Option<PathBuf>,
}

impl MemoryEngine {
    /// Wire an engine from already-opened parts. The CLI uses
    /// [`MemoryEngine::open`]; tests inject an in-memory store and a
    /// deterministic embedder here.
    pub fn new(
        conn: Connection,
        embedder: Box<dyn Embedder>,
        config: MnemonConfig,
        registry: ProjectRegistry,
        cwd: PathBuf,
    ) -> Result<Self> {
        let redactor = Redactor::new(&config.sensitive.patterns)?;
        Ok(Self {
            conn,
            embedder,
            config,
            registry,
            redactor,
            cwd,
            db_path: None,
        })
    }

    /// Open the engine against a mnemon home directory: loads `config.json`
    /// and `project-registry.json`, opens `memories.db`, and connects the
    /// HTTP embedder.
    pub fn open(dir: &Path) -> Result<Self> {
        let config = MnemonConfig::load(dir)?;
        let db_path = dir.join("memories.db");
        let conn = crate::db::open_database(
            &db_path,
            config.embedding.dimensions,
            &config.embedding.model,
        )?;
        let registry = ProjectRegistry::load(dir.join("project-registry.json"))?;
        let embedder = crate::embedding::http::HttpEmbedder::new(&config.embedding)?;
        let cwd = std::env::current_dir()?;

        let mut engine = Self::new(conn, Box::new(embedder), config, registry, cwd)?;
        engine.db_path = Some(db_path);
        Ok(engine)
    }

    // ── Ingestion ────────────────────────────────────────────────────────

    /// Store a memory. Content is redacted, chunked, embedded, and merged
    /// into a near-duplicate when one is close enough; otherwise inserted.
    /// Returns one id per chunk, in chunk order (a dedup merge repeats the
    /// matched id).
    pub fn remember(&mut self, input: RememberInput) -> Result<Vec<i64>> {
        validate_input(&input)?;

        let content = self.redactor.redact(&input.content);
        if content != input.content {
            warn!("sensitive content redacted before store");
        }

        let memory_type = input.memory_type.unwrap_or(MemoryType::Fact);
        let project = self.resolve_scope(memory_type, input.project.as_deref());
        let importance = input.importance.unwrap_or(3);
        let confidence = input.confidence.unwrap_or(1.0);
        let source = input.source.unwrap_or(Source::Manual);

        let chunks = chunker::chunk_text(&content, &self.config.chunking);
        let chunk_texts: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
        // Embed everything up front: a failed embedding fails the whole
        // call before any chunk has been committed.
        let embeddings = self.embedder.embed_batch(&chunk_texts)?;

        let now = Utc::now().timestamp();
        let dedup = self.config.dedup.clone();
        let mut ids = Vec::with_capacity(chunks.len());
        let mut supersedes_pending = input.supersedes;

        for (chunk, embedding) in chunks.iter().zip(embeddings.iter()) {
            let stored_content = if chunk.total > 1 {
                format!("[part {}/{}] {}", chunk.index + 1, chunk.total, chunk.content)
            } else {
                chunk.content.clone()
            };

            let tx = self.conn.transaction()?;

            // Dedup runs inside the insert transaction so two concurrent
            // writers cannot both observe "no duplicate".
            let merged = if dedup.enabled && !input.skip_dedup {
                match store::nearest_one(&tx, embedding)? {
                    Some((id, old_content, _old_importance, distance))
                        if distance < dedup.similarity_threshold =>
                    {
                        store::raise_importance(&tx, id, importance)?;
                        if dedup.prefer_longer && stored_content.len() > old_content.len() {
                            store::update_content(&tx, id, &stored_content, embedding)?;
                        }
                        info!(id, distance, "merged into near-duplicate");
                        Some(id)
                    }
                    _ => None,
                }
            } else {
                None
            };

            let id = match merged {
                Some(id) => id,
                None => store::insert(
                    &tx,
                    &NewMemory {
                        content: stored_content,
                        memory_type,
                        project: project.clone(),
                        category: input.category.clone(),
                        reasoning: input.reasoning.clone(),
                        source,
                        importance,
                        confidence,
                        created_at: now,
                        expires_at: input.expires_at,
                        supersedes: supersedes_pending,
                        tags: input.tags.clone().unwrap_or_default(),
                    },
                    embedding,
                )?,
            };

            // The supersedes flag fires exactly once per remember call, on
            // the first chunk that lands.
            if let Some(target) = supersedes_pending.take() {
                if target != id {
                    store::set_obsolete(&tx, target, None)?;
                }
            }

            tx.commit()?;
            ids.push(id);
        }

        info!(count = ids.len(), ?project, %memory_type, "remember finished");
        Ok(ids)
    }

    // ── Recall ───────────────────────────────────────────────────────────

    /// Rank stored memories against a natural-language query. The returned
    /// rows have their access stats bumped in the same transaction as the
    /// read.
    pub fn recall(&mut self, query: &str, options: &RecallOptions) -> Result<Vec<RecallResult>> {
        if query.trim().is_empty() {
            return Err(MemoryError::InvalidInput("query must not be empty".into()));
        }

        let query_embedding = self.embedder.embed_one(query)?;
        let now = Utc::now().timestamp();
        let current_project = self.registry.detect(&self.cwd).map(String::from);

        let recall_cfg = &self.config.recall;
        let k = 2 * (recall_cfg.project_results + recall_cfg.global_results);
        let limit = options
            .limit
            .unwrap_or(recall_cfg.project_results + recall_cfg.global_results);

        let tx = self.conn.transaction()?;
        let hits = store::knn(
            &tx,
            &query_embedding,
            k,
            &KnnFilters {
                now,
                include_obsolete: options.include_obsolete,
                memory_type: options.memory_type,
                min_importance: options.min_importance,
            },
        )?;

        let mut results: Vec<RecallResult> = hits
            .into_iter()
            .filter(|(_, distance)| *distance < recall_cfg.distance_threshold)
            .map(|(memory, distance)| {
                let mut score = ranker::score(&memory, distance, now, recall_cfg);
                score *= scope_boost(&memory, current_project.as_deref());
                let source = memory.project.clone();
                RecallResult {
                    memory,
                    distance,
                    score,
                    source,
                }
            })
            .collect();

        results.sort_by(compare_results);
        results.truncate(limit);

        let returned: Vec<i64> = results.iter().map(|r| r.memory.id).collect();
        store::update_stats(&tx, &returned, now)?;
        tx.commit()?;

        info!(query_len = query.len(), returned = returned.len(), "recall finished");
        Ok(results)
    }

    /// Most recently created active memories, newest first.
    pub fn list_recent(
        &self,
        limit: usize,
        project_scope: Option<&str>,
        all_projects: bool,
    ) -> Result<Vec<Memory>> {
        let detected;
        let project = match project_scope {
            Some(p) => Some(p),
            None => {
                detected = self.registry.detect(&self.cwd).map(String::from);
                detected.as_deref()
            }
        };
        store::list_recent(&self.conn, limit, project, all_projects)
    }

    // ── Mutation ─────────────────────────────────────────────────────────

    /// Replace a memory's content (redacted) and its embedding together.
    pub fn update(&mut self, id: i64, new_content: &str) -> Result<()> {
        if new_content.trim().is_empty() {
            return Err(MemoryError::InvalidInput("content must not be empty".into()));
        }
        let content = self.redactor.redact(new_content);
        if content != new_content {
            warn!(id, "sensitive content redacted before update");
        }
        let embedding = self.embedder.embed_one(&content)?;

        let tx = self.conn.transaction()?;
        store::update_content(&tx, id, &content, &embedding)?;
        tx.commit()?;
        Ok(())
    }

    /// Retire a memory without deleting it.
    pub fn mark_obsolete(&mut self, id: i64) -> Result<()> {
        let tx = self.conn.transaction()?;
        store::set_obsolete(&tx, id, None)?;
        tx.commit()?;
        Ok(())
    }

    /// Hard-delete a memory and its embedding.
    pub fn forget(&mut self, id: i64) -> Result<()> {
        let tx = self.conn.transaction()?;
        if store::get(&tx, id)?.is_none() {
            return Err(MemoryError::NotFound(format!("memory {id}")));
        }
        store::delete(&tx, &[id])?;
        tx.commit()?;
        info!(id, "memory forgotten");
        Ok(())
    }

    /// Delete every memory carrying a category tag, within a scope.
    pub fn forget_by_category(
        &mut self,
        category: &str,
        scope: &ProjectScope,
        dry_run: bool,
    ) -> Result<usize> {
        let tx = self.conn.transaction()?;
        let predicate = ForgetPredicate::Category(category.to_string());
        let count = store::delete_where(&tx, &predicate, scope, dry_run)?;
        if count == 0 {
            return Err(MemoryError::NotFound(format!("category '{category}'")));
        }
        tx.commit()?;
        Ok(count)
    }

    /// Delete every memory from an ingestion source, within a scope.
    pub fn forget_by_source(
        &mut self,
        source: Source,
        scope: &ProjectScope,
        dry_run: bool,
    ) -> Result<usize> {
        let tx = self.conn.transaction()?;
        let count = store::delete_where(&tx, &ForgetPredicate::Source(source), scope, dry_run)?;
        tx.commit()?;
        Ok(count)
    }

    // ── Maintenance ──────────────────────────────────────────────────────

    pub fn garbage_collect(&mut self, scope: &ProjectScope) -> Result<usize> {
        let now = Utc::now().timestamp();
        let tx = self.conn.transaction()?;
        let deleted = maintenance::garbage_collect(&tx, &self.config.gc, scope, now)?;
        tx.commit()?;
        Ok(deleted)
    }

    pub fn consolidate(&mut self, scope: &ProjectScope, dry_run: bool) -> Result<ConsolidateReport> {
        let now = Utc::now().timestamp();
        let tx = self.conn.transaction()?;
        let report = maintenance::consolidate(
            &tx,
            &self.config.dedup,
            &self.config.consolidation,
            scope,
            now,
            dry_run,
        )?;
        tx.commit()?;
        Ok(report)
    }

    pub fn cleanup_corrupted(&mut self, scope: &ProjectScope, dry_run: bool) -> Result<CleanupReport> {
        let now = Utc::now().timestamp();
        let tx = self.conn.transaction()?;
        let report = maintenance::cleanup_corrupted(&tx, scope, now, dry_run)?;
        tx.commit()?;
        Ok(report)
    }

    // ── Introspection ────────────────────────────────────────────────────

    pub fn stats(&self, project: Option<&str>) -> Result<StatsReport> {
        stats::stats(&self.conn, project, self.db_path.as_deref())
    }

    /// Resolve a working directory to a registered project name.
    pub fn detect_project(&self, cwd: &Path) -> Option<String> {
        self.registry.detect(cwd).map(String::from)
    }

    /// True when the embedding service answers its health probe with the
    /// configured dimension. Never raises.
    pub fn is_ready(&self) -> bool {
        self.embedder.is_available()
    }

    pub fn registry(&self) -> &ProjectRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ProjectRegistry {
        &mut self.registry
    }

    pub fn config(&self) -> &MnemonConfig {
        &self.config
    }

    /// Preferences are always global; everything else scopes to the
    /// explicit project or the one detected from the working directory.
    fn resolve_scope(&self, memory_type: MemoryType, explicit: Option<&str>) -> Option<String> {
        if memory_type == MemoryType::Preference {
            return None;
        }
        explicit
            .map(String::from)
            .or_else(|| self.registry.detect(&self.cwd).map(String::from))
    }
}

fn validate_input(input: &RememberInput) -> Result<()> {
    if input.content.trim().is_empty() {
        return Err(MemoryError::InvalidInput("content must not be empty".into()));
    }
    if let Some(importance) = input.importance {
        if !(1..=5).contains(&importance) {
            return Err(MemoryError::InvalidInput(format!(
                "importance must be in [1, 5], got {importance}"
            )));
        }
    }
    if let Some(confidence) = input.confidence {
        if !(0.0..=1.0).contains(&confidence) {
            return Err(MemoryError::InvalidInput(format!(
                "confidence must be in [0, 1], got {confidence}"
            )));
        }
    }
    if let Some(expires_at) = input.expires_at {
        if expires_at < Utc::now().timestamp() {
            return Err(MemoryError::InvalidInput(
                "expires_at must not be in the past".into(),
            ));
        }
    }
    Ok(())
}

fn scope_boost(memory: &Memory, current_project: Option<&str>) -> f64 {
    match (&memory.project, current_project) {
        (Some(p), Some(current)) if p == current => PROJECT_BOOST,
        (None, Some(_)) if memory.memory_type == MemoryType::Preference => {
            GLOBAL_PREFERENCE_BOOST
        }
        _ => 1.0,
    }
}

/// Score descending; near-ties fall back to distance ascending, then id
/// descending (most recently created first).
fn compare_results(a: &RecallResult, b: &RecallResult) -> Ordering {
    if (a.score - b.score).abs() < SCORE_EPSILON {
        a.distance
            .partial_cmp(&b.distance)
            .unwrap_or(Ordering::Equal)
            .then(b.memory.id.cmp(&a.memory.id))
    } else {
        b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::types::MemoryType;

    fn memory(id: i64, memory_type: MemoryType, project: Option<&str>) -> Memory {
        Memory {
            id,
            content: "x".into(),
            memory_type,
            project: project.map(String::from),
            category: None,
            reasoning: None,
            source: Source::Manual,
            importance: 3,
            confidence: 1.0,
            created_at: 0,
            last_accessed: None,
            access_count: 0,
            expires_at: None,
            supersedes: None,
            is_obsolete: false,
            tags: Vec::new(),
        }
    }

    #[test]
    fn scope_boosts() {
        let project_row = memory(1, MemoryType::Fact, Some("web"));
        let global_pref = memory(2, MemoryType::Preference, None);
        let global_fact = memory(3, MemoryType::Fact, None);
        let other_project = memory(4, MemoryType::Fact, Some("api"));

        assert_eq!(scope_boost(&project_row, Some("web")), PROJECT_BOOST);
        assert_eq!(scope_boost(&global_pref, Some("web")), GLOBAL_PREFERENCE_BOOST);
        assert_eq!(scope_boost(&global_fact, Some("web")), 1.0);
        assert_eq!(scope_boost(&other_project, Some("web")), 1.0);
        // Outside any project, nothing boosts.
        assert_eq!(scope_boost(&project_row, None), 1.0);
        assert_eq!(scope_boost(&global_pref, None), 1.0);
    }

    #[test]
    fn tie_break_prefers_lower_distance_then_higher_id() {
        let mk = |id, distance, score| RecallResult {
            memory: memory(id, MemoryType::Fact, None),
            distance,
            score,
            source: None,
        };

        // Equal scores: lower distance first.
        let mut rows = vec![mk(1, 0.4, 0.5), mk(2, 0.2, 0.5)];
        rows.sort_by(compare_results);
        assert_eq!(rows[0].memory.id, 2);

        // Equal scores and distances: higher id first.
        let mut rows = vec![mk(1, 0.3, 0.5), mk(7, 0.3, 0.5)];
        rows.sort_by(compare_results);
        assert_eq!(rows[0].memory.id, 7);

        // Distinct scores: score wins regardless of distance.
        let mut rows = vec![mk(1, 0.1, 0.4), mk(2, 0.9, 0.6)];
        rows.sort_by(compare_results);
        assert_eq!(rows[0].memory.id, 2);
    }
}
