#![allow(dead_code)]

use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;

use mnemon::config::MnemonConfig;
use mnemon::db;
use mnemon::embedding::Embedder;
use mnemon::error::{MemoryError, Result};
use mnemon::memory::MemoryEngine;
use mnemon::project::ProjectRegistry;
use rusqlite::Connection;

pub const DIMS: usize = 8;

/// Open a fresh in-memory database with schema and migrations applied.
pub fn test_db() -> Connection {
    db::open_memory_database(DIMS).unwrap()
}

/// Deterministic embedding with a unit spike at `seed`. Distinct seeds are
/// orthogonal (L2 distance √2).
pub fn spike(seed: usize) -> Vec<f32> {
    let mut v = vec![0.0f32; DIMS];
    v[seed % DIMS] = 1.0;
    v
}

/// An embedding close to `base`: small perturbation, re-normalized.
/// Distance to `base` stays well under the default dedup threshold.
pub fn near(base: &[f32]) -> Vec<f32> {
    let mut v = base.to_vec();
    v[(DIMS - 1) % DIMS] += 0.1;
    normalize(&mut v);
    v
}

pub fn normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

/// Deterministic test embedder. Texts registered via [`StubEmbedder::set`]
/// get their fixed vector; everything else hashes to a normalized
/// two-spike vector, so unrelated texts land far apart.
pub struct StubEmbedder {
    map: HashMap<String, Vec<f32>>,
    fail: bool,
}

impl StubEmbedder {
    pub fn new() -> Self {
        Self {
            map: HashMap::new(),
            fail: false,
        }
    }

    /// An embedder whose service is down: every call fails, probe included.
    pub fn unavailable() -> Self {
        Self {
            map: HashMap::new(),
            fail: true,
        }
    }

    pub fn set(mut self, text: &str, embedding: Vec<f32>) -> Self {
        self.map.insert(text.to_string(), embedding);
        self
    }

    fn hashed(&self, text: &str) -> Vec<f32> {
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        let h = hasher.finish() as usize;
        let mut v = vec![0.0f32; DIMS];
        v[h % DIMS] += 1.0;
        v[(h / DIMS) % DIMS] += 0.5;
        normalize(&mut v);
        v
    }
}

impl Embedder for StubEmbedder {
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if self.fail {
            return Err(MemoryError::EmbedderUnavailable("stub is down".into()));
        }
        Ok(texts
            .iter()
            .map(|t| self.map.get(*t).cloned().unwrap_or_else(|| self.hashed(t)))
            .collect())
    }

    fn dimensions(&self) -> usize {
        DIMS
    }

    fn is_available(&self) -> bool {
        !self.fail
    }
}

/// Everything an engine test needs, with temp-dir-backed registry state.
pub struct TestBed {
    pub dir: tempfile::TempDir,
    pub engine: MemoryEngine,
}

/// Build an engine over an in-memory store with the given embedder and a
/// registry/config rooted in a temp dir. `cwd` is the temp dir itself.
pub fn engine_with(embedder: StubEmbedder, mutate: impl FnOnce(&mut MnemonConfig)) -> TestBed {
    let dir = tempfile::tempdir().unwrap();
    let mut config = MnemonConfig::default();
    config.embedding.dimensions = DIMS;
    mutate(&mut config);

    let registry = ProjectRegistry::load(dir.path().join("project-registry.json")).unwrap();
    let engine = MemoryEngine::new(
        test_db(),
        Box::new(embedder),
        config,
        registry,
        dir.path().to_path_buf(),
    )
    .unwrap();
    TestBed { dir, engine }
}

/// Default testbed: dedup off, so hash-derived stub embeddings can never
/// merge unrelated rows by accident. Dedup tests opt back in with
/// registered embeddings.
pub fn engine() -> TestBed {
    engine_with(StubEmbedder::new(), |c| c.dedup.enabled = false)
}

/// A testbed whose temp dir is registered as project `name`, so the
/// engine's cwd resolves to that project.
pub fn engine_in_project(embedder: StubEmbedder, name: &str) -> TestBed {
    let mut bed = engine_with(embedder, |c| c.dedup.enabled = false);
    let root: PathBuf = bed.dir.path().to_path_buf();
    bed.engine
        .registry_mut()
        .create(name, Some(&root), None)
        .unwrap();
    bed
}
