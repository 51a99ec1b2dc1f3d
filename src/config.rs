use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{MemoryError, Result};

#[derive(Debug, Deserialize, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct MnemonConfig {
    pub embedding: EmbeddingConfig,
    pub chunking: ChunkingConfig,
    pub recall: RecallConfig,
    pub capture: CaptureConfig,
    pub sensitive: SensitiveConfig,
    pub dedup: DedupConfig,
    pub consolidation: ConsolidationConfig,
    pub gc: GcConfig,
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct EmbeddingConfig {
    pub model: String,
    pub dimensions: usize,
    pub base_url: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct ChunkingConfig {
    pub max_tokens: usize,
    pub overlap_tokens: usize,
    pub min_chunk_size: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct RecallConfig {
    pub project_results: usize,
    pub global_results: usize,
    /// L2 distance above which candidates are dropped from recall.
    pub distance_threshold: f64,
    pub boost_recency: bool,
    pub recency_half_life_days: f64,
    /// Reserved — parsed but not consulted by the recall path yet.
    pub global_types_in_project: Vec<String>,
}

/// Consumed by the host's hook scripts, not by the engine itself. Kept in
/// the recognized-options set so a hook-edited config file round-trips.
#[derive(Debug, Deserialize, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct CaptureConfig {
    pub auto_session: bool,
    pub auto_commit: bool,
    pub commit_patterns: Vec<String>,
    pub min_importance: i64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct SensitiveConfig {
    pub patterns: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct DedupConfig {
    pub enabled: bool,
    /// L2 distance below which a nearest neighbor counts as a duplicate.
    pub similarity_threshold: f64,
    pub prefer_longer: bool,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct ConsolidationConfig {
    /// Cluster radius as a multiple of `dedup.similarity_threshold`.
    pub threshold_multiplier: f64,
    pub neighbors: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct GcConfig {
    pub max_age_unused_days: i64,
    pub min_confidence: f64,
}

impl Default for MnemonConfig {
    fn default() -> Self {
        Self {
            embedding: EmbeddingConfig::default(),
            chunking: ChunkingConfig::default(),
            recall: RecallConfig::default(),
            capture: CaptureConfig::default(),
            sensitive: SensitiveConfig::default(),
            dedup: DedupConfig::default(),
            consolidation: ConsolidationConfig::default(),
            gc: GcConfig::default(),
            log_level: "info".into(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "all-MiniLM-L6-v2".into(),
            dimensions: 384,
            base_url: "http://127.0.0.1:8756".into(),
        }
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_tokens: 512,
            overlap_tokens: 64,
            min_chunk_size: 48,
        }
    }
}

impl Default for RecallConfig {
    fn default() -> Self {
        Self {
            project_results: 5,
            global_results: 3,
            distance_threshold: 1.2,
            boost_recency: true,
            recency_half_life_days: 30.0,
            global_types_in_project: Vec::new(),
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            auto_session: true,
            auto_commit: false,
            commit_patterns: Vec::new(),
            min_importance: 3,
        }
    }
}

impl Default for SensitiveConfig {
    fn default() -> Self {
        Self {
            patterns: vec![
                r"(?:api[_-]?key|token|secret)\s*[:=]\s*\S+".into(),
                r"bearer\s+[A-Za-z0-9._-]{16,}".into(),
                r"password\s*[:=]\s*\S+".into(),
                r"AKIA[0-9A-Z]{16}".into(),
            ],
        }
    }
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            similarity_threshold: 0.35,
            prefer_longer: true,
        }
    }
}

impl Default for ConsolidationConfig {
    fn default() -> Self {
        Self {
            threshold_multiplier: 2.0,
            neighbors: 20,
        }
    }
}

impl Default for GcConfig {
    fn default() -> Self {
        Self {
            max_age_unused_days: 90,
            min_confidence: 0.5,
        }
    }
}

/// Returns `~/.mnemon/`, or the `MNEMON_DIR` override.
pub fn default_mnemon_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("MNEMON_DIR") {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .expect("home directory must exist")
        .join(".mnemon")
}

impl MnemonConfig {
    /// Load config from `<dir>/config.json` (if it exists) then apply env
    /// var overrides. Unknown fields in the file are rejected.
    pub fn load(dir: &Path) -> Result<Self> {
        Self::load_from(dir.join("config.json"))
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            serde_json::from_str(&contents)
                .map_err(|e| MemoryError::InvalidInput(format!("config.json: {e}")))?
        } else {
            info!("no config file at {}, using defaults", path.display());
            MnemonConfig::default()
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides (MNEMON_EMBED_URL, MNEMON_LOG_LEVEL).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("MNEMON_EMBED_URL") {
            self.embedding.base_url = val;
        }
        if let Ok(val) = std::env::var("MNEMON_LOG_LEVEL") {
            self.log_level = val;
        }
    }

    fn validate(&self) -> Result<()> {
        if self.embedding.dimensions == 0 {
            return Err(MemoryError::InvalidInput(
                "embedding.dimensions must be positive".into(),
            ));
        }
        if self.chunking.max_tokens == 0 {
            return Err(MemoryError::InvalidInput(
                "chunking.max_tokens must be positive".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.gc.min_confidence) {
            return Err(MemoryError::InvalidInput(
                "gc.min_confidence must be in [0, 1]".into(),
            ));
        }
        Ok(())
    }
}
